//! Session synchronization.
//!
//! This module provides:
//! - `SessionSynchronizer`: debounce timer, duplicate suppression, saves
//! - `Scheduler`: cancellable delayed tasks backing the debounce timer
//! - `spawn_artifact_watcher`: polls the artifact and requests saves
//!
//! Saves are debounced by 30 seconds by default and never overlap.

pub mod scheduler;
pub mod synchronizer;
pub mod watcher;

pub use scheduler::{PendingTask, Scheduler, Task, TokioScheduler};
pub use synchronizer::{
    SaveOutcome, SessionSynchronizer, SkipReason, SyncError, SyncPhase, SyncSettings, SyncStatus,
};
pub use watcher::spawn_artifact_watcher;
