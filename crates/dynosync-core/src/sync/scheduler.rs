//! Cancellable delayed tasks.
//!
//! The synchronizer arms its debounce timer through `Scheduler` rather than
//! calling `tokio::spawn` directly, so tests can hold timers and fire them
//! by hand.

use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;

pub type Task = BoxFuture<'static, ()>;

/// Handle to a task that has been scheduled but may not have run yet.
pub trait PendingTask: Send + Sync {
    /// Prevent the task from running. No-op once it has finished.
    fn cancel(&self);
}

pub trait Scheduler: Send + Sync {
    fn schedule(&self, delay: Duration, task: Task) -> Box<dyn PendingTask>;
}

/// Spawns each task onto the current tokio runtime behind a `sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: Task) -> Box<dyn PendingTask> {
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        Box::new(handle)
    }
}

impl PendingTask for JoinHandle<()> {
    fn cancel(&self) {
        self.abort();
    }
}

#[cfg(test)]
pub(crate) use manual::ManualScheduler;
