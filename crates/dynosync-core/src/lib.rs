//! dynosync core - keeps a dyno's session alive across restarts.
//!
//! Dynos have ephemeral filesystems, so a credential file written at runtime
//! is lost on every restart. This crate mirrors that file into an app config
//! var, which the platform injects back on boot:
//!
//! - `platform`: managed-environment detection and credentials
//! - `session`: the credential artifact and its tagged base64 encoding
//! - `remote`: the config-var API client
//! - `sync`: debounced, deduplicated saves and the artifact watcher
//! - `shutdown`: final flush on SIGTERM
//! - `tools` / `setup`: browser and ffmpeg discovery for sibling processes
//!
//! Off the platform, everything here is inert: no timers, no requests.

pub mod config;
pub mod platform;
pub mod remote;
pub mod session;
pub mod setup;
pub mod shutdown;
pub mod sync;
pub mod tools;

pub use config::SyncConfig;
pub use platform::{Platform, RemoteCredentials};
pub use remote::{ConfigStore, HerokuClient, RemoteError};
pub use session::{EncodedSession, FileArtifact};
pub use sync::{SaveOutcome, SessionSynchronizer, SkipReason, SyncSettings};
