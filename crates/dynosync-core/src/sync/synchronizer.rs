//! Debounced, deduplicated session saves.
//!
//! `request_save` is called whenever the credential artifact changes and
//! (re)arms a single debounce timer. When the timer fires, `perform_save`
//! encodes the artifact and writes it to the config store unless the value
//! matches the last confirmed write. At most one save runs at a time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info, trace, warn};

use super::scheduler::{PendingTask, Scheduler, TokioScheduler};
use crate::config::SyncConfig;
use crate::platform::{Platform, RemoteCredentials};
use crate::remote::{ConfigStore, RemoteError};
use crate::session::{ArtifactSource, EncodedSession};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Failed to read credential artifact: {0}")]
    Artifact(#[source] std::io::Error),

    #[error("Failed to update config var: {0}")]
    Remote(#[from] RemoteError),
}

/// Why a save finished without writing. None of these are failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotManaged,
    ConfigurationAbsent,
    InFlight,
    ArtifactAbsent,
    Duplicate,
}

#[derive(Debug)]
pub enum SaveOutcome {
    Saved,
    Skipped(SkipReason),
    Failed(SyncError),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    /// Timer armed, nothing in flight.
    Debounced,
    Saving,
}

#[derive(Debug, Clone)]
pub struct SyncStatus {
    pub phase: SyncPhase,
    pub baseline: Option<String>,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub saves: u64,
}

#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub variable_name: String,
    pub session_tag: String,
    pub debounce: Duration,
    /// Mirror the baseline into the process variable after each save.
    pub mirror_env: bool,
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            variable_name: config.variable_name.clone(),
            session_tag: config.session_tag.clone(),
            debounce: config.debounce(),
            mirror_env: true,
        }
    }
}

#[derive(Default)]
struct TimerSlot {
    generation: u64,
    pending: Option<(u64, Box<dyn PendingTask>)>,
}

#[derive(Default)]
struct SaveRecord {
    baseline: Option<String>,
    last_saved_at: Option<DateTime<Utc>>,
    saves: u64,
}

struct Inner {
    settings: SyncSettings,
    managed: bool,
    credentials: Option<RemoteCredentials>,
    artifact: Arc<dyn ArtifactSource>,
    store: Arc<dyn ConfigStore>,
    scheduler: Arc<dyn Scheduler>,
    timer: Mutex<TimerSlot>,
    save_in_flight: AtomicBool,
    /// Signalled whenever the in-flight flag is cleared.
    save_done: Notify,
    record: Mutex<SaveRecord>,
}

/// Clears the in-flight flag on every exit path and wakes `wait_idle`.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
    done: &'a Notify,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool, done: &'a Notify) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, done })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.done.notify_waiters();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owner of all sync state. Clone is cheap and shares that state, which is
/// how the shutdown handler and watcher get hold of it.
#[derive(Clone)]
pub struct SessionSynchronizer {
    inner: Arc<Inner>,
}

impl SessionSynchronizer {
    /// Must be used from within a tokio runtime.
    pub fn new(
        platform: &Platform,
        settings: SyncSettings,
        artifact: Arc<dyn ArtifactSource>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        Self::with_scheduler(platform, settings, artifact, store, Arc::new(TokioScheduler))
    }

    pub fn with_scheduler(
        platform: &Platform,
        settings: SyncSettings,
        artifact: Arc<dyn ArtifactSource>,
        store: Arc<dyn ConfigStore>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let record = SaveRecord {
            baseline: platform.get(&settings.variable_name).map(str::to_string),
            ..SaveRecord::default()
        };

        Self {
            inner: Arc::new(Inner {
                settings,
                managed: platform.is_managed(),
                credentials: platform.credentials(),
                artifact,
                store,
                scheduler,
                timer: Mutex::new(TimerSlot::default()),
                save_in_flight: AtomicBool::new(false),
                save_done: Notify::new(),
                record: Mutex::new(record),
            }),
        }
    }

    /// Managed environment with credentials configured.
    pub fn is_active(&self) -> bool {
        self.inner.managed && self.inner.credentials.is_some()
    }

    pub(crate) fn artifact(&self) -> Arc<dyn ArtifactSource> {
        self.inner.artifact.clone()
    }

    /// Debounce a save: any armed timer is replaced by a fresh one.
    pub fn request_save(&self) {
        if !self.inner.managed {
            trace!("Not on a managed dyno, ignoring save request");
            return;
        }
        if self.inner.credentials.is_none() {
            trace!("Config-var credentials not set, ignoring save request");
            return;
        }

        let mut slot = lock(&self.inner.timer);
        if let Some((_, pending)) = slot.pending.take() {
            pending.cancel();
            debug!("Debounce timer reset");
        }

        slot.generation += 1;
        let generation = slot.generation;
        let this = self.clone();
        let task = async move {
            if this.claim_timer(generation) {
                this.perform_save().await;
            }
        }
        .boxed();

        let handle = self.inner.scheduler.schedule(self.inner.settings.debounce, task);
        slot.pending = Some((generation, handle));
        debug!(delay_secs = self.inner.settings.debounce.as_secs(), "Session save scheduled");
    }

    /// Called by a fired timer. Only the timer still in the slot may proceed;
    /// one that lost a race with `cancel_pending` or a newer request backs off.
    fn claim_timer(&self, generation: u64) -> bool {
        let mut slot = lock(&self.inner.timer);
        match slot.pending {
            Some((current, _)) if current == generation => {
                slot.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Cancel the armed debounce timer. Returns whether one was armed.
    pub fn cancel_pending(&self) -> bool {
        match lock(&self.inner.timer).pending.take() {
            Some((_, pending)) => {
                pending.cancel();
                true
            }
            None => false,
        }
    }

    pub fn has_pending(&self) -> bool {
        lock(&self.inner.timer).pending.is_some()
    }

    pub fn is_saving(&self) -> bool {
        self.inner.save_in_flight.load(Ordering::Acquire)
    }

    /// Resolve once no save is running.
    pub async fn wait_idle(&self) {
        loop {
            // Register before checking the flag so a release in between isn't missed
            let mut released = std::pin::pin!(self.inner.save_done.notified());
            released.as_mut().enable();
            if !self.is_saving() {
                return;
            }
            released.await;
        }
    }

    /// Last value confirmed written (or the booted value).
    pub fn baseline(&self) -> Option<String> {
        lock(&self.inner.record).baseline.clone()
    }

    pub fn status(&self) -> SyncStatus {
        let phase = if self.is_saving() {
            SyncPhase::Saving
        } else if self.has_pending() {
            SyncPhase::Debounced
        } else {
            SyncPhase::Idle
        };

        let record = lock(&self.inner.record);
        SyncStatus {
            phase,
            baseline: record.baseline.clone(),
            last_saved_at: record.last_saved_at,
            saves: record.saves,
        }
    }

    /// Cancel any armed timer, let a running save finish, then save now.
    ///
    /// Waiting matters at shutdown: the running save may have read the
    /// artifact before its latest change.
    pub async fn flush(&self) -> SaveOutcome {
        if self.cancel_pending() {
            debug!("Cancelled pending save timer before flush");
        }
        loop {
            if self.is_saving() {
                debug!("Waiting for in-flight save before flush");
                self.wait_idle().await;
            }
            match self.perform_save().await {
                SaveOutcome::Skipped(SkipReason::InFlight) => continue,
                outcome => return outcome,
            }
        }
    }

    /// Encode the artifact and write it to the config store if it changed.
    ///
    /// Never panics and never propagates: every failure is logged and
    /// returned as `SaveOutcome::Failed`, with the baseline left as it was
    /// so the next trigger retries.
    pub async fn perform_save(&self) -> SaveOutcome {
        let inner = &self.inner;

        if !inner.managed {
            return SaveOutcome::Skipped(SkipReason::NotManaged);
        }
        let Some(credentials) = inner.credentials.as_ref() else {
            return SaveOutcome::Skipped(SkipReason::ConfigurationAbsent);
        };

        let Some(_guard) = InFlightGuard::acquire(&inner.save_in_flight, &inner.save_done) else {
            debug!("Save already in flight, skipping");
            return SaveOutcome::Skipped(SkipReason::InFlight);
        };

        let bytes = match inner.artifact.read() {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(artifact = %inner.artifact.describe(), "No credential artifact yet, nothing to save");
                return SaveOutcome::Skipped(SkipReason::ArtifactAbsent);
            }
            Err(e) => {
                warn!(artifact = %inner.artifact.describe(), error = %e, "Failed to read credential artifact");
                return SaveOutcome::Failed(SyncError::Artifact(e));
            }
        };

        let encoded = EncodedSession::encode(&inner.settings.session_tag, &bytes);
        if lock(&inner.record).baseline.as_deref() == Some(encoded.as_str()) {
            debug!("Session unchanged since last save, skipping");
            return SaveOutcome::Skipped(SkipReason::Duplicate);
        }

        let name = &inner.settings.variable_name;
        match inner
            .store
            .update_variable(credentials, name, encoded.as_str())
            .await
        {
            Ok(()) => {
                if inner.settings.mirror_env {
                    std::env::set_var(name, encoded.as_str());
                }
                let mut record = lock(&inner.record);
                record.baseline = Some(encoded.into_string());
                record.last_saved_at = Some(Utc::now());
                record.saves += 1;
                info!(app = %credentials.app_name, var = %name, "Session saved to config vars");
                SaveOutcome::Saved
            }
            Err(e) => {
                warn!(app = %credentials.app_name, error = %e, "Failed to save session");
                SaveOutcome::Failed(SyncError::Remote(e))
            }
        }
    }
}
