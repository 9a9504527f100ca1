//! Artifact change detection via polling.
//!
//! The auth layer gives no change notification, so the artifact's
//! fingerprint is compared every interval. Each change calls
//! `request_save`, and the synchronizer's debounce collapses bursts.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::SessionSynchronizer;

/// Spawn the poller. Returns `None` when the synchronizer is inert, so no
/// task exists outside the managed environment.
///
/// The fingerprint at spawn time is the starting point; an artifact that
/// already exists does not trigger a save by itself.
pub fn spawn_artifact_watcher(
    sync: SessionSynchronizer,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if !sync.is_active() {
        tracing::debug!("Synchronizer inactive, artifact watcher not started");
        return None;
    }

    let artifact = sync.artifact();
    let mut last = artifact.fingerprint().ok().flatten();

    Some(tokio::spawn(async move {
        tracing::info!(
            artifact = %artifact.describe(),
            interval_secs = interval.as_secs(),
            "Artifact watcher started"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let current = match artifact.fingerprint() {
                Ok(current) => current,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to fingerprint artifact");
                    continue;
                }
            };

            match (last, current) {
                (Some(old), Some(new)) if old != new => {
                    tracing::debug!("Credential artifact changed");
                    sync.request_save();
                }
                (None, Some(_)) => {
                    tracing::info!("Credential artifact appeared");
                    sync.request_save();
                }
                (Some(_), None) => {
                    // Nothing to sync
                    tracing::warn!("Credential artifact disappeared");
                }
                _ => tracing::trace!("Artifact unchanged"),
            }
            last = current;
        }
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::platform::Platform;
    use crate::sync::scheduler::ManualScheduler;
    use crate::sync::synchronizer::testing::*;

    fn watched(
        platform: &Platform,
        artifact: Arc<MemoryArtifact>,
    ) -> (SessionSynchronizer, ManualScheduler) {
        let scheduler = ManualScheduler::default();
        let sync = SessionSynchronizer::with_scheduler(
            platform,
            settings(),
            artifact,
            Arc::new(RecordingStore::default()),
            Arc::new(scheduler.clone()),
        );
        (sync, scheduler)
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_artifact_does_not_trigger() {
        let (sync, scheduler) = watched(&managed_platform(), MemoryArtifact::with(b"abc"));
        let handle = spawn_artifact_watcher(sync, Duration::from_secs(5)).unwrap();

        tokio::time::sleep(Duration::from_secs(12)).await;
        settle().await;
        assert_eq!(scheduler.scheduled_count(), 0);
        handle.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_and_appearance_request_saves() {
        let artifact = Arc::new(MemoryArtifact::default());
        let (sync, scheduler) = watched(&managed_platform(), artifact.clone());
        let handle = spawn_artifact_watcher(sync.clone(), Duration::from_secs(5)).unwrap();
        settle().await;

        artifact.set(Some(&b"abc"[..]));
        tokio::time::sleep(Duration::from_secs(6)).await;
        settle().await;
        assert_eq!(scheduler.scheduled_count(), 1);

        artifact.set(Some(&b"abcd"[..]));
        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(scheduler.scheduled_count(), 2);
        assert_eq!(scheduler.armed().len(), 1);

        // Removal is logged, not synced
        artifact.set(None);
        tokio::time::sleep(Duration::from_secs(5)).await;
        settle().await;
        assert_eq!(scheduler.scheduled_count(), 2);

        handle.abort();
    }

    #[tokio::test]
    async fn test_inert_outside_managed_environment() {
        let platform = Platform::from_vars([("HEROKU_API_KEY", "k"), ("HEROKU_APP_NAME", "a")]);
        let (sync, _) = watched(&platform, MemoryArtifact::with(b"abc"));
        assert!(spawn_artifact_watcher(sync, Duration::from_secs(5)).is_none());
    }
}
