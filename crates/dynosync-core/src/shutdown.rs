//! Flush-on-terminate.
//!
//! The platform sends SIGTERM before stopping a dyno and allows a short
//! grace period. The handler cancels any armed debounce timer, waits for a
//! running save, and runs one final save bounded by the client timeout.
//! Its task then resolves so the caller can return from `main` with status
//! 0 whatever the outcome, letting destructors flush the log writers.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::platform::Platform;
use crate::sync::{SaveOutcome, SessionSynchronizer};

/// Final flush before the process stops.
pub async fn drain(sync: &SessionSynchronizer) -> SaveOutcome {
    let outcome = sync.flush().await;
    info!(?outcome, "Graceful shutdown complete");
    outcome
}

/// Resolves on SIGTERM (unix) or Ctrl-C (elsewhere).
pub async fn termination_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        sigterm.recv().await;
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }

    Ok(())
}

/// Install the SIGTERM handler. Returns `None` outside the managed environment.
///
/// The returned task completes once the final save has finished; the caller
/// awaits it and then exits normally.
pub fn install_shutdown_handler(
    platform: &Platform,
    sync: SessionSynchronizer,
) -> Option<JoinHandle<SaveOutcome>> {
    install_with(platform, sync, async {
        if let Err(e) = termination_signal().await {
            warn!(error = %e, "Failed to listen for SIGTERM, shutdown flush disabled");
            std::future::pending::<()>().await;
        }
    })
}

/// Generic form of [`install_shutdown_handler`]: `signal` resolves when the
/// process should stop.
pub fn install_with<S>(
    platform: &Platform,
    sync: SessionSynchronizer,
    signal: S,
) -> Option<JoinHandle<SaveOutcome>>
where
    S: Future<Output = ()> + Send + 'static,
{
    if !platform.is_managed() {
        return None;
    }

    let handle = tokio::spawn(async move {
        signal.await;
        info!("SIGTERM received, saving session before shutdown");
        drain(&sync).await
    });

    info!("Shutdown handler registered");
    Some(handle)
}
