//! One-call environment preparation for a dyno.

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::platform::{Platform, CHROMIUM_PATH_VAR};
use crate::shutdown::install_shutdown_handler;
use crate::sync::{SaveOutcome, SessionSynchronizer};
use crate::tools::{PathLookup, ToolPaths};

pub const SKIP_DOWNLOAD_VAR: &str = "PUPPETEER_SKIP_DOWNLOAD";
pub const FFMPEG_PATH_VAR: &str = "FFMPEG_PATH";

/// Environment variables to export for the discovered tools.
pub fn tool_exports(paths: &ToolPaths) -> Vec<(&'static str, String)> {
    let mut exports = Vec::new();
    if let Some(ref chromium) = paths.chromium {
        exports.push((CHROMIUM_PATH_VAR, chromium.display().to_string()));
    }
    if paths.has_explicit_ffmpeg() {
        exports.push((FFMPEG_PATH_VAR, paths.ffmpeg.display().to_string()));
    }
    exports.push((SKIP_DOWNLOAD_VAR, "true".to_string()));
    exports
}

/// Export tool locations and register the shutdown flush.
///
/// Does nothing off the platform. Returns the shutdown handler's task.
pub fn configure_environment(
    platform: &Platform,
    sync: &SessionSynchronizer,
    lookup: &dyn PathLookup,
) -> Option<JoinHandle<SaveOutcome>> {
    if !platform.is_managed() {
        debug!("Not on a managed dyno, leaving environment untouched");
        return None;
    }

    let paths = ToolPaths::discover(platform, lookup);
    if let Some(ref chromium) = paths.chromium {
        info!(path = %chromium.display(), "Chromium path");
    }
    if paths.has_explicit_ffmpeg() {
        info!(path = %paths.ffmpeg.display(), "FFmpeg path");
    }
    for (name, value) in tool_exports(&paths) {
        std::env::set_var(name, value);
    }

    let handle = install_shutdown_handler(platform, sync.clone());
    info!("Environment configured");
    handle
}
