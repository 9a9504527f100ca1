//! Locating the browser and video encoder binaries.
//!
//! Buildpacks install Chrome and ffmpeg under `/app`, which nothing puts on
//! `PATH`. Discovery checks the known buildpack locations on a dyno, then
//! the usual system locations.

use std::path::{Path, PathBuf};

use crate::platform::{Platform, CHROMIUM_PATH_VAR};

/// Chrome buildpack locations, checked only on a dyno.
const DYNO_CHROMIUM_PATHS: &[&str] = &[
    "/app/.apt/usr/bin/google-chrome-stable",
    "/app/.apt/usr/bin/google-chrome",
    "/app/.chrome/opt/google/chrome/google-chrome",
];

const SYSTEM_CHROMIUM_PATHS: &[&str] = &[
    "/usr/bin/chromium-browser",
    "/usr/bin/chromium",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
];

/// ffmpeg buildpack locations, checked only on a dyno.
const DYNO_FFMPEG_PATHS: &[&str] = &[
    "/app/vendor/ffmpeg/ffmpeg",
    "/app/.heroku/vendor/ffmpeg",
    "/usr/bin/ffmpeg",
];

/// Resolved from `PATH` at spawn time.
pub const FFMPEG_FALLBACK: &str = "ffmpeg";

/// Answers "does this file exist?". Injected so tests don't depend on the host.
pub trait PathLookup {
    fn exists(&self, path: &Path) -> bool;
}

/// Checks the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLookup;

impl PathLookup for FsLookup {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

impl<F: Fn(&Path) -> bool> PathLookup for F {
    fn exists(&self, path: &Path) -> bool {
        self(path)
    }
}

fn first_existing(candidates: &[&str], lookup: &dyn PathLookup) -> Option<PathBuf> {
    candidates
        .iter()
        .map(Path::new)
        .find(|p| lookup.exists(p))
        .map(Path::to_path_buf)
}

/// An explicit `PUPPETEER_EXECUTABLE_PATH` always wins, unchecked.
pub fn discover_chromium(platform: &Platform, lookup: &dyn PathLookup) -> Option<PathBuf> {
    if let Some(explicit) = platform.get(CHROMIUM_PATH_VAR) {
        return Some(PathBuf::from(explicit));
    }

    if platform.is_managed() {
        if let Some(path) = first_existing(DYNO_CHROMIUM_PATHS, lookup) {
            return Some(path);
        }
    }

    first_existing(SYSTEM_CHROMIUM_PATHS, lookup)
}

/// Falls back to the bare `ffmpeg` command.
pub fn discover_ffmpeg(platform: &Platform, lookup: &dyn PathLookup) -> PathBuf {
    if platform.is_managed() {
        if let Some(path) = first_existing(DYNO_FFMPEG_PATHS, lookup) {
            return path;
        }
    }
    PathBuf::from(FFMPEG_FALLBACK)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolPaths {
    pub chromium: Option<PathBuf>,
    pub ffmpeg: PathBuf,
}

impl ToolPaths {
    pub fn discover(platform: &Platform, lookup: &dyn PathLookup) -> Self {
        Self {
            chromium: discover_chromium(platform, lookup),
            ffmpeg: discover_ffmpeg(platform, lookup),
        }
    }

    /// True when ffmpeg resolved to a concrete file rather than `PATH` lookup.
    pub fn has_explicit_ffmpeg(&self) -> bool {
        self.ffmpeg != Path::new(FFMPEG_FALLBACK)
    }
}
