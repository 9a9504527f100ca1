//! Synchronizer configuration.
//!
//! Every field has a default, so an absent or partial config file is fine.
//! The default location is `~/.config/dynosync/config.json`; on a dyno the
//! file usually doesn't exist and the defaults apply.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::platform::SESSION_VAR;
use crate::remote::{DEFAULT_API_BASE_URL, REQUEST_TIMEOUT_SECS};

/// Application name used for the config directory path
const APP_NAME: &str = "dynosync";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Overrides `session_path` when set.
pub const SESSION_PATH_VAR: &str = "DYNOSYNC_SESSION_PATH";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Credential artifact written by the auth layer.
    pub session_path: PathBuf,
    /// Config var that holds the encoded session.
    pub variable_name: String,
    /// Prefix identifying values we produced.
    pub session_tag: String,
    pub debounce_secs: u64,
    pub request_timeout_secs: u64,
    pub api_base_url: String,
    /// How often the watcher fingerprints the artifact.
    pub watch_interval_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            session_path: PathBuf::from("session").join("creds.json"),
            variable_name: SESSION_VAR.to_string(),
            session_tag: "TECHWORLD".to_string(),
            debounce_secs: 30,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            watch_interval_secs: 5,
        }
    }
}

impl SyncConfig {
    /// Load from `path`, or from the default location when `None`.
    /// A missing file yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => match Self::default_path() {
                Some(p) => p,
                None => return Ok(Self::default().with_env_overrides()),
            },
        };

        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?
        } else {
            Self::default()
        };

        Ok(config.with_env_overrides())
    }

    fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(SESSION_PATH_VAR) {
            if !path.is_empty() {
                self.session_path = PathBuf::from(path);
            }
        }
        self
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_secs(self.debounce_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SyncConfig::default();
        assert_eq!(config.debounce(), Duration::from_secs(30));
        assert_eq!(config.request_timeout(), Duration::from_secs(15));
        assert_eq!(config.variable_name, "SESSION_ID");
        assert_eq!(config.session_path, Path::new("session/creds.json"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"debounce_secs": 2, "session_tag": "BOT"}"#).unwrap();

        let config = SyncConfig::load(Some(&path)).unwrap();
        assert_eq!(config.debounce_secs, 2);
        assert_eq!(config.session_tag, "BOT");
        assert_eq!(config.request_timeout_secs, 15);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = SyncConfig::load(Some(&dir.path().join("nope.json"))).unwrap();
        assert_eq!(config.api_base_url, "https://api.heroku.com");
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(SyncConfig::load(Some(&path)).is_err());
    }

    #[test]
    fn test_watch_interval_never_zero() {
        let config = SyncConfig {
            watch_interval_secs: 0,
            ..SyncConfig::default()
        };
        assert_eq!(config.watch_interval(), Duration::from_secs(1));
    }
}
