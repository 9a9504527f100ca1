//! Managed-environment detection.
//!
//! A `Platform` is a snapshot of the handful of process variables the
//! hosting platform injects into every dyno. Everything else in the crate
//! consults it instead of reading `std::env` directly, so behaviour outside
//! the platform is inert and tests never touch the real environment.

use std::collections::HashMap;

/// Set by the platform on every dyno (e.g. `web.1`).
pub const DYNO_VAR: &str = "DYNO";

/// Platform API key used to authenticate config-var updates.
pub const API_KEY_VAR: &str = "HEROKU_API_KEY";

/// Name of the app whose config vars receive the session.
pub const APP_NAME_VAR: &str = "HEROKU_APP_NAME";

/// Default config var holding the session; its booted value seeds the
/// deduplication baseline.
pub const SESSION_VAR: &str = "SESSION_ID";

/// Explicit browser location, honoured before any filesystem lookup.
pub const CHROMIUM_PATH_VAR: &str = "PUPPETEER_EXECUTABLE_PATH";

#[derive(Debug, Clone, Default)]
pub struct Platform {
    vars: HashMap<String, String>,
}

/// App name and API key, present only when both are non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct RemoteCredentials {
    pub app_name: String,
    pub api_key: String,
}

impl std::fmt::Debug for RemoteCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteCredentials")
            .field("app_name", &self.app_name)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Platform {
    /// Snapshot the current process environment. Non-UTF-8 entries are skipped.
    pub fn from_env() -> Self {
        Self::from_vars(
            std::env::vars_os()
                .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?))),
        )
    }

    /// Build from explicit pairs. Empty values are dropped so they read as absent.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// True when running on a platform dyno.
    pub fn is_managed(&self) -> bool {
        self.vars.contains_key(DYNO_VAR)
    }

    pub fn dyno(&self) -> Option<&str> {
        self.get(DYNO_VAR)
    }

    /// Credentials for the config-var API, or `None` if either half is missing.
    pub fn credentials(&self) -> Option<RemoteCredentials> {
        let api_key = self.get(API_KEY_VAR)?;
        let app_name = self.get(APP_NAME_VAR)?;
        Some(RemoteCredentials {
            app_name: app_name.to_string(),
            api_key: api_key.to_string(),
        })
    }
}
