//! Seeding the credential file from the booted session var.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::EncodedSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Artifact written from the booted value.
    Restored,
    /// A local artifact already exists; left untouched.
    AlreadyPresent,
    /// No value to restore from.
    NoValue,
    /// Value present but not ours.
    Untagged,
}

/// Seed the credential artifact from the session value the dyno booted with.
///
/// Runs once before syncing starts. An existing artifact is never
/// overwritten since it is at least as fresh as the config var.
pub fn restore_artifact(path: &Path, tag: &str, value: Option<&str>) -> Result<RestoreOutcome> {
    if path.exists() {
        debug!(path = %path.display(), "Artifact already present, skipping restore");
        return Ok(RestoreOutcome::AlreadyPresent);
    }

    let Some(value) = value else {
        return Ok(RestoreOutcome::NoValue);
    };

    if !EncodedSession::has_tag(tag, value) {
        warn!(tag, "Session value does not carry our tag, not restoring");
        return Ok(RestoreOutcome::Untagged);
    }

    let bytes = EncodedSession::decode(tag, value).context("Failed to decode session value")?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, &bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    info!(path = %path.display(), bytes = bytes.len(), "Session restored from config var");
    Ok(RestoreOutcome::Restored)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restores_into_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session").join("creds.json");

        let outcome = restore_artifact(&path, "T", Some("T:~YWJj")).unwrap();
        assert_eq!(outcome, RestoreOutcome::Restored);
        assert_eq!(std::fs::read(&path).unwrap(), b"abc");
    }

    #[test]
    fn test_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, b"newer").unwrap();

        let outcome = restore_artifact(&path, "T", Some("T:~YWJj")).unwrap();
        assert_eq!(outcome, RestoreOutcome::AlreadyPresent);
        assert_eq!(std::fs::read(&path).unwrap(), b"newer");
    }

    #[test]
    fn test_skips_absent_and_foreign_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");

        assert_eq!(restore_artifact(&path, "T", None).unwrap(), RestoreOutcome::NoValue);
        assert_eq!(
            restore_artifact(&path, "T", Some("raw-session")).unwrap(),
            RestoreOutcome::Untagged
        );
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupt_payload_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        assert!(restore_artifact(&path, "T", Some("T:~%%%")).is_err());
        assert!(!path.exists());
    }
}
