//! Access to the credential file the auth layer writes.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Read access to the credential artifact.
///
/// Absence is `Ok(None)`, not an error: the auth layer may not have
/// written anything yet.
pub trait ArtifactSource: Send + Sync {
    fn read(&self) -> io::Result<Option<Vec<u8>>>;

    /// Cheap change detector for the watcher. Defaults to hashing the content.
    fn fingerprint(&self) -> io::Result<Option<u64>> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        Ok(self.read()?.map(|bytes| {
            let mut hasher = DefaultHasher::new();
            bytes.hash(&mut hasher);
            hasher.finish()
        }))
    }

    /// Human-readable location, used in log lines.
    fn describe(&self) -> String;
}

/// The artifact as a file at a fixed path.
#[derive(Debug, Clone)]
pub struct FileArtifact {
    path: PathBuf,
}

impl FileArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl ArtifactSource for FileArtifact {
    fn read(&self) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Length and mtime, so polling never reads the file.
    fn fingerprint(&self) -> io::Result<Option<u64>> {
        let meta = match std::fs::metadata(&self.path) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let modified = meta
            .modified()
            .ok()
            .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0);

        Ok(Some(modified.rotate_left(17) ^ meta.len()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}
