//! Local session state.
//!
//! This module provides:
//! - `EncodedSession`: the tagged base64 form stored in the config var
//! - `ArtifactSource`: read access to the on-disk credential artifact
//! - `restore_artifact`: seeds the artifact from the booted config var
//!
//! The artifact itself is owned by the auth layer; nothing here writes it
//! except a restore into a path that doesn't exist yet.

pub mod artifact;
pub mod codec;
pub mod restore;

pub use artifact::{ArtifactSource, FileArtifact};
pub use codec::{EncodedSession, SessionDecodeError, TAG_SEPARATOR};
pub use restore::{restore_artifact, RestoreOutcome};
