//! The `<tag>:~<base64>` session encoding.
//!
//! The tag marks values this crate produced, so a foreign value in the
//! session var is never decoded into the credential file.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Sits between the tag and the base64 payload.
pub const TAG_SEPARATOR: &str = ":~";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionDecodeError {
    #[error("Session value is missing the '{0}{sep}' prefix", sep = TAG_SEPARATOR)]
    MissingTag(String),

    #[error("Session payload is not valid base64: {0}")]
    InvalidBase64(String),
}

/// A credential artifact in its config-var form: `<tag>:~<base64>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedSession(String);

impl EncodedSession {
    /// Deterministic: identical bytes always give an identical value.
    pub fn encode(tag: &str, artifact: &[u8]) -> Self {
        Self(format!("{}{}{}", tag, TAG_SEPARATOR, STANDARD.encode(artifact)))
    }

    /// Strip the tag and return the original artifact bytes.
    pub fn decode(tag: &str, value: &str) -> Result<Vec<u8>, SessionDecodeError> {
        let payload = value
            .strip_prefix(tag)
            .and_then(|rest| rest.strip_prefix(TAG_SEPARATOR))
            .ok_or_else(|| SessionDecodeError::MissingTag(tag.to_string()))?;

        STANDARD
            .decode(payload.trim())
            .map_err(|e| SessionDecodeError::InvalidBase64(e.to_string()))
    }

    pub fn has_tag(tag: &str, value: &str) -> bool {
        value
            .strip_prefix(tag)
            .is_some_and(|rest| rest.starts_with(TAG_SEPARATOR))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for EncodedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for EncodedSession {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_value() {
        let encoded = EncodedSession::encode("TECHWORLD", b"abc");
        assert_eq!(encoded.as_str(), "TECHWORLD:~YWJj");
    }

    #[test]
    fn test_encode_is_deterministic() {
        let creds = br#"{"noiseKey":{"private":"x"}}"#;
        assert_eq!(
            EncodedSession::encode("TAG", creds),
            EncodedSession::encode("TAG", creds)
        );
        assert_ne!(
            EncodedSession::encode("TAG", b"abc"),
            EncodedSession::encode("TAG", b"abcd")
        );
    }

    #[test]
    fn test_decode_strips_tag() {
        let bytes = EncodedSession::decode("TECHWORLD", "TECHWORLD:~YWJjZA==").unwrap();
        assert_eq!(bytes, b"abcd");
    }

    #[test]
    fn test_decode_rejects_foreign_tag() {
        assert_eq!(
            EncodedSession::decode("TECHWORLD", "OTHER:~YWJj"),
            Err(SessionDecodeError::MissingTag("TECHWORLD".into()))
        );
        // Tag without separator is not ours either
        assert!(EncodedSession::decode("TECHWORLD", "TECHWORLDYWJj").is_err());
    }

    #[test]
    fn test_decode_rejects_bad_payload() {
        let err = EncodedSession::decode("T", "T:~not base64!").unwrap_err();
        assert!(matches!(err, SessionDecodeError::InvalidBase64(_)));
    }

    #[test]
    fn test_has_tag() {
        assert!(EncodedSession::has_tag("T", "T:~"));
        assert!(!EncodedSession::has_tag("T", "T:"));
        assert!(!EncodedSession::has_tag("T", "TX:~abc"));
    }
}
