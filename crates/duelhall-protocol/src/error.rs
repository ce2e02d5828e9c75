//! Error types for the protocol layer.

use crate::ErrorKind;

/// Errors raised while encoding, decoding, or parsing protocol values.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust value into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, missing fields, wrong types.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// A game type string matched neither a code nor a display name.
    #[error("unknown game type: {0}")]
    UnknownGameType(String),
}

impl ProtocolError {
    /// Every protocol failure is the caller's malformed input.
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Validation
    }
}
