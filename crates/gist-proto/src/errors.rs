//! Wire format errors.

use thiserror::Error;

/// Result alias for payload parsing.
pub type Result<T> = std::result::Result<T, ProtoError>;

/// Errors produced while decoding gateway payloads.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    /// Payload is not valid JSON.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Payload is valid JSON but not the expected shape.
    #[error("unexpected payload shape: expected {expected}, found {found}")]
    UnexpectedShape {
        /// Shape the parser expected
        expected: &'static str,
        /// JSON type actually found
        found: &'static str,
    },
}

impl From<serde_json::Error> for ProtoError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedPayload(err.to_string())
    }
}
