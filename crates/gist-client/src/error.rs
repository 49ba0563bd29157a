//! Client error types.

use gist_core::ConnectionError;
use thiserror::Error;

/// Errors raised by a transport or polling request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not reach the gateway.
    #[error("connect failed: {0}")]
    Connect(String),

    /// Gateway answered with a non-success status.
    #[error("gateway returned HTTP {status}")]
    Status {
        /// HTTP status code
        status: u16,
    },

    /// The response body broke off.
    #[error("stream error: {0}")]
    Stream(String),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl TransportError {
    /// Returns true if the same request may succeed later.
    ///
    /// Client errors (4xx) are permanent except request timeout (408) and
    /// rate limiting (429).
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Status { status } => !(400..500).contains(status) || matches!(status, 408 | 429),
            Self::Connect(_) | Self::Stream(_) => true,
            Self::Decode(_) => false,
        }
    }
}

impl From<&TransportError> for ConnectionError {
    fn from(error: &TransportError) -> Self {
        if error.is_retryable() {
            Self::Transport(error.to_string())
        } else {
            Self::Rejected(error.to_string())
        }
    }
}

/// Invalid gateway configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A base URL did not parse.
    #[error("invalid URL {url}: {reason}")]
    InvalidUrl {
        /// Offending URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// A base URL is not http or https.
    #[error("unsupported scheme {scheme} in {url}")]
    UnsupportedScheme {
        /// Offending URL
        url: String,
        /// Its scheme
        scheme: String,
    },

    /// The store has no site id yet.
    #[error("site id is not set")]
    MissingSiteId,
}

/// Errors returned by [`crate::ConnectionManager`] handles.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// The manager task has exited.
    #[error("connection manager is not running")]
    ManagerStopped,
}
