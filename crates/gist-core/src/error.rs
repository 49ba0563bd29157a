//! Error types for the connection core.
//!
//! Connection errors are classified, not just reported: the retry policy
//! needs to know whether another attempt can possibly succeed.

use std::time::Duration;

use thiserror::Error;

/// Errors that end a connection attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Transport failed to open or broke mid-stream.
    #[error("transport failed: {0}")]
    Transport(String),

    /// Server closed the stream.
    #[error("stream closed by server")]
    Closed,

    /// No heartbeat arrived within the allowed window.
    #[error("heartbeat timeout after {elapsed:?}")]
    HeartbeatTimeout {
        /// Window that elapsed without a heartbeat
        elapsed: Duration,
    },

    /// The server rejected the request in a way a retry cannot fix.
    #[error("connection rejected: {0}")]
    Rejected(String),
}

impl ConnectionError {
    /// Returns true if another attempt may succeed.
    ///
    /// Rejections are permanent for this configuration; everything
    /// network-shaped is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Closed | Self::HeartbeatTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_failures_are_retryable() {
        assert!(ConnectionError::Transport("reset".into()).is_retryable());
        assert!(ConnectionError::Closed.is_retryable());
        assert!(
            ConnectionError::HeartbeatTimeout { elapsed: Duration::from_secs(35) }.is_retryable()
        );
    }

    #[test]
    fn rejections_are_permanent() {
        assert!(!ConnectionError::Rejected("401 unauthorized".into()).is_retryable());
    }
}
