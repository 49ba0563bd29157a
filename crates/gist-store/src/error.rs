//! Store error types.

use thiserror::Error;

/// Errors returned by [`crate::Store::dispatch`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A middleware or the reducer panicked. State was rolled back to the
    /// value before the failing action.
    #[error("action {action} panicked: {reason}")]
    ActionPanicked {
        /// Name of the failing action
        action: &'static str,
        /// Panic payload, if it was a string
        reason: String,
    },

    /// Middleware kept injecting actions past the cascade limit.
    #[error("dispatch cascade exceeded {limit} actions")]
    CascadeOverflow {
        /// Limit that was hit
        limit: usize,
    },
}

/// Failure reported by a [`crate::MetricsLogger`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("metrics delivery failed: {0}")]
pub struct MetricsError(pub String);

/// An environment name that is not one of the known backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown environment: {0}")]
pub struct UnknownEnvironment(pub String);
