//! Error types for the call session core
//!
//! Registry and deduplicator operations are total: a missing session is
//! reported as `false` or `None`, never as an error. The variants below only
//! cover malformed input crossing into the core from the application layer.

use thiserror::Error;

/// Result type for call core operations
pub type CallCoreResult<T> = Result<T, CallCoreError>;

/// Errors that can occur while converting application input into core types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CallCoreError {
    /// The call payload was not a key/value object
    #[error("Invalid call payload: {message}")]
    InvalidPayload { message: String },

    /// An action signal named an action the core does not know
    #[error("Unknown call action: {action}")]
    UnknownAction { action: String },

    /// An end reason string was not one of `hangup`, `ended` or `rejected`
    #[error("Unknown end reason: {reason}")]
    UnknownEndReason { reason: String },
}

impl CallCoreError {
    /// Create an invalid payload error
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }

    /// Create an unknown action error
    pub fn unknown_action(action: impl Into<String>) -> Self {
        Self::UnknownAction {
            action: action.into(),
        }
    }
}
