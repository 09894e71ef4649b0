//! Error types for the application-facing call service

use callkit_core::CallCoreError;
use thiserror::Error;

/// Result type for call service operations
pub type CallKitResult<T> = Result<T, CallKitError>;

/// Errors surfaced to the application layer
///
/// Passive paths (notification actions, platform broadcasts) never produce
/// these; they only come back from explicit application requests.
#[derive(Debug, Error)]
pub enum CallKitError {
    /// Required method arguments were missing or had the wrong shape
    #[error("Invalid arguments: {message}")]
    InvalidArguments { message: String },

    /// Call payload could not be turned into call data
    #[error("Invalid call data: {0}")]
    InvalidCallData(#[from] CallCoreError),

    /// An explicit request found no call in the required state
    #[error("No active call to {operation}")]
    NoActiveCall { operation: String },

    /// The application invoked a method this service does not provide
    #[error("Method not implemented: {method}")]
    NotImplemented { method: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Logging could not be initialized
    #[error("Logging error: {message}")]
    Logging { message: String },

    /// No async runtime was available to host background work
    #[error("Runtime error: {message}")]
    Runtime { message: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CallKitError {
    /// Create an invalid arguments error
    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            message: message.into(),
        }
    }

    /// Create a no active call error for the given operation
    pub fn no_active_call(operation: impl Into<String>) -> Self {
        Self::NoActiveCall {
            operation: operation.into(),
        }
    }

    /// Create a not implemented error
    pub fn not_implemented(method: impl Into<String>) -> Self {
        Self::NotImplemented {
            method: method.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a logging error
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }

    /// Create a runtime error
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Stable error code reported to the application
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArguments { .. } => "INVALID_ARGUMENTS",
            Self::InvalidCallData(_) => "INVALID_CALL_DATA",
            Self::NoActiveCall { .. } => "NO_ACTIVE_CALL",
            Self::NotImplemented { .. } => "NOT_IMPLEMENTED",
            Self::Configuration { .. } => "CONFIG_ERROR",
            Self::Logging { .. } => "LOGGING_ERROR",
            Self::Runtime { .. } => "RUNTIME_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}

impl From<config::ConfigError> for CallKitError {
    fn from(err: config::ConfigError) -> Self {
        Self::config(err.to_string())
    }
}

impl From<serde_json::Error> for CallKitError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON encoding failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(CallKitError::invalid_arguments("x").code(), "INVALID_ARGUMENTS");
        assert_eq!(
            CallKitError::from(CallCoreError::invalid_payload("x")).code(),
            "INVALID_CALL_DATA"
        );
        assert_eq!(CallKitError::no_active_call("answer").code(), "NO_ACTIVE_CALL");
        assert_eq!(CallKitError::not_implemented("foo").code(), "NOT_IMPLEMENTED");
        assert_eq!(CallKitError::config("x").code(), "CONFIG_ERROR");
        assert_eq!(CallKitError::runtime("x").code(), "RUNTIME_ERROR");
    }

    #[test]
    fn test_no_active_call_message() {
        let err = CallKitError::no_active_call("answer");
        assert_eq!(err.to_string(), "No active call to answer");
    }
}
