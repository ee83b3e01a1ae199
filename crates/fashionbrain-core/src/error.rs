//! Error types for fashionbrain.
//!
//! Every failure a caller of the API client can observe is a variant of
//! [`FashionBrainError`]. The four request outcomes that are not a success
//! (`Timeout`, `Network`, `Server`, `Parse`) are kept distinct so callers can
//! decide what to tell the user.

use std::time::Duration;

/// The main error type for fashionbrain operations.
#[derive(Debug, thiserror::Error)]
pub enum FashionBrainError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration value
    #[error("Invalid configuration for '{field}': {message}")]
    InvalidConfig { field: String, message: String },

    /// Configuration file not found
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(String),

    /// No response arrived within the request's time budget.
    #[error("Request timeout - please check your connection and verify backend is running")]
    Timeout {
        /// Full URL of the aborted request.
        url: String,
        /// The budget that elapsed.
        after: Duration,
    },

    /// The backend could not be reached at all (connection refused, DNS, TLS).
    #[error("Cannot connect to backend at {base_url}. Is the server running?")]
    Network { base_url: String, reason: String },

    /// The backend answered with a non-success status.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// The backend answered with a success status but an unusable body.
    #[error("Invalid response from server: {0}")]
    Parse(String),

    /// The request was rejected before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The request payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl FashionBrainError {
    /// Create a config error with a message
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid config error
    pub fn invalid_config<F: Into<String>, M: Into<String>>(field: F, message: M) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a server error
    pub fn server<S: Into<String>>(status: u16, message: S) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create an invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Whether the user may simply try again (no automatic retry is done).
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Network { .. })
    }

    /// HTTP status of a server-side failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the backend rejected the credentials (401/403).
    ///
    /// Callers holding a stored token should discard it on these.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }
}

/// Result type alias for fashionbrain operations
pub type Result<T> = std::result::Result<T, FashionBrainError>;
