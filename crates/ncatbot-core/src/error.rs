//! Error types shared by every NcatBot crate.
//!
//! Engine-level errors (registration, configuration) live in
//! `ncatbot-framework`.

use thiserror::Error;

// =============================================================================
// API Errors
// =============================================================================

/// Error type for outbound API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No connection to the protocol implementation.
    #[error("bot is not connected")]
    NotConnected,
    /// The API call timed out.
    #[error("API call timed out")]
    Timeout,
    /// The implementation answered with a failure status.
    #[error("API error ({retcode}): {message}")]
    Failed { retcode: i64, message: String },
    /// Failed to serialize/deserialize.
    #[error("serialization error: {0}")]
    SerializationError(String),
    /// The caller cannot issue API calls.
    #[error("API calls are not supported by this caller")]
    NotSupported,
    /// The event lacks what the call needs (for example a group id).
    #[error("missing session info: {0}")]
    MissingSession(&'static str),
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

// =============================================================================
// Event Errors
// =============================================================================

/// Errors decoding an inbound event.
#[derive(Debug, Clone, Error)]
pub enum EventError {
    #[error("failed to decode event: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for event decoding.
pub type EventResult<T> = Result<T, EventError>;
