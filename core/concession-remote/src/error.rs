//! Error types for the remote adapter layer.

use thiserror::Error;

/// Result type for remote operations.
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors that can occur talking to the remote feature service.
///
/// Only [`RemoteError::Config`] is fatal. Everything else is folded into an
/// outcome value by the adapter's write operations.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// The adapter is missing or has an invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Network error (connect, timeout, non-2xx status).
    #[error("network error: {0}")]
    Network(String),

    /// The service answered, but with an error or an unexpected body.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            RemoteError::Protocol(e.to_string())
        } else {
            RemoteError::Network(e.to_string())
        }
    }
}
