//! Client error types

use thiserror::Error;

/// Browser session error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request to the driver failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Bounded wait exceeded
    #[error("timed out after {waited_ms}ms waiting for {what}")]
    Timeout { what: String, waited_ms: u64 },

    /// Driver returned an unexpected payload
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Element or resource absent on the driver side
    #[error("Not found: {0}")]
    NotFound(String),

    /// Driver-side failure (session dead, window gone, protocol error)
    #[error("Session error: {0}")]
    Session(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Session-state file I/O
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Whether this error is a bounded-wait timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
