//! Error types for the reindex system.

use thiserror::Error;

/// Failure reported by the search engine client for one bulk call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Network or 5xx-class failure; worth one more attempt
    #[error("Transient client error: {0}")]
    Transient(String),

    /// Any other rejected request
    #[error("Request failed: {0}")]
    Request(String),
}

impl ClientError {
    /// Whether the retry wrapper may try the call again.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transient(_))
    }
}

/// Unified error type for reindex operations.
#[derive(Debug, Error)]
pub enum ReindexError {
    /// Rejected before any I/O (bad mode, bad option combination, bad settings)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Terminal bulk client failure
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// The bulk call succeeded but some documents were rejected
    #[error("Import failed on {index}: {failed} item(s) rejected, first: {first_reason}")]
    Import {
        index: String,
        failed: usize,
        first_reason: String,
    },

    /// Record store failure
    #[error("Source error: {0}")]
    Source(String),

    /// Job runner refused the payload
    #[error("Enqueue error: {0}")]
    Enqueue(String),

    /// Shared batch set store failure
    #[error("Tracker error: {0}")]
    Tracker(String),

    /// Durable reindex queue failure
    #[error("Queue error: {0}")]
    Queue(String),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ReindexError {
    /// Shorthand for an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }
}

impl From<serde_json::Error> for ReindexError {
    fn from(err: serde_json::Error) -> Self {
        ReindexError::Serialization(err.to_string())
    }
}
