//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
///
/// None of these escape a page load: the agent logs them and degrades to
/// "no sync occurred".
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network error (connection, DNS, timeout at the HTTP layer).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a status other than 2xx or 304.
    #[error("unexpected HTTP status {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Protocol error (response body is not what we expect).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A sync URL failed validation.
    #[error("invalid sync url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The host could not perform a pixel or frame load.
    #[error("transport error: {0}")]
    Transport(String),

    /// Channel closed.
    #[error("channel closed")]
    ChannelClosed,
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}
