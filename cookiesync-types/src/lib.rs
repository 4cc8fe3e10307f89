//! Core type definitions for the cookie sync agent.
//!
//! This crate defines the plain data shared by the engine and its hosts:
//! - Sanitized page-load configuration ([`SyncConfig`])
//! - Consent messages exchanged with the parent frame
//! - Sync endpoint request and response bodies
//! - Session identifiers
//!
//! Nothing here performs I/O.

mod config;
mod consent;
mod ids;
mod response;

pub use config::{
    ArgValue, ConsentScope, EndpointArgs, SyncConfig, DEFAULT_ENDPOINT_NAME,
    DEFAULT_ENDPOINT_URL, DEFAULT_TIMEOUT_MS, MAX_SAFE_INTEGER, RUBICON_ENDPOINT_URL,
};
pub use consent::{
    ConsentData, ConsentRequest, AMP_SENTINEL, ANY_ORIGIN, CONSENT_DATA_TYPE,
    SEND_CONSENT_DATA_TYPE,
};
pub use ids::SessionId;
pub use response::{
    BidderStatus, SyncRequestBody, SyncResponse, SyncStatus, SyncType, UserSync,
};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("invalid consent scope: {0} (expected 0 or 1)")]
    InvalidConsentScope(u8),
}
