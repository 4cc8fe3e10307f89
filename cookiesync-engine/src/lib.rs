//! Consent-gated cookie sync engine.
//!
//! Reconciles third-party identifier state between a publisher page and a
//! set of advertising bidders, once per page load, gated on consent data
//! delivered asynchronously by the parent frame.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Sanitize**: turns raw page parameters into a safe [`SyncConfig`]
//! - **Consent**: races the consent message against a timeout and decides
//!   whether the sync may fire
//! - **Requestor**: sends the one request to the sync-coordination endpoint
//! - **Dispatcher**: syncs eligible bidders one at a time
//! - **Transport**: host capabilities (parent frame, pixel/frame loads) and
//!   sync URL validation
//! - **Agent**: runs one page load over a shared [`SyncSession`]
//!
//! ## Page Load
//!
//! 1. **Announce**: ask the parent frame for consent data
//! 2. **Wait**: consent message or timeout, whichever comes first
//! 3. **Request**: fire the sync request at most once
//! 4. **Dispatch**: trigger each eligible bidder's sync in turn
//!
//! # Example
//!
//! ```
//! use cookiesync_engine::{EndpointRegistry, PageParams};
//!
//! let params = PageParams::from_query("?endpoint=rubicon&max_sync_count=5&args=account:42");
//! let config = params.into_config(&EndpointRegistry::default());
//!
//! assert_eq!(config.endpoint_url, "https://prebid-server.rubiconproject.com/cookie_sync");
//! assert_eq!(config.max_sync_count, 5);
//! ```

mod agent;
pub mod consent;
pub mod dispatcher;
mod error;
pub mod http_host;
pub mod requestor;
pub mod sanitize;
mod session;
pub mod transport;

pub use agent::{AgentReport, SyncAgent};
pub use consent::{ConsentGate, GateDecision, GateOutcome, GateState};
pub use dispatcher::{BidderDispatcher, DispatchReport};
pub use error::{SyncError, SyncResult};
pub use http_host::{HttpHostConfig, HttpSyncHost};
pub use requestor::SyncRequestor;
pub use sanitize::{
    sanitize_consent_scope, sanitize_endpoint_args, sanitize_sync_count, sanitize_timeout,
    EndpointRegistry, PageParams,
};
pub use session::SyncSession;
pub use transport::{is_private_ip, validate_sync_url, ParentFrame, SyncHost};

pub use cookiesync_types::SyncConfig;
