//! Sanitized page-load configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Largest integer a page script can represent exactly (2^53 - 1).
/// Used as the "no limit" sync count.
pub const MAX_SAFE_INTEGER: u64 = 9_007_199_254_740_991;

/// Default wait for the consent message, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Built-in name of the default sync endpoint.
pub const DEFAULT_ENDPOINT_NAME: &str = "appnexus";

/// URL of the default sync endpoint.
pub const DEFAULT_ENDPOINT_URL: &str = "https://prebid.adnxs.com/pbs/v1/cookie_sync";

/// URL of the Rubicon sync endpoint.
pub const RUBICON_ENDPOINT_URL: &str = "https://prebid-server.rubiconproject.com/cookie_sync";

/// A value carried in the extra endpoint arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Int(i64),
    Str(String),
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<ArgValue> for serde_json::Value {
    fn from(value: ArgValue) -> Self {
        match value {
            ArgValue::Int(n) => serde_json::Value::from(n),
            ArgValue::Str(s) => serde_json::Value::String(s),
        }
    }
}

/// Extra arguments merged into the sync request body.
pub type EndpointArgs = BTreeMap<String, ArgValue>;

/// Whether consent regulation is assumed to apply when no consent data arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum ConsentScope {
    /// `0`: regulation assumed not to apply; sync may proceed without consent.
    NotApplicable,
    /// `1`: regulation assumed to apply; no sync without consent data.
    #[default]
    Applicable,
}

impl ConsentScope {
    /// Returns the wire flag (`0` or `1`).
    #[must_use]
    pub const fn as_flag(self) -> u8 {
        match self {
            Self::NotApplicable => 0,
            Self::Applicable => 1,
        }
    }

    /// Maps a wire flag back to a scope; only `0` and `1` are valid.
    #[must_use]
    pub const fn from_flag(flag: u8) -> Option<Self> {
        match flag {
            0 => Some(Self::NotApplicable),
            1 => Some(Self::Applicable),
            _ => None,
        }
    }
}

impl From<ConsentScope> for u8 {
    fn from(scope: ConsentScope) -> Self {
        scope.as_flag()
    }
}

impl TryFrom<u8> for ConsentScope {
    type Error = crate::Error;

    fn try_from(flag: u8) -> crate::Result<Self> {
        Self::from_flag(flag).ok_or(crate::Error::InvalidConsentScope(flag))
    }
}

impl fmt::Display for ConsentScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_flag())
    }
}

/// Immutable configuration for one page load.
///
/// Every field holds a sanitized value; construct it through the sanitizer
/// rather than from raw page input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Sync-coordination endpoint, always taken from the allow-list.
    pub endpoint_url: String,
    /// Extra request arguments; `None` when none survived sanitizing.
    pub endpoint_args: Option<EndpointArgs>,
    /// Upper bound on bidders the endpoint may ask us to sync.
    pub max_sync_count: u64,
    /// How long to wait for consent data, in milliseconds.
    pub timeout_ms: u64,
    /// Scope assumed when the consent message never arrives.
    pub default_consent_scope: ConsentScope,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            endpoint_args: None,
            max_sync_count: MAX_SAFE_INTEGER,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            default_consent_scope: ConsentScope::Applicable,
        }
    }
}

impl SyncConfig {
    /// The consent wait as a `Duration`.
    #[must_use]
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}
