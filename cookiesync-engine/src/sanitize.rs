//! Page parameter sanitizing.
//!
//! Every value the page supplies passes through here before any network or
//! host action. The functions are pure: malformed input is replaced by a
//! documented default, never propagated.

use cookiesync_types::{
    ArgValue, ConsentScope, EndpointArgs, SyncConfig, DEFAULT_ENDPOINT_NAME,
    DEFAULT_ENDPOINT_URL, DEFAULT_TIMEOUT_MS, MAX_SAFE_INTEGER, RUBICON_ENDPOINT_URL,
};
use std::collections::BTreeMap;
use tracing::debug;

/// Query parameter naming the sync endpoint.
pub const PARAM_ENDPOINT: &str = "endpoint";
/// Query parameter carrying extra `key:value` arguments.
pub const PARAM_ARGS: &str = "args";
/// Query parameter bounding the number of bidders to sync.
pub const PARAM_MAX_SYNC_COUNT: &str = "max_sync_count";
/// Query parameter with the consent wait in milliseconds.
pub const PARAM_TIMEOUT: &str = "timeout";
/// Query parameter with the scope assumed without consent data.
pub const PARAM_DEFAULT_GDPR_SCOPE: &str = "defaultGdprScope";

/// Allow-list of sync endpoints, keyed by name.
///
/// Pages may only pick an endpoint by name; an unknown name resolves to the
/// default URL so a page can never point the agent at an arbitrary host.
#[derive(Debug, Clone)]
pub struct EndpointRegistry {
    endpoints: BTreeMap<String, String>,
    default_url: String,
}

impl Default for EndpointRegistry {
    fn default() -> Self {
        let mut endpoints = BTreeMap::new();
        endpoints.insert(DEFAULT_ENDPOINT_NAME.to_string(), DEFAULT_ENDPOINT_URL.to_string());
        endpoints.insert("rubicon".to_string(), RUBICON_ENDPOINT_URL.to_string());
        Self {
            endpoints,
            default_url: DEFAULT_ENDPOINT_URL.to_string(),
        }
    }
}

impl EndpointRegistry {
    /// Creates a registry with the built-in endpoints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a named endpoint.
    pub fn with_endpoint(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.endpoints.insert(name.into(), url.into());
        self
    }

    /// Replaces the URL used for unknown or missing names.
    pub fn with_default_url(mut self, url: impl Into<String>) -> Self {
        self.default_url = url.into();
        self
    }

    /// Whether `name` is on the allow-list.
    pub fn contains(&self, name: &str) -> bool {
        self.endpoints.contains_key(name)
    }

    /// Registered endpoint names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.endpoints.keys().map(String::as_str)
    }

    /// The URL for unknown names.
    pub fn default_url(&self) -> &str {
        &self.default_url
    }

    /// Resolves a page-supplied endpoint name to a URL.
    pub fn resolve(&self, name: Option<&str>) -> &str {
        match name.and_then(|n| self.endpoints.get(n)) {
            Some(url) => url,
            None => {
                if let Some(n) = name {
                    debug!("unknown sync endpoint {n:?}, using default");
                }
                &self.default_url
            }
        }
    }
}

/// Parses the `args` parameter: comma-separated `key:value` pairs.
///
/// Splits each pair on its first `:`. A pair survives only if both key and
/// value are non-empty after trimming; integer values become
/// [`ArgValue::Int`]. Returns `None` when nothing survived.
pub fn sanitize_endpoint_args(raw: Option<&str>) -> Option<EndpointArgs> {
    let raw = raw?;
    let mut args = EndpointArgs::new();

    for pair in raw.split(',') {
        let Some((key, value)) = pair.split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());
        if key.is_empty() || value.is_empty() {
            continue;
        }

        let value = match value.parse::<i64>() {
            Ok(n) => ArgValue::Int(n),
            Err(_) => ArgValue::Str(value.to_string()),
        };
        args.insert(key.to_string(), value);
    }

    if args.is_empty() { None } else { Some(args) }
}

/// Parses `max_sync_count`.
///
/// Absent, non-numeric or negative input means "no limit"
/// ([`MAX_SAFE_INTEGER`]); zero is kept. Larger values are clamped.
pub fn sanitize_sync_count(raw: Option<&str>) -> u64 {
    match raw.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(n)) if n >= 0 => (n as u64).min(MAX_SAFE_INTEGER),
        _ => MAX_SAFE_INTEGER,
    }
}

/// Parses `defaultGdprScope`. Only `0` and `1` are accepted; anything else
/// falls back to `1` (regulation applies).
pub fn sanitize_consent_scope(raw: Option<&str>) -> ConsentScope {
    raw.map(str::trim)
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|n| u8::try_from(n).ok())
        .and_then(ConsentScope::from_flag)
        .unwrap_or(ConsentScope::Applicable)
}

/// Parses `timeout` (milliseconds). Anything but a non-negative integer
/// falls back to [`DEFAULT_TIMEOUT_MS`].
pub fn sanitize_timeout(raw: Option<&str>) -> u64 {
    match raw.map(str::trim).map(str::parse::<i64>) {
        Some(Ok(n)) if n >= 0 => n as u64,
        _ => DEFAULT_TIMEOUT_MS,
    }
}

/// Raw page parameters, read once from the page's query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageParams {
    pub endpoint: Option<String>,
    pub args: Option<String>,
    pub max_sync_count: Option<String>,
    pub timeout: Option<String>,
    pub default_gdpr_scope: Option<String>,
}

impl PageParams {
    /// Reads the known parameters from a query string (leading `?` optional).
    ///
    /// Keys and values are percent-decoded and `+` reads as a space. The
    /// first occurrence of a key wins; undecodable pairs are dropped.
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();

        for pair in query.trim_start_matches('?').split('&') {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let (Some(key), Some(value)) = (decode_component(key), decode_component(value))
            else {
                debug!("dropping undecodable query pair {pair:?}");
                continue;
            };

            let slot = match key.as_str() {
                PARAM_ENDPOINT => &mut params.endpoint,
                PARAM_ARGS => &mut params.args,
                PARAM_MAX_SYNC_COUNT => &mut params.max_sync_count,
                PARAM_TIMEOUT => &mut params.timeout,
                PARAM_DEFAULT_GDPR_SCOPE => &mut params.default_gdpr_scope,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        params
    }

    /// Sanitizes the parameters into a [`SyncConfig`].
    pub fn into_config(self, registry: &EndpointRegistry) -> SyncConfig {
        SyncConfig {
            endpoint_url: registry.resolve(self.endpoint.as_deref()).to_string(),
            endpoint_args: sanitize_endpoint_args(self.args.as_deref()),
            max_sync_count: sanitize_sync_count(self.max_sync_count.as_deref()),
            timeout_ms: sanitize_timeout(self.timeout.as_deref()),
            default_consent_scope: sanitize_consent_scope(self.default_gdpr_scope.as_deref()),
        }
    }
}

fn decode_component(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " "))
        .ok()
        .map(|s| s.into_owned())
}
