//! Sync-coordination endpoint request and response bodies.

use crate::config::EndpointArgs;
use crate::consent::ConsentData;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Overall status reported by the sync endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Ok,
    NoCookie,
    Error,
    /// Any status this agent does not know.
    #[serde(other)]
    Unknown,
}

impl SyncStatus {
    /// Whether the response may carry bidders to sync.
    #[must_use]
    pub const fn allows_sync(self) -> bool {
        matches!(self, Self::Ok | Self::NoCookie)
    }
}

/// How a bidder wants its sync performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    Image,
    Redirect,
    Iframe,
    #[default]
    #[serde(other)]
    Other,
}

impl SyncType {
    /// Wire name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Redirect => "redirect",
            Self::Iframe => "iframe",
            Self::Other => "other",
        }
    }
}

/// Sync target for a bidder.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserSync {
    #[serde(rename = "type", default)]
    pub sync_type: SyncType,
    #[serde(default)]
    pub url: Option<String>,
}

/// Per-bidder entry of the sync response.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BidderStatus {
    #[serde(default)]
    pub bidder: String,
    /// `true` when the bidder has no cookie yet, i.e. it is eligible for a sync.
    #[serde(default)]
    pub no_cookie: bool,
    #[serde(default)]
    pub usersync: Option<UserSync>,
}

impl BidderStatus {
    /// The declared sync type, `Other` when no sync target was sent.
    #[must_use]
    pub fn sync_type(&self) -> SyncType {
        self.usersync
            .as_ref()
            .map(|u| u.sync_type)
            .unwrap_or_default()
    }

    /// The sync URL, if any.
    #[must_use]
    pub fn sync_url(&self) -> Option<&str> {
        self.usersync.as_ref().and_then(|u| u.url.as_deref())
    }
}

/// Body returned by the sync endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncResponse {
    pub status: SyncStatus,
    #[serde(default)]
    pub bidder_status: Option<Vec<BidderStatus>>,
}

impl SyncResponse {
    /// Consumes the response, yielding the bidders to sync.
    ///
    /// `None` unless the status allows syncing and a bidder list is present.
    #[must_use]
    pub fn into_syncable_bidders(self) -> Option<Vec<BidderStatus>> {
        if self.status.allows_sync() {
            self.bidder_status
        } else {
            None
        }
    }
}

/// Body sent to the sync endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SyncRequestBody {
    pub args: EndpointArgs,
    pub limit: u64,
    pub gdpr: Option<u8>,
    pub gdpr_consent: Option<String>,
}

impl SyncRequestBody {
    /// Builds the body from the extra args, the sync limit and the consent
    /// state. `gdpr` is present only when consent is known, and
    /// `gdpr_consent` only when `gdpr` is 1.
    pub fn new(args: Option<&EndpointArgs>, limit: u64, consent: Option<&ConsentData>) -> Self {
        let gdpr = consent.map(ConsentData::gdpr_flag);
        let gdpr_consent = consent
            .filter(|c| c.consent_applies)
            .map(|c| c.consent_string.clone());

        Self {
            args: args.cloned().unwrap_or_default(),
            limit,
            gdpr,
            gdpr_consent,
        }
    }

    /// Serializes to a JSON object. Fixed keys override same-named args.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let mut body: Map<String, Value> = self
            .args
            .iter()
            .map(|(k, v)| (k.clone(), Value::from(v.clone())))
            .collect();

        body.insert("limit".into(), Value::from(self.limit));
        if let Some(gdpr) = self.gdpr {
            body.insert("gdpr".into(), Value::from(gdpr));
        }
        if let Some(consent) = &self.gdpr_consent {
            body.insert("gdpr_consent".into(), Value::String(consent.clone()));
        }

        Value::Object(body)
    }
}
