//! Consent messages exchanged with the parent frame.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `type` of the inbound message that carries consent data.
pub const CONSENT_DATA_TYPE: &str = "consent-data";

/// `type` of the outbound message asking the parent for consent data.
pub const SEND_CONSENT_DATA_TYPE: &str = "send-consent-data";

/// Sentinel the parent frame uses to recognise our messages.
pub const AMP_SENTINEL: &str = "amp";

/// Target origin for the outbound announcement (any ancestor).
pub const ANY_ORIGIN: &str = "*";

/// Consent data adopted from the parent frame.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConsentData {
    /// Whether the regulation applies to this user.
    pub consent_applies: bool,
    /// Encoded consent string; empty when the parent sent none.
    pub consent_string: String,
}

impl ConsentData {
    /// Creates consent data.
    pub fn new(consent_applies: bool, consent_string: impl Into<String>) -> Self {
        Self {
            consent_applies,
            consent_string: consent_string.into(),
        }
    }

    /// Extracts consent data from a raw inbound payload.
    ///
    /// Returns `None` unless the payload's `type` is `consent-data`. Missing
    /// `consentMetadata.gdprApplies` reads as `false`, a missing
    /// `consentString` as empty.
    pub fn from_message(payload: &Value) -> Option<Self> {
        if payload.get("type").and_then(Value::as_str) != Some(CONSENT_DATA_TYPE) {
            return None;
        }

        let consent_applies = payload
            .get("consentMetadata")
            .and_then(|m| m.get("gdprApplies"))
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let consent_string = payload
            .get("consentString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Some(Self {
            consent_applies,
            consent_string,
        })
    }

    /// The `gdpr` request flag.
    #[must_use]
    pub const fn gdpr_flag(&self) -> u8 {
        if self.consent_applies { 1 } else { 0 }
    }
}

/// Outbound request for consent data, posted to the parent frame at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRequest {
    pub sentinel: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Default for ConsentRequest {
    fn default() -> Self {
        Self {
            sentinel: AMP_SENTINEL.to_string(),
            kind: SEND_CONSENT_DATA_TYPE.to_string(),
        }
    }
}
