//! Consent gate.
//!
//! Waits for the parent frame's consent message or the timeout, whichever
//! comes first, and decides whether the sync request may fire.
//!
//! ```text
//!   WAITING ──(consent message)──────────────▶ FIRED
//!      │
//!      ├──(timeout, scope 0)─────────────────▶ FIRED   (no consent data)
//!      └──(timeout, scope 1)─────────────────▶ EXPIRED (never fires)
//! ```
//!
//! Firing is claimed through the session's sync-fired flag, so a late
//! message or a second timer expiry can never fire twice.

use crate::session::SyncSession;
use crate::transport::ParentFrame;
use cookiesync_types::{ConsentData, ConsentRequest, ConsentScope, ANY_ORIGIN};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// Waiting for consent data or the timeout.
    Waiting,
    /// The gate has closed after a consent message or a permitted timeout.
    Fired,
    /// The timeout elapsed while consent was assumed to apply.
    Expired,
}

/// What the caller must do after feeding the gate an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Invoke the sync requestor now.
    Fire,
    /// Do not fire, ever, for this page load.
    Hold,
    /// Nothing to do.
    Ignore,
}

/// How a gate run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// Consent data arrived before the timeout.
    FiredWithConsent(ConsentData),
    /// The timeout elapsed and scope 0 allowed proceeding without consent.
    FiredWithoutConsent,
    /// The timeout elapsed under scope 1; no sync for this page load.
    NoConsent,
    /// Another path had already fired the sync.
    AlreadyFired,
}

impl GateOutcome {
    /// Whether this run claimed the sync firing.
    pub fn fired(&self) -> bool {
        matches!(self, Self::FiredWithConsent(_) | Self::FiredWithoutConsent)
    }

    /// Consent data to send with the request, if any.
    pub fn consent(&self) -> Option<&ConsentData> {
        match self {
            Self::FiredWithConsent(consent) => Some(consent),
            _ => None,
        }
    }
}

/// The consent gate for one page load.
#[derive(Debug)]
pub struct ConsentGate {
    session: Arc<SyncSession>,
    state: GateState,
}

impl ConsentGate {
    /// Creates a gate in the `Waiting` state.
    pub fn new(session: Arc<SyncSession>) -> Self {
        Self {
            session,
            state: GateState::Waiting,
        }
    }

    /// Current state.
    pub fn state(&self) -> GateState {
        self.state
    }

    /// Handles an inbound parent-frame message.
    ///
    /// Only a `consent-data` payload received while waiting has an effect: it
    /// is stored as the session's consent and claims the sync firing.
    pub fn on_message(&mut self, payload: &Value) -> GateDecision {
        let Some(consent) = ConsentData::from_message(payload) else {
            debug!("ignoring non-consent message");
            return GateDecision::Ignore;
        };

        if self.state != GateState::Waiting {
            debug!(state = ?self.state, "ignoring consent message after gate closed");
            return GateDecision::Ignore;
        }

        info!(
            gdpr_applies = consent.consent_applies,
            "consent data received"
        );
        self.session.store_consent(consent);
        self.state = GateState::Fired;

        if self.session.try_mark_fired() {
            GateDecision::Fire
        } else {
            GateDecision::Ignore
        }
    }

    /// Handles expiry of the consent timer.
    pub fn on_timeout(&mut self) -> GateDecision {
        if self.state != GateState::Waiting {
            return GateDecision::Ignore;
        }

        if self.session.has_fired() {
            self.state = GateState::Fired;
            return GateDecision::Ignore;
        }

        match self.session.config().default_consent_scope {
            ConsentScope::NotApplicable => {
                self.state = GateState::Fired;
                if self.session.try_mark_fired() {
                    info!("no consent data before timeout, proceeding under default scope 0");
                    GateDecision::Fire
                } else {
                    GateDecision::Ignore
                }
            }
            ConsentScope::Applicable => {
                warn!(
                    timeout_ms = self.session.config().timeout_ms,
                    "no consent data received before timeout, not syncing"
                );
                self.state = GateState::Expired;
                GateDecision::Hold
            }
        }
    }

    /// Runs the gate: announces itself to the parent frame, then races the
    /// inbound messages against the consent timer.
    ///
    /// The timer is dropped as soon as a consent message closes the gate. A
    /// closed inbox leaves the gate waiting for the timer.
    pub async fn run(
        &mut self,
        parent: &dyn ParentFrame,
        inbox: &mut mpsc::Receiver<Value>,
    ) -> GateOutcome {
        if let Err(e) = parent
            .post_message(&ConsentRequest::default(), ANY_ORIGIN)
            .await
        {
            warn!("failed to request consent data from parent: {e}");
        }

        let timer = tokio::time::sleep(self.session.config().timeout());
        tokio::pin!(timer);
        let mut inbox_open = true;

        loop {
            tokio::select! {
                biased;

                message = inbox.recv(), if inbox_open => match message {
                    Some(payload) => {
                        match self.on_message(&payload) {
                            GateDecision::Fire => {
                                let consent = self.session.consent().cloned().unwrap_or_default();
                                return GateOutcome::FiredWithConsent(consent);
                            }
                            _ if self.state != GateState::Waiting => {
                                return GateOutcome::AlreadyFired;
                            }
                            _ => {}
                        }
                    }
                    None => {
                        debug!("consent channel closed, waiting for timeout");
                        inbox_open = false;
                    }
                },

                () = &mut timer => {
                    return match self.on_timeout() {
                        GateDecision::Fire => GateOutcome::FiredWithoutConsent,
                        GateDecision::Hold => GateOutcome::NoConsent,
                        GateDecision::Ignore => GateOutcome::AlreadyFired,
                    };
                }
            }
        }
    }
}
