//! Sync agent: runs one page load end to end.
//!
//! Consent gate → sync requestor → bidder dispatcher, all over a single
//! [`SyncSession`].

use crate::consent::{ConsentGate, GateOutcome};
use crate::dispatcher::{BidderDispatcher, DispatchReport};
use crate::requestor::SyncRequestor;
use crate::session::SyncSession;
use crate::transport::{ParentFrame, SyncHost};
use cookiesync_types::{SessionId, SyncConfig};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, info_span, Instrument};

/// Summary of one page load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentReport {
    pub session_id: SessionId,
    pub outcome: GateOutcome,
    /// Present when the sync response listed bidders to dispatch.
    pub dispatch: Option<DispatchReport>,
}

/// The page-load agent.
pub struct SyncAgent {
    session: Arc<SyncSession>,
    requestor: SyncRequestor,
    parent: Arc<dyn ParentFrame>,
    dispatcher: BidderDispatcher,
}

impl SyncAgent {
    /// Creates an agent for a fresh session.
    pub fn new(
        config: SyncConfig,
        requestor: SyncRequestor,
        parent: Arc<dyn ParentFrame>,
        host: Arc<dyn SyncHost>,
    ) -> Self {
        Self {
            session: Arc::new(SyncSession::new(config)),
            requestor,
            parent,
            dispatcher: BidderDispatcher::new(host),
        }
    }

    /// The session this agent runs.
    pub fn session(&self) -> &Arc<SyncSession> {
        &self.session
    }

    /// Runs the page load: waits for consent (or the timeout), fires the sync
    /// request at most once, and dispatches the returned bidders.
    ///
    /// Never fails; every error path ends in "no sync occurred".
    pub async fn run(&self, mut inbox: mpsc::Receiver<Value>) -> AgentReport {
        let span = info_span!("sync_session", session = %self.session.id().short());

        async move {
            let config = self.session.config();
            info!(
                endpoint = %config.endpoint_url,
                timeout_ms = config.timeout_ms,
                max_sync_count = config.max_sync_count,
                "starting cookie sync"
            );

            let mut gate = ConsentGate::new(self.session.clone());
            let outcome = gate.run(self.parent.as_ref(), &mut inbox).await;

            let dispatch = if outcome.fired() {
                match self.requestor.request(config, outcome.consent()).await {
                    Some(bidders) => Some(self.dispatcher.dispatch(bidders).await),
                    None => None,
                }
            } else {
                info!(?outcome, "sync not fired");
                None
            };

            AgentReport {
                session_id: self.session.id(),
                outcome,
                dispatch,
            }
        }
        .instrument(span)
        .await
    }
}
