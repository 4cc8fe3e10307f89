//! Sync requestor.
//!
//! Sends the single, credentialed request to the sync-coordination endpoint
//! and extracts the bidders to sync from its answer. Best effort: every
//! failure is logged and ends in "nothing to sync".

use crate::error::{SyncError, SyncResult};
use cookiesync_types::{BidderStatus, ConsentData, SyncConfig, SyncRequestBody, SyncResponse};
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

/// Issues the sync request for one page load.
#[derive(Debug, Clone)]
pub struct SyncRequestor {
    client: Client,
}

impl SyncRequestor {
    /// Creates a requestor whose client keeps a cookie store, so the request
    /// carries and receives credentials.
    pub fn new() -> SyncResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .build()
            .map_err(|e| SyncError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Creates a requestor from an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Builds the request body: the extra args, `limit`, and the consent
    /// flags when consent is known.
    pub fn build_body(config: &SyncConfig, consent: Option<&ConsentData>) -> SyncRequestBody {
        SyncRequestBody::new(
            config.endpoint_args.as_ref(),
            config.max_sync_count,
            consent,
        )
    }

    /// Sends the request and parses the response, surfacing any failure.
    ///
    /// Statuses other than 2xx and 304 are errors; so is a body that is not a
    /// sync response ([`SyncError::Protocol`]).
    pub async fn try_request(
        &self,
        config: &SyncConfig,
        consent: Option<&ConsentData>,
    ) -> SyncResult<SyncResponse> {
        let body = Self::build_body(config, consent).to_json();
        debug!(endpoint = %config.endpoint_url, %body, "sending sync request");

        let response = self
            .client
            .post(&config.endpoint_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("sync request failed: {e}")))?;

        let status = response.status();
        if !(status.is_success() || status == StatusCode::NOT_MODIFIED) {
            return Err(SyncError::HttpStatus {
                status: status.as_u16(),
                url: config.endpoint_url.clone(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| SyncError::Network(format!("failed to read sync response: {e}")))?;

        serde_json::from_str(&text)
            .map_err(|e| SyncError::Protocol(format!("malformed sync response: {e}")))
    }

    /// Sends the request and returns the bidders to sync.
    ///
    /// `None` on any failure, on a status other than `ok`/`no_cookie`, or
    /// when the response lists no bidders.
    pub async fn request(
        &self,
        config: &SyncConfig,
        consent: Option<&ConsentData>,
    ) -> Option<Vec<BidderStatus>> {
        match self.try_request(config, consent).await {
            Ok(response) => {
                let status = response.status;
                match response.into_syncable_bidders() {
                    Some(bidders) => {
                        info!(?status, bidders = bidders.len(), "sync response received");
                        Some(bidders)
                    }
                    None => {
                        debug!(?status, "sync response has nothing to sync");
                        None
                    }
                }
            }
            Err(SyncError::Protocol(msg)) => {
                debug!("ignoring sync response: {msg}");
                None
            }
            Err(e) => {
                warn!("sync request failed: {e}");
                None
            }
        }
    }
}
