//! Native sync host.
//!
//! Performs pixel and frame loads as plain HTTP GETs with a shared cookie
//! store, the way a browser would fetch an image or navigate a hidden frame.

use crate::error::{SyncError, SyncResult};
use crate::transport::SyncHost;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Configuration for [`HttpSyncHost`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpHostConfig {
    /// Per-load timeout in seconds.
    pub request_timeout_secs: u64,
    /// User agent sent with every load.
    pub user_agent: String,
}

impl Default for HttpHostConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            user_agent: concat!("cookiesync-agent/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// A [`SyncHost`] backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpSyncHost {
    client: Client,
}

impl HttpSyncHost {
    /// Creates a host from its configuration.
    pub fn new(config: &HttpHostConfig) -> SyncResult<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| SyncError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Creates a host from an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    async fn load(&self, url: &Url, accept: &'static str) -> SyncResult<()> {
        let response = self
            .client
            .get(url.clone())
            .header(ACCEPT, accept)
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("load of {url} failed: {e}")))?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), "sync load finished");
        if status.is_success() {
            Ok(())
        } else {
            Err(SyncError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            })
        }
    }
}

#[async_trait]
impl SyncHost for HttpSyncHost {
    async fn fire_pixel(&self, url: &Url) -> SyncResult<()> {
        self.load(url, "image/avif,image/webp,image/*,*/*;q=0.8").await
    }

    async fn load_iframe(&self, url: &Url) -> SyncResult<()> {
        self.load(url, "text/html,application/xhtml+xml,*/*;q=0.8").await
    }
}
