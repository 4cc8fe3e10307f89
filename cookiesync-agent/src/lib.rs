//! Stdio plumbing for the cookie sync agent binary.
//!
//! The binary stands in for the embedding page: inbound window messages
//! arrive as JSON lines on stdin, and messages posted to the parent frame
//! leave as JSON lines on stdout.

use async_trait::async_trait;
use cookiesync_engine::{EndpointRegistry, ParentFrame, SyncError, SyncResult};
use cookiesync_types::{ConsentRequest, DEFAULT_ENDPOINT_NAME};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

/// One message posted to the parent frame, as written to stdout.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    pub target_origin: String,
    pub message: ConsentRequest,
}

/// A parent frame reached through a line-oriented writer.
pub struct StdoutParentFrame<W> {
    writer: Mutex<W>,
}

impl<W> StdoutParentFrame<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait]
impl<W> ParentFrame for StdoutParentFrame<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn post_message(&self, message: &ConsentRequest, target_origin: &str) -> SyncResult<()> {
        let outbound = OutboundMessage {
            target_origin: target_origin.to_string(),
            message: message.clone(),
        };
        let mut line = serde_json::to_vec(&outbound)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&line)
            .await
            .map_err(|e| SyncError::Transport(format!("failed to post message: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| SyncError::Transport(format!("failed to post message: {e}")))
    }
}

/// Forwards JSON lines from `reader` into the agent's inbox.
///
/// Blank and non-JSON lines are skipped. Stops at end of input or once the
/// inbox is gone, and returns how many messages were delivered.
pub async fn forward_lines<R>(reader: R, inbox: mpsc::Sender<Value>) -> usize
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut delivered = 0;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                debug!("stopped reading messages: {e}");
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line) {
            Ok(payload) => {
                if inbox.send(payload).await.is_err() {
                    break;
                }
                delivered += 1;
            }
            Err(e) => debug!("skipping non-JSON message: {e}"),
        }
    }

    delivered
}

/// Parses a `name=url` endpoint override.
pub fn parse_endpoint(raw: &str) -> Result<(String, String), String> {
    let (name, url) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=url, got '{raw}'"))?;
    let (name, url) = (name.trim(), url.trim());
    if name.is_empty() || url.is_empty() {
        return Err(format!("expected name=url, got '{raw}'"));
    }
    Ok((name.to_string(), url.to_string()))
}

/// The built-in endpoints plus any overrides.
///
/// An override named like a built-in replaces it; overriding the default
/// endpoint also moves the fallback used for unknown names.
pub fn build_registry(overrides: &[(String, String)]) -> EndpointRegistry {
    overrides
        .iter()
        .fold(EndpointRegistry::default(), |registry, (name, url)| {
            let registry = registry.with_endpoint(name.clone(), url.clone());
            if name == DEFAULT_ENDPOINT_NAME {
                registry.with_default_url(url.clone())
            } else {
                registry
            }
        })
}
