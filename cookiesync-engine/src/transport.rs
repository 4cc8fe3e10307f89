//! Transport layer abstraction.
//!
//! The agent never touches the page directly. It talks to two host
//! capabilities: the parent frame (consent announcement) and the sync host
//! (pixel and frame loads). This module defines both traits plus the URL
//! validator that gates every sync attempt.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use cookiesync_types::ConsentRequest;
use reqwest::Url;
use std::net::IpAddr;

/// The frame that embeds the agent.
#[async_trait]
pub trait ParentFrame: Send + Sync {
    /// Posts a message to the parent, addressed to `target_origin`.
    async fn post_message(&self, message: &ConsentRequest, target_origin: &str) -> SyncResult<()>;
}

/// Performs per-bidder sync loads.
///
/// Both calls resolve once the load has finished, successfully or not; the
/// dispatcher starts the next bidder only after that.
#[async_trait]
pub trait SyncHost: Send + Sync {
    /// Issues an image load for `url` (`image` and `redirect` syncs).
    async fn fire_pixel(&self, url: &Url) -> SyncResult<()>;

    /// Loads `url` in a hidden, zero-size frame (`iframe` syncs).
    async fn load_iframe(&self, url: &Url) -> SyncResult<()>;
}

/// Validates a bidder sync URL.
///
/// Requires an `http`/`https` URL with a host, and rejects hosts in
/// loopback, private, link-local or otherwise reserved ranges along with
/// `localhost`, `*.local` and `*.internal` names.
pub fn validate_sync_url(raw: &str) -> SyncResult<Url> {
    let invalid = |reason: String| SyncError::InvalidUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(raw).map_err(|e| invalid(format!("malformed: {e}")))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("scheme '{}' not allowed", parsed.scheme())));
    }

    let host = match parsed.host_str() {
        Some(h) if !h.is_empty() => h,
        _ => return Err(invalid("missing host".into())),
    };

    let bare_host = host
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(host);
    if let Ok(ip) = bare_host.parse::<IpAddr>() {
        if is_private_ip(ip) {
            return Err(invalid(format!("private or reserved address {ip}")));
        }
    }

    let lower = host.to_ascii_lowercase();
    if lower == "localhost"
        || lower.ends_with(".localhost")
        || lower.ends_with(".local")
        || lower.ends_with(".internal")
    {
        return Err(invalid(format!("reserved host name {host}")));
    }

    Ok(parsed)
}

/// Whether `ip` is loopback, private, link-local or otherwise not a public
/// unicast address.
pub fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, ..] = v4.octets();
            a == 0 // 0.0.0.0/8 "this network"
                || a >= 240 // 240.0.0.0/4 reserved, includes broadcast
                || v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_multicast()
                || (a == 100 && (64..=127).contains(&b)) // 100.64.0.0/10 carrier-grade NAT
                || (a == 198 && (b == 18 || b == 19)) // 198.18.0.0/15 benchmarking
        }
        IpAddr::V6(v6) => {
            if let Some(mapped_v4) = v6.to_ipv4_mapped() {
                return is_private_ip(IpAddr::V4(mapped_v4));
            }
            // IPv4-compatible (::a.b.c.d); ::1 and :: are handled below.
            let compatible = v6.segments()[..6].iter().all(|&s| s == 0);
            if compatible && !v6.is_loopback() && !v6.is_unspecified() {
                if let Some(compat_v4) = v6.to_ipv4() {
                    return is_private_ip(IpAddr::V4(compat_v4));
                }
            }
            let seg0 = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || v6.is_multicast()
                || (seg0 & 0xFE00) == 0xFC00 // fc00::/7 unique local
                || (seg0 & 0xFFC0) == 0xFE80 // fe80::/10 link-local
                || (seg0 & 0xFFC0) == 0xFEC0 // fec0::/10 site-local
        }
    }
}

/// Recording hosts for testing.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// A load performed through a [`RecordingHost`].
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum HostCall {
        Pixel(String),
        Iframe(String),
    }

    /// A sync host that records every load instead of performing it.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingHost {
        calls: Arc<Mutex<Vec<HostCall>>>,
        in_flight: Arc<AtomicUsize>,
        max_in_flight: Arc<AtomicUsize>,
        delay: Option<Duration>,
        fail: bool,
    }

    impl RecordingHost {
        /// Creates a host whose loads complete immediately.
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every load take `delay` before completing.
        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        /// Makes every load complete with a transport error.
        pub fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        /// All loads so far, in call order.
        pub fn calls(&self) -> Vec<HostCall> {
            self.calls.lock().unwrap().clone()
        }

        /// The largest number of loads that were outstanding at once.
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }

        async fn record(&self, call: HostCall) -> SyncResult<()> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.calls.lock().unwrap().push(call);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail {
                Err(SyncError::Transport("mock load failed".into()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl SyncHost for RecordingHost {
        async fn fire_pixel(&self, url: &Url) -> SyncResult<()> {
            self.record(HostCall::Pixel(url.to_string())).await
        }

        async fn load_iframe(&self, url: &Url) -> SyncResult<()> {
            self.record(HostCall::Iframe(url.to_string())).await
        }
    }

    /// A parent frame that records posted messages.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingParent {
        posted: Arc<Mutex<Vec<(ConsentRequest, String)>>>,
        fail: bool,
    }

    impl RecordingParent {
        /// Creates a parent that accepts every message.
        pub fn new() -> Self {
            Self::default()
        }

        /// Makes every post fail.
        pub fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        /// Messages posted so far with their target origins.
        pub fn posted(&self) -> Vec<(ConsentRequest, String)> {
            self.posted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ParentFrame for RecordingParent {
        async fn post_message(
            &self,
            message: &ConsentRequest,
            target_origin: &str,
        ) -> SyncResult<()> {
            if self.fail {
                return Err(SyncError::ChannelClosed);
            }
            self.posted
                .lock()
                .unwrap()
                .push((message.clone(), target_origin.to_string()));
            Ok(())
        }
    }
}
