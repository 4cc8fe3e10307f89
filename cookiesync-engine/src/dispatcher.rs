//! Bidder dispatcher.
//!
//! Drains the bidder list one bidder at a time, triggering the sync
//! mechanism each eligible bidder asked for. The next bidder starts only
//! after the current load completes, so at most one sync is outstanding.

use crate::transport::{validate_sync_url, SyncHost};
use cookiesync_types::{BidderStatus, SyncType};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What happened to each bidder in a dispatch run. Names are listed in
/// processing order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Bidders whose load completed successfully.
    pub synced: Vec<String>,
    /// Bidders that already had a cookie.
    pub skipped: Vec<String>,
    /// Eligible bidders with a missing or invalid sync URL.
    pub rejected: Vec<String>,
    /// Eligible bidders with a sync type we cannot perform.
    pub unsupported: Vec<String>,
    /// Bidders whose load completed with an error.
    pub failed: Vec<String>,
}

impl DispatchReport {
    /// Number of loads handed to the host.
    pub fn attempted(&self) -> usize {
        self.synced.len() + self.failed.len()
    }

    /// Number of bidders processed.
    pub fn total(&self) -> usize {
        self.attempted() + self.skipped.len() + self.rejected.len() + self.unsupported.len()
    }
}

/// Dispatches bidder syncs through a [`SyncHost`].
#[derive(Clone)]
pub struct BidderDispatcher {
    host: Arc<dyn SyncHost>,
}

impl BidderDispatcher {
    /// Creates a dispatcher.
    pub fn new(host: Arc<dyn SyncHost>) -> Self {
        Self { host }
    }

    /// Processes every bidder exactly once, taking them from the tail of
    /// the list.
    pub async fn dispatch(&self, mut bidders: Vec<BidderStatus>) -> DispatchReport {
        let mut report = DispatchReport::default();

        while let Some(bidder) = bidders.pop() {
            if !bidder.no_cookie {
                debug!(bidder = %bidder.bidder, "bidder already has a cookie");
                report.skipped.push(bidder.bidder);
                continue;
            }
            self.sync_bidder(bidder, &mut report).await;
        }

        info!(
            synced = report.synced.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            rejected = report.rejected.len(),
            unsupported = report.unsupported.len(),
            "bidder dispatch finished"
        );
        report
    }

    async fn sync_bidder(&self, bidder: BidderStatus, report: &mut DispatchReport) {
        let Some(raw_url) = bidder.sync_url() else {
            warn!(bidder = %bidder.bidder, "no sync url");
            report.rejected.push(bidder.bidder);
            return;
        };

        let url = match validate_sync_url(raw_url) {
            Ok(url) => url,
            Err(e) => {
                warn!(bidder = %bidder.bidder, "{e}");
                report.rejected.push(bidder.bidder);
                return;
            }
        };

        let sync_type = bidder.sync_type();
        let result = match sync_type {
            SyncType::Image | SyncType::Redirect => self.host.fire_pixel(&url).await,
            SyncType::Iframe => self.host.load_iframe(&url).await,
            SyncType::Other => {
                warn!(bidder = %bidder.bidder, "unsupported sync type");
                report.unsupported.push(bidder.bidder);
                return;
            }
        };

        match result {
            Ok(()) => {
                debug!(bidder = %bidder.bidder, sync_type = sync_type.as_str(), "sync load complete");
                report.synced.push(bidder.bidder);
            }
            Err(e) => {
                debug!(bidder = %bidder.bidder, "sync load failed: {e}");
                report.failed.push(bidder.bidder);
            }
        }
    }
}
