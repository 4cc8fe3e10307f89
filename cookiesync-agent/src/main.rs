//! Cookie sync agent
//!
//! Runs one page load of the consent-gated cookie sync from the command line:
//! 1. Posts the consent request to stdout
//! 2. Reads window messages (JSON, one per line) from stdin
//! 3. Fires the sync request and loads each bidder's sync URL over HTTP
//!
//! Usage:
//!   cookiesync-agent --query '?endpoint=rubicon&max_sync_count=5&defaultGdprScope=0'
//!
//! Logs go to stderr. The exit status does not reflect the sync outcome.

use std::sync::Arc;
use anyhow::{Context, Result};
use clap::Parser;
use cookiesync_agent::{build_registry, forward_lines, parse_endpoint, StdoutParentFrame};
use cookiesync_engine::{HttpHostConfig, HttpSyncHost, PageParams, SyncAgent, SyncRequestor};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "cookiesync-agent")]
#[command(about = "Consent-gated cookie sync agent")]
struct Args {
    /// Page query string (`endpoint`, `args`, `max_sync_count`, `timeout`, `defaultGdprScope`)
    #[arg(short, long, default_value = "")]
    query: String,

    /// Add or replace an allowed sync endpoint (name=url); repeatable
    #[arg(long = "endpoint", value_parser = parse_endpoint)]
    endpoints: Vec<(String, String)>,

    /// Timeout for each bidder sync load, in seconds
    #[arg(long, default_value = "30")]
    host_timeout_secs: u64,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let registry = build_registry(&args.endpoints);
    let config = PageParams::from_query(&args.query).into_config(&registry);

    let requestor = SyncRequestor::new().context("Failed to create sync requestor")?;
    let host = HttpSyncHost::new(&HttpHostConfig {
        request_timeout_secs: args.host_timeout_secs,
        ..Default::default()
    })
    .context("Failed to create sync host")?;
    let parent = StdoutParentFrame::new(tokio::io::stdout());

    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(forward_lines(BufReader::new(tokio::io::stdin()), tx));

    let agent = SyncAgent::new(config, requestor, Arc::new(parent), Arc::new(host));
    let report = agent.run(rx).await;

    match &report.dispatch {
        Some(dispatch) => info!(
            session = %report.session_id.short(),
            synced = dispatch.synced.len(),
            skipped = dispatch.skipped.len(),
            rejected = dispatch.rejected.len(),
            unsupported = dispatch.unsupported.len(),
            failed = dispatch.failed.len(),
            "Cookie sync finished"
        ),
        None => info!(
            session = %report.session_id.short(),
            outcome = ?report.outcome,
            "Cookie sync finished without bidders"
        ),
    }

    // A pending stdin read cannot be cancelled, so don't wait on runtime
    // shutdown for one.
    std::process::exit(0)
}
