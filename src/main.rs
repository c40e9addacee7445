//! Echo Monitor - headless dashboard host.
//!
//! `echo-monitor` follows the monitor list and logs status changes.
//! `echo-monitor probe <url>` checks whether a URL responds.

use echo_monitor::api::HttpBackend;
use echo_monitor::clock::SystemClock;
use echo_monitor::config::DashboardConfig;
use echo_monitor::dashboard::Dashboard;
use echo_monitor::probe::{HttpUrlProbe, Reachability, ReachabilityProbe, PLACEHOLDER_URL, PROBE_TIMEOUT};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("echo_monitor=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let [cmd, url] = args.as_slice() {
        if cmd == "probe" {
            return probe(url).await;
        }
    }

    let cfg = DashboardConfig::load();
    tracing::info!("Starting Echo Monitor against {}", cfg.api_url);

    let api = Arc::new(HttpBackend::from_config(&cfg)?);
    let dashboard = Dashboard::new(api, Arc::new(SystemClock), &cfg);

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down");
        }
        shutdown.cancel();
    });

    dashboard.run(cancel).await;
    Ok(())
}

async fn probe(url: &str) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let probe = ReachabilityProbe::new(Arc::new(HttpUrlProbe::new(PROBE_TIMEOUT)?));
    let mut rx = probe.subscribe();
    probe.on_input(url);

    loop {
        match &*rx.borrow_and_update() {
            Reachability::Idle if url.trim().is_empty() || url.trim() == PLACEHOLDER_URL => {
                println!("{}: nothing to probe", url);
                return Ok(());
            }
            Reachability::Idle | Reachability::Pending => {}
            Reachability::Reachable => {
                println!("{}: reachable", url);
                return Ok(());
            }
            Reachability::Unreachable(reason) => {
                println!("{}: unreachable ({})", url, reason);
                return Ok(());
            }
        }
        rx.changed().await?;
    }
}
