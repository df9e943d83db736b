// ------------------------------------------------------------
// Module declarations
// ------------------------------------------------------------
//
// Each module represents a well-defined responsibility:
//
// - config:      CLI flags and environment fallbacks
// - schema:      Queue payloads, listing / receive envelopes
// - error:       Collector error taxonomy
// - util:        Shared helpers (URLs, bodies, durations)
// - providers:   Listing provider adapters and registry
// - destination: Destination push client
// - queue:       Collector queue client (pull + report)
// - collector:   Run execution (feeder, workers, coordinator)
// - poller:      Process-level poll loop
// - metrics:     Process-wide runtime counters
//
mod collector;
mod config;
mod destination;
mod error;
mod metrics;
mod poller;
mod providers;
mod queue;
mod schema;
mod util;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use log::{error, info};
use tokio::time::sleep;

use collector::Collector;
use config::{Cli, WorkerConfig};
use metrics::METRICS;
use poller::{poll_loop, PollSettings};
use queue::QueueClient;

/// Timeout applied to every queue / provider / destination request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ------------------------------------------------------------
// Application entry point
// ------------------------------------------------------------
//
// Responsibilities:
// - Parse flags / environment
// - Initialize logging
// - Start the metrics reporter
// - Run the poll loop and map its result to an exit code
//
// Exit codes:
// - 2: missing worker token
// - 1: queue pull failed in once-mode
// - 0: otherwise
//
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(cfg) = WorkerConfig::from_cli(Cli::parse()) else {
        error!("missing --token (COLLECTOR_WORKER_TOKEN)");
        std::process::exit(2);
    };

    info!(
        "Starting collector worker id={} api={} once={}",
        cfg.worker_id, cfg.api_base, cfg.once
    );

    // --------------------------------------------------------
    // Start metrics reporter (periodic, low-noise)
    // --------------------------------------------------------
    if let Some(every) = cfg.metrics_interval {
        tokio::spawn(async move {
            loop {
                sleep(every).await;
                info!("[METRICS] {}", METRICS.summary());
            }
        });
    }

    // One HTTP client (and connection pool) for queue, provider
    // and destination traffic.
    let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;

    let queue = Arc::new(QueueClient::new(http.clone(), &cfg.api_base, &cfg.token));
    let collector = Collector::new(http, queue.clone());

    let settings = PollSettings {
        worker_id: cfg.worker_id.clone(),
        once: cfg.once,
        poll_sleep: cfg.poll_sleep,
    };

    let exit = poll_loop(&settings, queue, &collector).await;
    info!("[METRICS] {}", METRICS.summary());

    if exit.code() != 0 {
        std::process::exit(exit.code());
    }
    Ok(())
}
