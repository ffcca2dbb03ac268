//! mottag-sim binary
//!
//! Simulates a tag moving among four antennas, estimates its position with
//! center4 and streams the readings to the configured sinks until Ctrl+C or
//! the tick limit.
//!
//! # Usage
//!
//! ```bash
//! mottag-sim --ant 0,0 --ant 10,0 --ant 10,10 --ant 0,10 --seed 7
//! mottag-sim -c mottag.yaml --mode mqtt --tag-addr 7c:ec:79:47:89:bb
//! ```

mod args;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info, warn};

use mottag_common::{init_logging, SimConfig};
use mottag_sim::{RunSummary, SimRng, TickDriver};
use mottag_sink::{SinkSet, TrailHandle, DEFAULT_SHUTDOWN_GRACE};

use crate::args::{Args, RunOptions};

/// Application state for one simulation run
struct SimApp {
    driver: TickDriver,
    sinks: SinkSet,
    trail: Option<TrailHandle>,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl SimApp {
    /// Builds the driver and spawns the sinks
    fn new(config: &SimConfig) -> Result<Self> {
        let rng = SimRng::from_optional_seed(config.seed);
        info!(
            "Seed {} ({})",
            rng.seed(),
            if config.seed.is_some() { "configured" } else { "from entropy" }
        );

        let driver = TickDriver::new(config, rng).context("Failed to build simulator")?;
        info!(
            "Antennas: {:?}, bounds {:?}",
            config.antennas,
            driver.bounds()
        );

        let (sinks, trail) = SinkSet::from_config(config).context("Failed to start sinks")?;
        let (shutdown_tx, _) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);

        Ok(Self {
            driver,
            sinks,
            trail,
            shutdown_tx,
        })
    }

    /// Runs the tick loop until Ctrl+C or the tick limit
    async fn run(&mut self) -> Result<RunSummary> {
        let shutdown_rx = self.shutdown_tx.subscribe();
        let tx = self.shutdown_tx.clone();
        let ctrl_c = tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("Received Ctrl+C, stopping after the current tick...");
                    tx.send_replace(true);
                }
                Err(e) => warn!("Cannot listen for Ctrl+C: {}", e),
            }
        });

        let result = self.driver.run(&mut self.sinks, shutdown_rx).await;
        ctrl_c.abort();
        result.context("Simulation stopped with an error")
    }

    /// Drains and stops the sinks
    async fn shutdown(self) {
        info!("Initiating graceful shutdown...");
        let exits = self.sinks.shutdown(DEFAULT_SHUTDOWN_GRACE).await;
        let unclean = exits.iter().filter(|e| !e.is_clean()).count();
        if unclean > 0 {
            warn!("{} sink(s) did not stop cleanly", unclean);
        }

        if let Some(trail) = self.trail {
            let snapshot = trail.snapshot();
            if let Some(err) = snapshot.mean_error() {
                info!(
                    "Trail: {} points, mean position error {:.2}",
                    snapshot.len(),
                    err
                );
            }
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.log_level);

    match run_sim(args).await {
        Ok(summary) => {
            info!(
                "mottag-sim exited: {} ticks, {} sink drops{}",
                summary.ticks,
                summary.sink_drops,
                if summary.cancelled { " (interrupted)" } else { "" }
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("mottag-sim failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_sim(args: Args) -> Result<RunSummary> {
    let options = RunOptions::try_from(args)?;
    let mut app = SimApp::new(&options.config)?;
    let summary = app.run().await;
    app.shutdown().await;
    summary
}
