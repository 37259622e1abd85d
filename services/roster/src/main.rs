//! Roster: nearest-N coverage mask coordinator.
//!
//! Periodically scans every radar's `.cache` file under the configured
//! grid directory, runs the nearest-N insertion-sort merge, and writes
//! back each radar's `.mask` file so Stage 1 can gate its Stage 2 output
//! on whether a cell belongs to one of that radar's nearest contributors.
//!
//! # Usage
//!
//! ```bash
//! roster --grid "nw(55,-130) se(20,-60) s(0.01,0.01)" \
//!     --roster /data/roster --nearest 3 --sync "0 * * * * *"
//! ```

mod config;
mod driver;
mod scheduler;
mod server;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use config::Args;
use driver::RosterDriver;
use scheduler::Scheduler;
use server::{start_server, ServerState, StatusTracker};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(true)
        .json()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting roster");

    let config = args.resolve()?;
    let driver = RosterDriver::new(config.clone())?;

    let status = Arc::new(StatusTracker::new());
    let scheduler = Scheduler::new(driver, &config.sync_expr, status.clone())?;

    let state = Arc::new(ServerState {
        config: config.clone(),
        status: status.clone(),
    });

    let server_state = state.clone();
    let port = args.port;
    tokio::spawn(async move {
        if let Err(e) = start_server(server_state, port).await {
            tracing::error!(error = %e, "roster HTTP server exited");
        }
    });

    // Run an immediate tick at startup so a fresh roster directory is
    // never left without masks until the first cron fire, then hand off
    // to the cron-driven loop.
    scheduler.run_once().await;

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let shutdown_tx_clone = shutdown_tx.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("received ctrl-c, shutting down");
        shutdown_tx_clone.send(()).ok();
    });

    scheduler.run_forever(shutdown_tx.subscribe()).await;

    Ok(())
}
