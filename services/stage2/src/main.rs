//! Stage 2: the sparse point-cloud merge engine for one grid partition.
//!
//! Watches the `.s2` messages stage1 drops for this process's moment and
//! partition, reconciles them into a `MergeDatabase` with the
//! union-merge rule, and periodically finalizes a weighted-average
//! output layer per z-level for downstream consumption (TileJoin when
//! tiled, or a renderer directly when untiled).
//!
//! # Usage
//!
//! ```bash
//! stage2 --grid "nw(55,-130) se(20,-60) s(0.01,0.01)" \
//!     --roster /data/roster --moment Reflectivity --sync "0 * * * * *"
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
use driver::Stage2Driver;
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

    info!("Starting stage2");

    let config = args.resolve()?;
    let driver = Stage2Driver::new(config.clone());

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
            tracing::error!(error = %e, "stage2 HTTP server exited");
        }
    });

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
