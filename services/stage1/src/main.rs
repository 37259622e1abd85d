//! Stage 1: per-radar polar-to-Cartesian projection and resolver service.
//!
//! Watches a directory for incoming serialized radar tilts, projects
//! them onto this process's slice of the output grid on every
//! heartbeat, and emits masked sparse Stage-2 messages per partition.
//!
//! # Usage
//!
//! ```bash
//! stage1 --radar KTLX --lat 35.33 --lon -97.27 --height-m 417 \
//!     --grid "nw(55,-130) se(20,-60) s(0.01,0.01)" \
//!     --watch-dir /data/tilts/KTLX --roster /data/roster
//! ```

mod config;
mod dem;
mod driver;
mod server;
mod tilt_source;

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use fusion_common::time::to_epoch_seconds;
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::Args;
use driver::RadarDriver;
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

    info!(radar = %args.radar, "Starting stage1");

    let config = args.resolve()?;
    if config.presmooth {
        warn!("--presmooth was set but the smoother is not implemented; ignoring");
    }

    // A missing DEM here is fatal at startup per the terrain/DEM failure
    // policy: absent --terrain runs with no correction at all, but a
    // --terrain flag paired with an unreadable or malformed DEM aborts
    // rather than silently falling back.
    let mut driver = RadarDriver::new(config.clone())?;
    driver.write_range_cache()?;
    let stage2_dir = driver.stage2_output_dir();

    let state = Arc::new(ServerState {
        config: config.clone(),
        status: StatusTracker::new(),
    });

    let server_state = state.clone();
    let port = args.port;
    tokio::spawn(async move {
        if let Err(e) = start_server(server_state, port).await {
            tracing::error!(error = %e, "stage1 HTTP server exited");
        }
    });

    let mut interval = tokio::time::interval(Duration::from_secs(config.heartbeat_secs));
    let mut frame: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                driver.reload_mask();

                let now = Utc::now();
                let epoch_now = to_epoch_seconds(now);

                let (ingested, rejected) = driver.ingest_tilts(epoch_now);
                let (stats, messages) = driver.sweep(epoch_now);

                let emit = driver.should_emit(frame);
                let messages_written = if emit && !messages.is_empty() {
                    match driver.write_stage2_messages(&messages, &stage2_dir, epoch_now) {
                        Ok(n) => n,
                        Err(e) => {
                            tracing::error!(error = %e, "failed to write stage2 messages");
                            0
                        }
                    }
                } else {
                    0
                };

                state
                    .status
                    .record(ingested, rejected, stats, messages_written, emit)
                    .await;

                info!(
                    frame,
                    ingested,
                    rejected,
                    cells_written = stats.cells_written,
                    range_skipped = stats.range_skipped,
                    same_tilt_skipped = stats.same_tilt_skipped,
                    masked_skipped = stats.masked_skipped,
                    messages_written,
                    "heartbeat tick complete"
                );

                frame = frame.wrapping_add(1);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, shutting down");
                break;
            }
        }
    }

    Ok(())
}
