//! Cron-driven tick loop, same shape as stage2's scheduler: fire a full
//! ingest/expire tick on the configured schedule.

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use cron::Schedule;
use fusion_common::time::to_epoch_seconds;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::driver::TileJoinDriver;
use crate::server::StatusTracker;

pub struct Scheduler {
    driver: Mutex<TileJoinDriver>,
    schedule: Schedule,
    status: Arc<StatusTracker>,
}

impl Scheduler {
    pub fn new(driver: TileJoinDriver, sync_expr: &str, status: Arc<StatusTracker>) -> Result<Self> {
        let schedule = Schedule::from_str(sync_expr)
            .with_context(|| format!("invalid --sync cron expression '{sync_expr}'"))?;
        Ok(Self {
            driver: Mutex::new(driver),
            schedule,
            status,
        })
    }

    /// Run one tick immediately at startup.
    pub async fn run_once(&self) {
        let now = to_epoch_seconds(Utc::now());
        let mut driver = self.driver.lock().await;
        match driver.tick(now) {
            Ok(stats) => self.status.record(stats).await,
            Err(e) => error!(error = %e, "startup tilejoin tick failed"),
        }
    }

    /// Run forever on the cron schedule until `shutdown` resolves.
    pub async fn run_forever(&self, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
        let mut upcoming = self.schedule.upcoming(Utc);

        loop {
            let next = match upcoming.next() {
                Some(t) => t,
                None => {
                    error!("cron schedule produced no further fire times");
                    return;
                }
            };

            let wait = (next - Utc::now())
                .to_std()
                .unwrap_or(std::time::Duration::from_secs(0));

            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    let now = to_epoch_seconds(Utc::now());
                    let mut driver = self.driver.lock().await;
                    match driver.tick(now) {
                        Ok(stats) => self.status.record(stats).await,
                        Err(e) => error!(error = %e, "tilejoin tick failed"),
                    }
                }
                _ = shutdown.recv() => {
                    info!("shutting down tilejoin scheduler");
                    return;
                }
            }
        }
    }
}
