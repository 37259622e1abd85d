//! HTTP server for the roster service.
//!
//! Provides endpoints for:
//! - `GET /status` - Last N sync ticks and their merge statistics
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

use axum::{extract::Extension, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::driver::TickStats;

/// One sync tick's outcome, kept around for `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub at: DateTime<Utc>,
    pub sources_seen: u64,
    pub sources_stale_skipped: u64,
    pub sources_fingerprint_mismatch: u64,
    pub masks_written: u64,
    pub masks_deleted: u64,
}

/// Keeps the last `max_history` sync ticks for `/status`, same ring
/// buffer shape as stage1's heartbeat tracker.
pub struct StatusTracker {
    history: Mutex<VecDeque<TickRecord>>,
    max_history: usize,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(VecDeque::new()),
            max_history: 100,
        }
    }

    pub async fn record(&self, stats: TickStats) {
        let record = TickRecord {
            at: Utc::now(),
            sources_seen: stats.sources_seen,
            sources_stale_skipped: stats.sources_stale_skipped,
            sources_fingerprint_mismatch: stats.sources_fingerprint_mismatch,
            masks_written: stats.masks_written,
            masks_deleted: stats.masks_deleted,
        };

        let mut history = self.history.lock().await;
        history.push_front(record);
        while history.len() > self.max_history {
            history.pop_back();
        }
    }

    pub async fn get_status(&self, config: &Config) -> StatusResponse {
        let history = self.history.lock().await;
        StatusResponse {
            roster_dir: config.roster_dir.clone(),
            nearest: config.nearest,
            static_mode: config.static_mode,
            recent: history.iter().take(20).cloned().collect(),
            total_ticks: history.len(),
        }
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub roster_dir: String,
    pub nearest: usize,
    pub static_mode: bool,
    pub recent: Vec<TickRecord>,
    pub total_ticks: usize,
}

/// Shared state for the HTTP server.
pub struct ServerState {
    pub config: Config,
    pub status: Arc<StatusTracker>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

async fn status_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    Json(state.status.get_status(&state.config).await)
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "roster".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn metrics_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    let status = state.status.get_status(&state.config).await;
    let last = status.recent.first();
    format!(
        "# HELP roster_sync_ticks_total Number of sync ticks processed.\n\
         # TYPE roster_sync_ticks_total counter\n\
         roster_sync_ticks_total {total}\n\
         # HELP roster_last_masks_written Masks written on the most recent tick.\n\
         # TYPE roster_last_masks_written gauge\n\
         roster_last_masks_written {masks}\n",
        total = status.total_ticks,
        masks = last.map(|r| r.masks_written).unwrap_or(0),
    )
}

/// Build the HTTP router.
pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(Extension(state))
}

/// Start the HTTP server.
pub async fn start_server(state: Arc<ServerState>, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port = port, "Starting roster HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
