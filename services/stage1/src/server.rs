//! HTTP server for the stage1 service.
//!
//! Provides endpoints for:
//! - `GET /status` - Last N heartbeat ticks and their sweep statistics
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics

use axum::{
    extract::Extension,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::driver::SweepStats;

/// One heartbeat tick's outcome, kept around for `/status`.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatRecord {
    pub at: DateTime<Utc>,
    pub ingested: u64,
    pub rejected: u64,
    pub cells_written: u64,
    pub range_skipped: u64,
    pub same_tilt_skipped: u64,
    pub masked_skipped: u64,
    pub messages_written: usize,
    pub emitted: bool,
}

/// Keeps the last `max_history` heartbeat ticks for `/status`, same
/// shape as the ingester's completed-ingestion ring buffer.
pub struct StatusTracker {
    history: Mutex<VecDeque<HeartbeatRecord>>,
    max_history: usize,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self {
            history: Mutex::new(VecDeque::new()),
            max_history: 100,
        }
    }

    pub async fn record(
        &self,
        ingested: u64,
        rejected: u64,
        stats: SweepStats,
        messages_written: usize,
        emitted: bool,
    ) {
        let record = HeartbeatRecord {
            at: Utc::now(),
            ingested,
            rejected,
            cells_written: stats.cells_written,
            range_skipped: stats.range_skipped,
            same_tilt_skipped: stats.same_tilt_skipped,
            masked_skipped: stats.masked_skipped,
            messages_written,
            emitted,
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
            radar_name: config.radar_name.clone(),
            moment: config.moment.clone(),
            resolver: config.resolver_key.clone(),
            terrain: config.terrain_key.clone(),
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
    pub radar_name: String,
    pub moment: String,
    pub resolver: String,
    pub terrain: Option<String>,
    pub recent: Vec<HeartbeatRecord>,
    pub total_ticks: usize,
}

/// Shared state for the HTTP server.
pub struct ServerState {
    pub config: Config,
    pub status: StatusTracker,
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
        service: "stage1".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn metrics_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    let status = state.status.get_status(&state.config).await;
    let last = status.recent.first();
    format!(
        "# HELP stage1_heartbeat_ticks_total Number of heartbeat ticks processed.\n\
         # TYPE stage1_heartbeat_ticks_total counter\n\
         stage1_heartbeat_ticks_total{{radar=\"{radar}\"}} {total}\n\
         # HELP stage1_last_cells_written Cells written on the most recent tick.\n\
         # TYPE stage1_last_cells_written gauge\n\
         stage1_last_cells_written{{radar=\"{radar}\"}} {cells}\n",
        radar = status.radar_name,
        total = status.total_ticks,
        cells = last.map(|r| r.cells_written).unwrap_or(0),
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
    info!(port = port, "Starting stage1 HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
