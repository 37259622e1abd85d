//! HTTP server for the tilejoin service.
//!
//! Provides endpoints for:
//! - `GET /status` - last N ticks' ingest/expire statistics
//! - `GET /health` - health check
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

#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub at: DateTime<Utc>,
    pub tiles_ingested: u64,
    pub tiles_skipped: u64,
    pub composites_written: u64,
    pub composites_flushed: u64,
    pub pending_keys: usize,
}

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
            tiles_ingested: stats.tiles_ingested,
            tiles_skipped: stats.tiles_skipped,
            composites_written: stats.composites_written,
            composites_flushed: stats.composites_flushed,
            pending_keys: stats.pending_keys,
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
            moment: config.moment.clone(),
            num_partitions: config.partitions.num_partitions(),
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
    pub moment: String,
    pub num_partitions: usize,
    pub recent: Vec<TickRecord>,
    pub total_ticks: usize,
}

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
        service: "tilejoin".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn metrics_handler(Extension(state): Extension<Arc<ServerState>>) -> impl IntoResponse {
    let status = state.status.get_status(&state.config).await;
    let last = status.recent.first();
    format!(
        "# HELP tilejoin_ticks_total Number of join ticks processed.\n\
         # TYPE tilejoin_ticks_total counter\n\
         tilejoin_ticks_total {total}\n\
         # HELP tilejoin_last_composites_written Composites written on the most recent tick.\n\
         # TYPE tilejoin_last_composites_written gauge\n\
         tilejoin_last_composites_written {written}\n\
         # HELP tilejoin_pending_keys Buffered keys awaiting more partitions.\n\
         # TYPE tilejoin_pending_keys gauge\n\
         tilejoin_pending_keys {pending}\n",
        total = status.total_ticks,
        written = last.map(|r| r.composites_written).unwrap_or(0),
        pending = last.map(|r| r.pending_keys).unwrap_or(0),
    )
}

pub fn build_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .layer(Extension(state))
}

pub async fn start_server(state: Arc<ServerState>, port: u16) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port = port, "Starting tilejoin HTTP server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
