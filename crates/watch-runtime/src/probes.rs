//! Liveness and metrics endpoints.

use crate::metrics::gather_metrics;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use std::net::SocketAddr;
use tracing::info;

async fn healthz() -> &'static str {
    "ok"
}

async fn metrics() -> Result<String, (StatusCode, String)> {
    gather_metrics().map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}

/// Routes served by the probe server.
pub fn probe_router() -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
}

/// Serves `/healthz` and `/metrics` on `addr` until the process exits.
pub async fn serve_probes(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Probe server listening on {}", addr);
    axum::serve(listener, probe_router()).await
}
