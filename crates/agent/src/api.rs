//! Probe and metrics endpoints of the snapshot agent
//!
//! Snapshots themselves are only written to stdout. This server exposes the
//! agent's own state: `/healthz` and `/readyz` for the kubelet probes, and
//! `/metrics` with the snapshot collectors from the global Prometheus
//! registry.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use snapshot_lib::HealthRegistry;
use std::net::SocketAddr;
use tracing::{info, warn};

/// 200 while healthy or degraded, 503 once a component is unhealthy
async fn healthz(State(health): State<HealthRegistry>) -> impl IntoResponse {
    let health = health.health().await;

    let status_code = if health.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health))
}

/// 200 after the first snapshot, 503 before it or after a failed cycle
async fn readyz(State(health): State<HealthRegistry>) -> impl IntoResponse {
    let readiness = health.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

async fn snapshot_metrics() -> Response {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    (
        StatusCode::OK,
        [("content-type", encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}

/// Probe router backed by the agent's health registry
pub fn probe_router(health: HealthRegistry) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(snapshot_metrics))
        .with_state(health)
}

/// Serve probes until the listener fails
pub async fn serve_probes(port: u16, health: HealthRegistry) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Probe server listening");

    axum::serve(listener, probe_router(health)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use snapshot_lib::{health::components, CollectOutcome, Snapshot};
    use tower::ServiceExt;

    async fn status_of(health: &HealthRegistry, uri: &str) -> StatusCode {
        probe_router(health.clone())
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_probes_follow_snapshot_cycles() {
        let health = HealthRegistry::new();
        health.register(components::CLUSTER_API).await;

        assert_eq!(status_of(&health, "/healthz").await, StatusCode::OK);
        assert_eq!(status_of(&health, "/readyz").await, StatusCode::SERVICE_UNAVAILABLE);

        health
            .record_snapshot(&CollectOutcome {
                snapshot: Snapshot::default(),
                metrics_available: false,
                volume_stats_failures: 0,
            })
            .await;
        assert_eq!(status_of(&health, "/readyz").await, StatusCode::OK);

        health.record_failure("connection refused").await;
        assert_eq!(status_of(&health, "/healthz").await, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(&health, "/readyz").await, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_served_without_state() {
        snapshot_lib::AgentMetrics::new().inc_snapshot_timeouts();

        let status = status_of(&HealthRegistry::new(), "/metrics").await;
        assert_eq!(status, StatusCode::OK);
    }
}
