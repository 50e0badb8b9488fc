//! Integration tests for the agent API endpoints

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use snapshot_lib::{
    health::{components, HealthRegistry},
    AgentMetrics, CollectOutcome, Snapshot,
};
use tower::ServiceExt;

async fn healthz(State(health): State<HealthRegistry>) -> impl IntoResponse {
    let health = health.health().await;
    let status_code = if health.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(health))
}

async fn readyz(State(health): State<HealthRegistry>) -> impl IntoResponse {
    let readiness = health.readiness().await;
    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(readiness))
}

async fn snapshot_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&prometheus::gather(), &mut buffer).unwrap();
    (
        StatusCode::OK,
        [("content-type", encoder.format_type().to_string())],
        buffer,
    )
}

fn create_test_router(health: HealthRegistry) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(snapshot_metrics))
        .with_state(health)
}

async fn setup_test_app() -> (Router, HealthRegistry) {
    let health = HealthRegistry::new();
    health.register(components::CLUSTER_API).await;

    let router = create_test_router(health.clone());
    (router, health)
}

fn outcome(metrics_available: bool) -> CollectOutcome {
    CollectOutcome {
        snapshot: Snapshot::default(),
        metrics_available,
        volume_stats_failures: 0,
    }
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_healthz_returns_ok_when_healthy() {
    let (app, _health) = setup_test_app().await;

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "healthy");
    assert!(health["components"]["cluster_api"].is_object());
}

#[tokio::test]
async fn test_healthz_ok_without_metrics_api() {
    let (app, health) = setup_test_app().await;
    health.record_snapshot(&outcome(false)).await;

    let (status, health) = get_json(app, "/healthz").await;

    // Missing usage data is degraded, not down
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["components"]["metrics_api"]["status"], "degraded");
}

#[tokio::test]
async fn test_healthz_returns_503_after_failed_cycle() {
    let (app, health) = setup_test_app().await;
    health
        .record_failure("failed to list pods: Unauthorized")
        .await;

    let (status, health) = get_json(app, "/healthz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
    assert_eq!(
        health["components"]["cluster_api"]["message"],
        "failed to list pods: Unauthorized"
    );
}

#[tokio::test]
async fn test_readyz_returns_503_before_first_snapshot() {
    let (app, _health) = setup_test_app().await;

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);
}

#[tokio::test]
async fn test_readyz_returns_ok_after_snapshot() {
    let (app, health) = setup_test_app().await;
    health.record_snapshot(&outcome(true)).await;

    let (status, readiness) = get_json(app, "/readyz").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let (app, _health) = setup_test_app().await;
    let metrics = AgentMetrics::new();
    metrics.observe_snapshot(&Snapshot::default(), 0.8, true, 0);
    metrics.inc_snapshot_failures();

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("kube_snapshot_duration_seconds_bucket"));
    assert!(metrics_text.contains("kube_snapshot_records{kind=\"pods\"}"));
    assert!(metrics_text.contains("kube_snapshot_failures_total"));
    assert!(metrics_text.contains("kube_snapshot_metrics_api_available 1"));
}
