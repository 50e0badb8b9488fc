//! Observability for the snapshot agent
//!
//! Provides:
//! - Prometheus metrics (snapshot latency, record counts, failures, metrics API availability)
//! - Structured JSON logging with tracing

use crate::snapshot::Snapshot;
use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, register_int_gauge_vec,
    Histogram, IntCounter, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for snapshot duration (in seconds)
const SNAPSHOT_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0];

static GLOBAL_METRICS: OnceLock<AgentMetricsInner> = OnceLock::new();

struct AgentMetricsInner {
    snapshot_duration_seconds: Histogram,
    snapshot_records: IntGaugeVec,
    snapshot_failures: IntCounter,
    snapshot_timeouts: IntCounter,
    metrics_api_available: IntGauge,
    volume_stats_failures: IntGauge,
    last_success_timestamp: IntGauge,
}

impl AgentMetricsInner {
    fn new() -> Self {
        Self {
            snapshot_duration_seconds: register_histogram!(
                "kube_snapshot_duration_seconds",
                "Time spent fetching and assembling a cluster snapshot",
                SNAPSHOT_BUCKETS.to_vec()
            )
            .expect("Failed to register snapshot_duration_seconds"),

            snapshot_records: register_int_gauge_vec!(
                "kube_snapshot_records",
                "Number of records in the last snapshot by resource kind",
                &["kind"]
            )
            .expect("Failed to register snapshot_records"),

            snapshot_failures: register_int_counter!(
                "kube_snapshot_failures_total",
                "Snapshot cycles that failed to list cluster objects"
            )
            .expect("Failed to register snapshot_failures"),

            snapshot_timeouts: register_int_counter!(
                "kube_snapshot_timeouts_total",
                "Snapshot cycles discarded for exceeding their time budget"
            )
            .expect("Failed to register snapshot_timeouts"),

            metrics_api_available: register_int_gauge!(
                "kube_snapshot_metrics_api_available",
                "Whether usage samples were available in the last snapshot"
            )
            .expect("Failed to register metrics_api_available"),

            volume_stats_failures: register_int_gauge!(
                "kube_snapshot_volume_stats_failures",
                "Nodes whose volume statistics failed in the last snapshot"
            )
            .expect("Failed to register volume_stats_failures"),

            last_success_timestamp: register_int_gauge!(
                "kube_snapshot_last_success_timestamp_seconds",
                "Unix time of the last successful snapshot"
            )
            .expect("Failed to register last_success_timestamp"),
        }
    }
}

/// Handle to the process-wide snapshot metrics.
/// Clones share the same registered collectors.
#[derive(Clone)]
pub struct AgentMetrics {
    _private: (),
}

impl Default for AgentMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AgentMetricsInner {
        GLOBAL_METRICS.get_or_init(AgentMetricsInner::new)
    }

    /// Record a completed snapshot
    pub fn observe_snapshot(
        &self,
        snapshot: &Snapshot,
        duration_secs: f64,
        metrics_available: bool,
        volume_stats_failures: usize,
    ) {
        let inner = self.inner();
        inner.snapshot_duration_seconds.observe(duration_secs);

        let counts = [
            ("apiservices", snapshot.apiservices.len()),
            ("namespaces", snapshot.namespaces.len()),
            ("nodes", snapshot.nodes.len()),
            ("pods", snapshot.pods.len()),
            ("containers", snapshot.containers.len()),
            ("pvcs", snapshot.pvcs.len()),
            ("services", snapshot.services.len()),
        ];
        for (kind, count) in counts {
            inner
                .snapshot_records
                .with_label_values(&[kind])
                .set(count as i64);
        }

        inner
            .metrics_api_available
            .set(i64::from(metrics_available));
        inner
            .volume_stats_failures
            .set(volume_stats_failures as i64);
        inner
            .last_success_timestamp
            .set(chrono::Utc::now().timestamp());
    }

    pub fn inc_snapshot_failures(&self) {
        self.inner().snapshot_failures.inc();
    }

    pub fn inc_snapshot_timeouts(&self) {
        self.inner().snapshot_timeouts.inc();
    }
}

/// Structured logger for agent lifecycle and snapshot events
#[derive(Clone)]
pub struct StructuredLogger {
    cluster: String,
}

impl StructuredLogger {
    pub fn new(cluster: impl Into<String>) -> Self {
        Self {
            cluster: cluster.into(),
        }
    }

    pub fn log_startup(&self, version: &str, interval_secs: u64) {
        info!(
            event = "agent_started",
            cluster = %self.cluster,
            agent_version = %version,
            interval_secs = interval_secs,
            "Snapshot agent started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "agent_shutdown",
            cluster = %self.cluster,
            reason = %reason,
            "Snapshot agent shutting down"
        );
    }

    pub fn log_snapshot(&self, snapshot: &Snapshot, elapsed_ms: u128, metrics_available: bool) {
        info!(
            event = "snapshot_completed",
            cluster = %self.cluster,
            nodes = snapshot.nodes.len(),
            pods = snapshot.pods.len(),
            containers = snapshot.containers.len(),
            pvcs = snapshot.pvcs.len(),
            services = snapshot.services.len(),
            metrics_available = metrics_available,
            elapsed_ms = elapsed_ms as u64,
            "Cluster snapshot completed"
        );
    }

    pub fn log_snapshot_failed(&self, error: &str) {
        warn!(
            event = "snapshot_failed",
            cluster = %self.cluster,
            error = %error,
            "Cluster snapshot failed"
        );
    }

    pub fn log_snapshot_timeout(&self, budget_secs: u64) {
        warn!(
            event = "snapshot_timeout",
            cluster = %self.cluster,
            budget_secs = budget_secs,
            "Cluster snapshot exceeded its time budget and was discarded"
        );
    }
}
