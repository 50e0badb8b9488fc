//! Cluster access seam
//!
//! The snapshot core never talks to the cluster itself. A [`ClusterSource`]
//! fetches objects and samples; [`collect_snapshot`] drives one cycle,
//! turning unavailable metric sources into empty sample maps before handing
//! everything to the assembler.

use crate::metrics::{MetricSamples, NodeMetricsList, PodMetricsList, StatsSummary};
use crate::models::ApiServiceRecord;
use crate::snapshot::{api_service_record, assemble, Snapshot, SnapshotInput, SnapshotOptions};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, PersistentVolumeClaim, Pod, Service};
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use thiserror::Error;
use tracing::{debug, warn};

/// API service that must be available before the metrics API is queried
pub const METRICS_API_SERVICE: &str = "v1beta1.metrics.k8s.io";

/// Failures reported by a [`ClusterSource`]
#[derive(Debug, Error)]
pub enum SourceError {
    /// Listing a resource kind failed (authentication, transport, API error)
    #[error("failed to list {kind}: {message}")]
    Api { kind: &'static str, message: String },

    /// A metrics or kubelet endpoint could not be queried
    #[error("metrics request to {endpoint} failed: {message}")]
    Metrics { endpoint: String, message: String },

    /// A payload was fetched but could not be decoded
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Provider of already-fetched cluster objects and metric samples
#[async_trait]
pub trait ClusterSource: Send + Sync {
    async fn list_api_services(&self) -> Result<Vec<APIService>, SourceError>;

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, SourceError>;

    async fn list_nodes(&self) -> Result<Vec<Node>, SourceError>;

    async fn list_pods(&self) -> Result<Vec<Pod>, SourceError>;

    async fn list_pvcs(&self) -> Result<Vec<PersistentVolumeClaim>, SourceError>;

    async fn list_services(&self) -> Result<Vec<Service>, SourceError>;

    /// `metrics.k8s.io/v1beta1` node metrics
    async fn node_metrics(&self) -> Result<NodeMetricsList, SourceError>;

    /// `metrics.k8s.io/v1beta1` pod metrics
    async fn pod_metrics(&self) -> Result<PodMetricsList, SourceError>;

    /// Kubelet `/stats/summary` for a single node
    async fn node_stats_summary(&self, node: &str) -> Result<StatsSummary, SourceError>;
}

/// A snapshot plus what degraded while collecting it
#[derive(Debug, Clone)]
pub struct CollectOutcome {
    pub snapshot: Snapshot,
    /// Whether node and pod usage samples were available
    pub metrics_available: bool,
    /// Nodes whose volume statistics could not be fetched
    pub volume_stats_failures: usize,
}

/// Whether the metrics API service is registered and reports `Available`
pub fn metrics_api_available(api_services: &[ApiServiceRecord]) -> bool {
    api_services
        .iter()
        .any(|api| api.name == METRICS_API_SERVICE && api.available)
}

/// Fetch everything for one cycle and assemble the snapshot.
///
/// Listing failures are fatal and returned to the caller. Metric sources
/// degrade: an unavailable metrics API or a failing kubelet summary only
/// leaves the affected usage fields empty.
pub async fn collect_snapshot(
    source: &dyn ClusterSource,
    options: &SnapshotOptions,
) -> Result<CollectOutcome, SourceError> {
    let api_services = source.list_api_services().await?;
    let api_records: Vec<ApiServiceRecord> = api_services.iter().map(api_service_record).collect();

    let mut samples = MetricSamples::new();
    let metrics_available = if metrics_api_available(&api_records) {
        fetch_usage_samples(source, &mut samples).await
    } else {
        warn!(
            event = "metrics_api_unavailable",
            api_service = METRICS_API_SERVICE,
            "Metrics API service is not available; usage fields will be omitted"
        );
        false
    };

    let namespaces = source.list_namespaces().await?;
    let nodes = source.list_nodes().await?;
    let pods = source.list_pods().await?;

    let mut volume_stats_failures = 0;
    for name in nodes.iter().filter_map(|n| n.metadata.name.as_deref()) {
        match source.node_stats_summary(name).await {
            Ok(summary) => samples.add_stats_summary(summary),
            Err(e) => {
                volume_stats_failures += 1;
                warn!(
                    event = "volume_stats_failed",
                    node = %name,
                    error = %e,
                    "Failed to retrieve volume usage"
                );
            }
        }
    }

    let pvcs = source.list_pvcs().await?;
    let services = source.list_services().await?;

    let input = SnapshotInput {
        api_services,
        namespaces,
        nodes,
        pods,
        pvcs,
        services,
        samples,
    };

    let snapshot = assemble(&input, options);
    debug!(records = snapshot.record_count(), "Snapshot assembled");

    Ok(CollectOutcome {
        snapshot,
        metrics_available,
        volume_stats_failures,
    })
}

/// Fill node and pod samples; returns false when either request failed
async fn fetch_usage_samples(source: &dyn ClusterSource, samples: &mut MetricSamples) -> bool {
    let mut complete = true;

    match source.node_metrics().await {
        Ok(list) => samples.add_node_metrics(list),
        Err(e) => {
            complete = false;
            warn!(error = %e, "Failed to fetch node metrics");
        }
    }

    match source.pod_metrics().await {
        Ok(list) => samples.add_pod_metrics(list),
        Err(e) => {
            complete = false;
            warn!(error = %e, "Failed to fetch pod metrics");
        }
    }

    complete
}
