//! Health tracking for the snapshot agent
//!
//! Each snapshot cycle reports which collaborators worked. Liveness follows
//! the worst component; readiness requires one completed snapshot.

use crate::source::CollectOutcome;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Every source answered in the last cycle
    Healthy,
    /// Working with reduced output (e.g. usage fields missing)
    Degraded,
    /// The last cycle could not list cluster objects
    Unhealthy,
}

impl ComponentStatus {
    /// Healthy or degraded; the agent still produces snapshots
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Health of one snapshot collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    /// Why the component is not healthy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Unix seconds of the last status change
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    fn with_status(status: ComponentStatus, message: Option<String>) -> Self {
        Self {
            status,
            message,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn healthy() -> Self {
        Self::with_status(ComponentStatus::Healthy, None)
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Degraded, Some(message.into()))
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self::with_status(ComponentStatus::Unhealthy, Some(message.into()))
    }
}

/// Body of `/healthz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_snapshot_timestamp: Option<i64>,
}

impl HealthResponse {
    /// Worst status across components; no components means healthy
    pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
        components
            .values()
            .map(|h| h.status)
            .max_by_key(|status| match status {
                ComponentStatus::Healthy => 0,
                ComponentStatus::Degraded => 1,
                ComponentStatus::Unhealthy => 2,
            })
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Body of `/readyz`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    /// Listing cluster objects
    pub const CLUSTER_API: &str = "cluster_api";
    /// `metrics.k8s.io` node and pod usage
    pub const METRICS_API: &str = "metrics_api";
    /// Kubelet volume statistics
    pub const VOLUME_STATS: &str = "volume_stats";
}

#[derive(Debug, Default)]
struct HealthState {
    components: HashMap<String, ComponentHealth>,
    last_snapshot_timestamp: Option<i64>,
}

/// Shared health registry, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<HealthState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component with initial healthy status
    pub async fn register(&self, name: &str) {
        self.update(name, ComponentHealth::healthy()).await;
    }

    pub async fn update(&self, name: &str, health: ComponentHealth) {
        let mut state = self.state.write().await;
        state.components.insert(name.to_string(), health);
    }

    pub async fn set_unhealthy(&self, name: &str, message: impl Into<String>) {
        self.update(name, ComponentHealth::unhealthy(message)).await;
    }

    /// Update components from a completed snapshot cycle
    pub async fn record_snapshot(&self, outcome: &CollectOutcome) {
        let metrics = if outcome.metrics_available {
            ComponentHealth::healthy()
        } else {
            ComponentHealth::degraded("Metrics API unavailable, usage fields omitted")
        };
        let volumes = match outcome.volume_stats_failures {
            0 => ComponentHealth::healthy(),
            n => ComponentHealth::degraded(format!("Volume stats unavailable for {n} node(s)")),
        };

        let mut state = self.state.write().await;
        state
            .components
            .insert(components::CLUSTER_API.to_string(), ComponentHealth::healthy());
        state
            .components
            .insert(components::METRICS_API.to_string(), metrics);
        state
            .components
            .insert(components::VOLUME_STATS.to_string(), volumes);
        state.last_snapshot_timestamp = Some(chrono::Utc::now().timestamp());
    }

    /// Mark the cluster API unhealthy after a failed cycle
    pub async fn record_failure(&self, message: impl Into<String>) {
        self.set_unhealthy(components::CLUSTER_API, message).await;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: HealthResponse::compute_status(&state.components),
            components: state.components.clone(),
            last_snapshot_timestamp: state.last_snapshot_timestamp,
        }
    }

    /// Ready once a snapshot has completed and the cluster API is reachable
    pub async fn readiness(&self) -> ReadinessResponse {
        let health = self.health().await;

        if health.last_snapshot_timestamp.is_none() {
            ReadinessResponse {
                ready: false,
                reason: Some("No snapshot completed yet".to_string()),
            }
        } else if health.status == ComponentStatus::Unhealthy {
            ReadinessResponse {
                ready: false,
                reason: Some("Cluster API unhealthy".to_string()),
            }
        } else {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::Snapshot;

    fn outcome(metrics_available: bool, volume_stats_failures: usize) -> CollectOutcome {
        CollectOutcome {
            snapshot: Snapshot::default(),
            metrics_available,
            volume_stats_failures,
        }
    }

    #[test]
    fn test_component_status_operational() {
        assert!(ComponentStatus::Healthy.is_operational());
        assert!(ComponentStatus::Degraded.is_operational());
        assert!(!ComponentStatus::Unhealthy.is_operational());
    }

    #[tokio::test]
    async fn test_health_registry_initial_state() {
        let registry = HealthRegistry::new();
        let health = registry.health().await;

        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());
        assert!(health.last_snapshot_timestamp.is_none());
    }

    #[tokio::test]
    async fn test_record_snapshot_all_sources() {
        let registry = HealthRegistry::new();
        registry.record_snapshot(&outcome(true, 0)).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert_eq!(health.components.len(), 3);
        assert!(health.last_snapshot_timestamp.is_some());
    }

    #[tokio::test]
    async fn test_missing_metrics_is_degraded() {
        let registry = HealthRegistry::new();
        registry.record_snapshot(&outcome(false, 2)).await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(
            health.components[components::VOLUME_STATS].message.as_deref(),
            Some("Volume stats unavailable for 2 node(s)")
        );

        // Degraded snapshots still count as ready
        assert!(registry.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_readiness_not_ready_initially() {
        let registry = HealthRegistry::new();
        registry.register(components::CLUSTER_API).await;

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }

    #[tokio::test]
    async fn test_failure_after_snapshot_is_not_ready() {
        let registry = HealthRegistry::new();
        registry.record_snapshot(&outcome(true, 0)).await;
        registry.record_failure("Unauthorized").await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Unhealthy);
        assert!(!registry.readiness().await.ready);

        registry.record_snapshot(&outcome(true, 0)).await;
        assert!(registry.readiness().await.ready);
    }
}
