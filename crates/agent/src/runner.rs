//! Periodic snapshot loop
//!
//! Takes a snapshot every interval, bounded by a per-cycle time budget.
//! A cycle that fails or runs out of time is logged and discarded; the next
//! tick starts from scratch.

use snapshot_lib::{
    collect_snapshot, AgentMetrics, ClusterSource, HealthRegistry, Snapshot, SnapshotOptions,
    StructuredLogger,
};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub interval: Duration,
    pub cycle_timeout: Duration,
    pub options: SnapshotOptions,
    pub print_snapshot: bool,
}

pub struct SnapshotRunner {
    source: Arc<dyn ClusterSource>,
    config: RunnerConfig,
    health: HealthRegistry,
    metrics: AgentMetrics,
    logger: StructuredLogger,
}

impl SnapshotRunner {
    pub fn new(
        source: Arc<dyn ClusterSource>,
        config: RunnerConfig,
        health: HealthRegistry,
        metrics: AgentMetrics,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            source,
            config,
            health,
            metrics,
            logger,
        }
    }

    /// Run until a shutdown signal arrives
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            "Starting snapshot loop"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                _ = shutdown.recv() => {
                    info!("Shutting down snapshot loop");
                    break;
                }
            }
        }
    }

    /// Take one snapshot within the time budget
    pub async fn run_once(&self) -> Option<Snapshot> {
        let start = Instant::now();
        let cycle = collect_snapshot(self.source.as_ref(), &self.config.options);

        let outcome = match tokio::time::timeout(self.config.cycle_timeout, cycle).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                self.metrics.inc_snapshot_failures();
                self.logger.log_snapshot_failed(&e.to_string());
                self.health.record_failure(e.to_string()).await;
                return None;
            }
            Err(_) => {
                self.metrics.inc_snapshot_timeouts();
                self.logger
                    .log_snapshot_timeout(self.config.cycle_timeout.as_secs());
                self.health
                    .record_failure("Snapshot exceeded its time budget")
                    .await;
                return None;
            }
        };

        let elapsed = start.elapsed();
        self.metrics.observe_snapshot(
            &outcome.snapshot,
            elapsed.as_secs_f64(),
            outcome.metrics_available,
            outcome.volume_stats_failures,
        );
        self.health.record_snapshot(&outcome).await;
        self.logger.log_snapshot(
            &outcome.snapshot,
            elapsed.as_millis(),
            outcome.metrics_available,
        );

        if self.config.print_snapshot {
            if let Err(e) = print_snapshot(&outcome.snapshot) {
                warn!(error = %e, "Failed to write snapshot");
            }
        }

        Some(outcome.snapshot)
    }
}

/// Write the snapshot as a single JSON line
fn print_snapshot(snapshot: &Snapshot) -> std::io::Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer(&mut stdout, snapshot)?;
    writeln!(stdout)?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use k8s_openapi::api::core::v1::{Namespace, Node, PersistentVolumeClaim, Pod, Service};
    use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
    use snapshot_lib::metrics::{NodeMetricsList, PodMetricsList, StatsSummary};
    use snapshot_lib::{ComponentStatus, SourceError};

    /// Source returning an empty cluster, optionally slow or failing
    struct StubSource {
        delay: Duration,
        fail: bool,
    }

    #[async_trait]
    impl ClusterSource for StubSource {
        async fn list_api_services(&self) -> Result<Vec<APIService>, SourceError> {
            tokio::time::sleep(self.delay).await;
            if self.fail {
                return Err(SourceError::Api {
                    kind: "apiservices",
                    message: "connection refused".to_string(),
                });
            }
            Ok(Vec::new())
        }

        async fn list_namespaces(&self) -> Result<Vec<Namespace>, SourceError> {
            Ok(Vec::new())
        }

        async fn list_nodes(&self) -> Result<Vec<Node>, SourceError> {
            Ok(Vec::new())
        }

        async fn list_pods(&self) -> Result<Vec<Pod>, SourceError> {
            Ok(Vec::new())
        }

        async fn list_pvcs(&self) -> Result<Vec<PersistentVolumeClaim>, SourceError> {
            Ok(Vec::new())
        }

        async fn list_services(&self) -> Result<Vec<Service>, SourceError> {
            Ok(Vec::new())
        }

        async fn node_metrics(&self) -> Result<NodeMetricsList, SourceError> {
            Ok(NodeMetricsList { items: Vec::new() })
        }

        async fn pod_metrics(&self) -> Result<PodMetricsList, SourceError> {
            Ok(PodMetricsList { items: Vec::new() })
        }

        async fn node_stats_summary(&self, _node: &str) -> Result<StatsSummary, SourceError> {
            Ok(StatsSummary::default())
        }
    }

    fn runner(delay: Duration, fail: bool, health: HealthRegistry) -> SnapshotRunner {
        SnapshotRunner::new(
            Arc::new(StubSource { delay, fail }),
            RunnerConfig {
                interval: Duration::from_secs(300),
                cycle_timeout: Duration::from_millis(200),
                options: SnapshotOptions::default(),
                print_snapshot: false,
            },
            health,
            AgentMetrics::new(),
            StructuredLogger::new("test"),
        )
    }

    #[tokio::test]
    async fn test_successful_cycle_marks_ready() {
        let health = HealthRegistry::new();
        let snapshot = runner(Duration::ZERO, false, health.clone()).run_once().await;

        assert!(snapshot.is_some());
        assert!(health.readiness().await.ready);
        // No metrics API registered in an empty cluster
        assert_eq!(health.health().await.status, ComponentStatus::Degraded);
    }

    #[tokio::test]
    async fn test_failed_cycle_is_unhealthy() {
        let health = HealthRegistry::new();
        let snapshot = runner(Duration::ZERO, true, health.clone()).run_once().await;

        assert!(snapshot.is_none());
        assert_eq!(health.health().await.status, ComponentStatus::Unhealthy);
        assert!(!health.readiness().await.ready);
    }

    #[tokio::test]
    async fn test_slow_cycle_is_discarded() {
        let health = HealthRegistry::new();
        let snapshot = runner(Duration::from_secs(5), false, health.clone())
            .run_once()
            .await;

        assert!(snapshot.is_none());
        assert_eq!(health.health().await.status, ComponentStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let (tx, rx) = broadcast::channel(1);
        let handle = tokio::spawn(runner(Duration::ZERO, false, HealthRegistry::new()).run(rx));

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
