//! kube-snapshot - Kubernetes cluster snapshot agent
//!
//! Periodically lists cluster objects, joins them with usage samples from
//! the metrics API, and writes one normalized snapshot per cycle as a JSON
//! line on stdout. Logs go to stderr.

use anyhow::Result;
use snapshot_lib::{
    health::{components, HealthRegistry},
    AgentMetrics, StructuredLogger,
};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod kube_source;
mod runner;

use kube_source::KubeSource;
use runner::SnapshotRunner;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr, stdout carries snapshots
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .init();

    info!("Starting kube-snapshot");

    let config = config::AgentConfig::load()?;
    config.validate()?;
    info!(
        cluster = %config.cluster_name,
        in_cluster = config.in_cluster,
        once = config.once,
        "Agent configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::CLUSTER_API).await;

    let metrics = AgentMetrics::new();

    let logger = StructuredLogger::new(&config.cluster_name);
    logger.log_startup(AGENT_VERSION, config.check_interval_secs);

    let source = Arc::new(KubeSource::connect(config.in_cluster).await?);
    let runner = SnapshotRunner::new(
        source,
        config.runner_config(),
        health_registry.clone(),
        metrics,
        logger.clone(),
    );

    if config.once {
        let snapshot = runner.run_once().await;
        logger.log_shutdown("single snapshot taken");
        if snapshot.is_none() {
            anyhow::bail!("snapshot failed");
        }
        return Ok(());
    }

    let api_port = config.api_port;
    tokio::spawn(async move {
        if let Err(e) = api::serve_probes(api_port, health_registry).await {
            error!(error = %e, "API server stopped");
        }
    });

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let runner_handle = tokio::spawn(runner.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    runner_handle.await?;

    info!("Shutdown complete");
    Ok(())
}
