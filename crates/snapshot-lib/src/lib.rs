//! Cluster snapshot library
//!
//! This crate provides the core functionality for:
//! - Parsing Kubernetes resource quantities
//! - Deriving node and pod status the way `kubectl` displays it
//! - Joining usage samples against declared capacity
//! - Assembling normalized per-kind snapshot records
//! - Health checks and observability for the agent

pub mod health;
pub mod metrics;
pub mod models;
pub mod observability;
pub mod quantity;
pub mod snapshot;
pub mod source;
pub mod status;

pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use metrics::{MetricSamples, PercentPolicy};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use quantity::{parse_quantity, Quantity, QuantityMode};
pub use snapshot::{assemble, Snapshot, SnapshotInput, SnapshotOptions};
pub use source::{collect_snapshot, ClusterSource, CollectOutcome, SourceError};
