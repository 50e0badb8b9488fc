//! Usage metrics joined against declared capacity
//!
//! This module provides:
//! - Sample maps keyed by resource identity, built from metrics API and
//!   kubelet summary payloads
//! - Per-kind aggregation of samples into usage and utilization fields

mod aggregate;
mod samples;

pub use aggregate::{
    aggregate_container, aggregate_node, aggregate_pod, aggregate_volume, NodeUsage,
    PercentPolicy, UsageMetrics, VolumeUsage,
};
pub use samples::{
    ContainerMetrics, MetricSamples, NodeMetrics, NodeMetricsList, ObjectKey, PodMetrics,
    PodMetricsList, PodStats, PvcReference, StatsSummary, Usage, VolumeStats,
};
