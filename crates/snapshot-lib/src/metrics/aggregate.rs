//! Sample aggregation
//!
//! Every lookup degrades to an omitted field: a missing sample, an
//! unparsable quantity or a zero denominator never fails the snapshot.

use super::samples::{MetricSamples, ObjectKey, Usage};
use crate::quantity::{parse_bytes, parse_cpu};
use k8s_openapi::api::core::v1::Node;
use serde::{Deserialize, Serialize};

/// How utilization percentages are reported for over-committed resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentPolicy {
    /// Report the raw ratio, which may exceed 100 when bursting
    #[default]
    Unclamped,
    /// Cap percentages at 100
    ClampAt100,
}

impl PercentPolicy {
    /// `part / whole * 100`, or `None` when `whole` is zero
    pub fn percent(&self, part: f64, whole: f64) -> Option<f64> {
        if whole == 0.0 {
            return None;
        }
        let percent = part / whole * 100.0;
        if !percent.is_finite() {
            return None;
        }
        match self {
            PercentPolicy::Unclamped => Some(percent),
            PercentPolicy::ClampAt100 => Some(percent.min(100.0)),
        }
    }
}

/// Node usage joined against allocatable resources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_memory: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_memory: Option<f64>,
}

/// CPU (cores) and memory (bytes) usage of a pod or container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_memory: Option<i64>,
}

impl UsageMetrics {
    fn from_usage(usage: &Usage) -> Self {
        Self {
            usage_cpu: parse_cpu(usage.cpu.as_deref()),
            usage_memory: parse_bytes(usage.memory.as_deref()),
        }
    }
}

/// Volume statistics for a persistent volume claim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VolumeUsage {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_used: Option<f64>,
}

/// Join the node's sample against its allocatable cpu and memory
pub fn aggregate_node(node: &Node, samples: &MetricSamples, policy: PercentPolicy) -> NodeUsage {
    let Some(usage) = node
        .metadata
        .name
        .as_ref()
        .and_then(|name| samples.nodes.get(name))
    else {
        return NodeUsage::default();
    };

    let allocatable = node.status.as_ref().and_then(|s| s.allocatable.as_ref());
    let allocatable_cpu = allocatable
        .and_then(|a| a.get("cpu"))
        .and_then(|q| parse_cpu(Some(q.0.as_str())));
    let allocatable_memory = allocatable
        .and_then(|a| a.get("memory"))
        .and_then(|q| parse_bytes(Some(q.0.as_str())));

    let UsageMetrics {
        usage_cpu,
        usage_memory,
    } = UsageMetrics::from_usage(usage);

    let percent_cpu = usage_cpu
        .zip(allocatable_cpu)
        .and_then(|(used, total)| policy.percent(used, total));
    let percent_memory = usage_memory
        .zip(allocatable_memory)
        .and_then(|(used, total)| policy.percent(used as f64, total as f64));

    NodeUsage {
        usage_cpu,
        usage_memory,
        percent_cpu,
        percent_memory,
    }
}

/// Sum container samples of a pod; unparsable samples contribute nothing.
///
/// A pod without any sample entry gets no usage fields at all.
pub fn aggregate_pod(pod: &ObjectKey, samples: &MetricSamples) -> UsageMetrics {
    let Some(containers) = samples.pods.get(pod) else {
        return UsageMetrics::default();
    };

    let usage_cpu = containers
        .values()
        .filter_map(|u| parse_cpu(u.cpu.as_deref()))
        .sum::<f64>();
    let usage_memory = containers
        .values()
        .filter_map(|u| parse_bytes(u.memory.as_deref()))
        .try_fold(0i64, i64::checked_add);

    UsageMetrics {
        usage_cpu: Some(usage_cpu),
        // Omitted rather than capped when the sum overflows
        usage_memory,
    }
}

/// Look up a single container's sample
pub fn aggregate_container(pod: &ObjectKey, container: &str, samples: &MetricSamples) -> UsageMetrics {
    samples
        .pods
        .get(pod)
        .and_then(|containers| containers.get(container))
        .map(UsageMetrics::from_usage)
        .unwrap_or_default()
}

/// Look up a claim's volume stats and derive the used percentage
pub fn aggregate_volume(claim: &ObjectKey, samples: &MetricSamples, policy: PercentPolicy) -> VolumeUsage {
    let Some(volume) = samples.volumes.get(claim) else {
        return VolumeUsage::default();
    };

    let percent_used = volume
        .used_bytes
        .zip(volume.capacity_bytes)
        .and_then(|(used, capacity)| policy.percent(used as f64, capacity as f64));

    VolumeUsage {
        available_bytes: volume.available_bytes,
        capacity_bytes: volume.capacity_bytes,
        used_bytes: volume.used_bytes,
        percent_used,
    }
}
