//! Raw metric samples
//!
//! Payload types mirror `metrics.k8s.io/v1beta1` (`NodeMetricsList`,
//! `PodMetricsList`) and the kubelet `/stats/summary` document. Only the
//! fields the aggregator reads are modelled; everything else is ignored.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Namespaced object identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    fn from_meta(meta: &ObjectMeta) -> Option<Self> {
        Some(Self::new(meta.namespace.clone()?, meta.name.clone()?))
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Raw usage quantities as reported by the metrics API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
}

impl Usage {
    pub fn new(cpu: impl Into<String>, memory: impl Into<String>) -> Self {
        Self {
            cpu: Some(cpu.into()),
            memory: Some(memory.into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeMetricsList {
    #[serde(default)]
    pub items: Vec<NodeMetrics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NodeMetrics {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub usage: Usage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodMetricsList {
    #[serde(default)]
    pub items: Vec<PodMetrics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PodMetrics {
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub containers: Vec<ContainerMetrics>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerMetrics {
    pub name: String,
    #[serde(default)]
    pub usage: Usage,
}

/// Kubelet `/stats/summary` document
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsSummary {
    #[serde(default)]
    pub pods: Vec<PodStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodStats {
    #[serde(default, rename = "volume")]
    pub volumes: Vec<VolumeStats>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub pvc_ref: Option<PvcReference>,
    #[serde(default)]
    pub available_bytes: Option<u64>,
    #[serde(default)]
    pub capacity_bytes: Option<u64>,
    #[serde(default)]
    pub used_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PvcReference {
    pub name: String,
    pub namespace: String,
}

/// All samples for one snapshot cycle
///
/// Container samples are kept in a `BTreeMap` so that pod sums are always
/// accumulated in the same order.
#[derive(Debug, Clone, Default)]
pub struct MetricSamples {
    /// Node name -> usage
    pub nodes: HashMap<String, Usage>,
    /// (namespace, pod) -> container name -> usage
    pub pods: HashMap<ObjectKey, BTreeMap<String, Usage>>,
    /// (namespace, claim) -> volume stats
    pub volumes: HashMap<ObjectKey, VolumeStats>,
}

impl MetricSamples {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add node samples from a metrics API listing; items without a name are skipped
    pub fn add_node_metrics(&mut self, list: NodeMetricsList) {
        for item in list.items {
            if let Some(name) = item.metadata.name {
                self.nodes.insert(name, item.usage);
            }
        }
    }

    /// Add pod samples from a metrics API listing
    pub fn add_pod_metrics(&mut self, list: PodMetricsList) {
        for item in list.items {
            let Some(key) = ObjectKey::from_meta(&item.metadata) else {
                continue;
            };
            let containers = item
                .containers
                .into_iter()
                .map(|c| (c.name, c.usage))
                .collect();
            self.pods.insert(key, containers);
        }
    }

    /// Add volume samples from a kubelet summary; only PVC-backed volumes are kept
    pub fn add_stats_summary(&mut self, summary: StatsSummary) {
        for volume in summary.pods.into_iter().flat_map(|p| p.volumes) {
            if let Some(pvc) = volume.pvc_ref.as_ref() {
                let key = ObjectKey::new(pvc.namespace.clone(), pvc.name.clone());
                self.volumes.insert(key, volume);
            }
        }
    }
}
