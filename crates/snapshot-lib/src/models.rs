//! Snapshot record types
//!
//! One record per cluster object, flattened into the field names the
//! snapshot is published with. Usage fields are omitted when no sample was
//! available; declared fields serialize as `null` when absent.

use crate::metrics::{NodeUsage, UsageMetrics, VolumeUsage};
use crate::status::LastState;
use serde::{Deserialize, Serialize};

/// Aggregated API service registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiServiceRecord {
    pub name: String,
    pub available: bool,
    /// `namespace/name` of the backing service, `None` for local APIs
    pub service: Option<String>,
    pub creation_timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    pub name: String,
    pub phase: Option<String>,
    pub creation_timestamp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub name: String,
    pub creation_timestamp: Option<i64>,

    pub allocatable_cpu: Option<f64>,
    pub allocatable_memory: Option<i64>,
    pub allocatable_pods: Option<i64>,

    pub capacity_cpu: Option<f64>,
    pub capacity_memory: Option<i64>,
    pub capacity_pods: Option<i64>,

    pub architecture: Option<String>,
    pub container_runtime_version: Option<String>,
    pub kernel_version: Option<String>,
    pub kube_proxy_version: Option<String>,
    pub kubelet_version: Option<String>,
    pub operating_system: Option<String>,

    pub roles: Vec<String>,
    pub status: String,

    #[serde(flatten)]
    pub usage: NodeUsage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodRecord {
    /// `namespace/name`
    pub name: String,
    pub namespace: String,
    pub pod_name: String,
    pub phase: Option<String>,
    pub creation_timestamp: Option<i64>,

    pub status: String,
    pub containers: usize,
    pub ready_containers: usize,
    pub restarts: i64,

    #[serde(flatten)]
    pub last_state: Option<LastState>,

    #[serde(flatten)]
    pub usage: UsageMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// `namespace/pod/container`
    pub name: String,
    pub container_name: String,
    pub namespace: String,
    /// Owning pod as `namespace/pod`
    pub pod: String,

    pub limits_cpu: Option<f64>,
    pub limits_memory: Option<i64>,
    pub requests_cpu: Option<f64>,
    pub requests_memory: Option<i64>,

    pub restarts: i64,

    #[serde(flatten)]
    pub usage: UsageMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PvcRecord {
    /// `namespace/name`
    pub name: String,
    pub namespace: String,
    pub creation_timestamp: Option<i64>,
    pub storage_class: Option<String>,
    pub volume_name: Option<String>,
    pub phase: Option<String>,
    pub access_modes: Vec<String>,
    /// Declared capacity in bytes
    pub capacity: Option<i64>,

    #[serde(flatten)]
    pub usage: VolumeUsage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// `namespace/name`
    pub name: String,
    pub namespace: String,
    pub creation_timestamp: Option<i64>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub cluster_ip: Option<String>,
    pub external_ips: Vec<String>,
    /// `port/protocol`
    pub ports: Vec<String>,
}
