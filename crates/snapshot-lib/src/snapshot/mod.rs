//! Snapshot assembly
//!
//! Combines resolved status and aggregated usage into per-kind record lists.
//! Assembly is a pure function of its input: record lists and list-valued
//! fields are sorted, so the same objects in any order produce the same
//! snapshot.

mod assemble;
mod service;


pub use assemble::{
    api_service_record, container_records, namespace_record, node_record, pod_record, pvc_record,
    service_record,
};
pub use service::{external_ips, service_ports};

use crate::metrics::{MetricSamples, PercentPolicy};
use crate::models::{
    ApiServiceRecord, ContainerRecord, NamespaceRecord, NodeRecord, PodRecord, PvcRecord,
    ServiceRecord,
};
use k8s_openapi::api::core::v1::{Namespace, Node, PersistentVolumeClaim, Pod, Service};
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use serde::{Deserialize, Serialize};

/// Options applied while assembling a snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotOptions {
    pub percent_policy: PercentPolicy,
}

/// Already-fetched cluster objects and samples for one cycle
#[derive(Debug, Clone, Default)]
pub struct SnapshotInput {
    pub api_services: Vec<APIService>,
    pub namespaces: Vec<Namespace>,
    pub nodes: Vec<Node>,
    pub pods: Vec<Pod>,
    pub pvcs: Vec<PersistentVolumeClaim>,
    pub services: Vec<Service>,
    pub samples: MetricSamples,
}

/// Normalized records keyed by resource kind
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub apiservices: Vec<ApiServiceRecord>,
    pub namespaces: Vec<NamespaceRecord>,
    pub nodes: Vec<NodeRecord>,
    pub pods: Vec<PodRecord>,
    pub containers: Vec<ContainerRecord>,
    pub pvcs: Vec<PvcRecord>,
    pub services: Vec<ServiceRecord>,
}

impl Snapshot {
    /// Total number of records across all kinds
    pub fn record_count(&self) -> usize {
        self.apiservices.len()
            + self.namespaces.len()
            + self.nodes.len()
            + self.pods.len()
            + self.containers.len()
            + self.pvcs.len()
            + self.services.len()
    }
}

/// Assemble a snapshot from fetched objects and samples
pub fn assemble(input: &SnapshotInput, options: &SnapshotOptions) -> Snapshot {
    let samples = &input.samples;
    let policy = options.percent_policy;

    let mut snapshot = Snapshot {
        apiservices: input.api_services.iter().map(api_service_record).collect(),
        namespaces: input.namespaces.iter().map(namespace_record).collect(),
        nodes: input
            .nodes
            .iter()
            .map(|n| node_record(n, samples, policy))
            .collect(),
        pods: input.pods.iter().map(|p| pod_record(p, samples)).collect(),
        containers: input
            .pods
            .iter()
            .flat_map(|p| container_records(p, samples))
            .collect(),
        pvcs: input
            .pvcs
            .iter()
            .map(|c| pvc_record(c, samples, policy))
            .collect(),
        services: input.services.iter().map(service_record).collect(),
    };

    snapshot.apiservices.sort_by(|a, b| a.name.cmp(&b.name));
    snapshot.namespaces.sort_by(|a, b| a.name.cmp(&b.name));
    snapshot.nodes.sort_by(|a, b| a.name.cmp(&b.name));
    snapshot.pods.sort_by(|a, b| a.name.cmp(&b.name));
    snapshot.containers.sort_by(|a, b| a.name.cmp(&b.name));
    snapshot.pvcs.sort_by(|a, b| a.name.cmp(&b.name));
    snapshot.services.sort_by(|a, b| a.name.cmp(&b.name));

    snapshot
}
