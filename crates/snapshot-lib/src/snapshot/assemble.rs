//! Per-object record builders

use super::service::{external_ips, service_ports};
use crate::metrics::{
    aggregate_container, aggregate_node, aggregate_pod, aggregate_volume, MetricSamples,
    ObjectKey, PercentPolicy,
};
use crate::models::{
    ApiServiceRecord, ContainerRecord, NamespaceRecord, NodeRecord, PodRecord, PvcRecord,
    ServiceRecord,
};
use crate::quantity::{parse_bytes, parse_cpu};
use crate::status::{resolve_node, resolve_pod};
use k8s_openapi::api::core::v1::{Namespace, Node, PersistentVolumeClaim, Pod, Service};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use std::collections::BTreeMap;

fn name_of(meta: &ObjectMeta) -> String {
    meta.name.clone().unwrap_or_default()
}

fn namespace_of(meta: &ObjectMeta) -> String {
    meta.namespace.clone().unwrap_or_default()
}

fn created_at(meta: &ObjectMeta) -> Option<i64> {
    meta.creation_timestamp.as_ref().map(|t| t.0.timestamp())
}

fn object_key(meta: &ObjectMeta) -> ObjectKey {
    ObjectKey::new(namespace_of(meta), name_of(meta))
}

fn cpu_of(quantities: Option<&BTreeMap<String, Quantity>>) -> Option<f64> {
    quantities
        .and_then(|q| q.get("cpu"))
        .and_then(|q| parse_cpu(Some(q.0.as_str())))
}

fn bytes_of(quantities: Option<&BTreeMap<String, Quantity>>, resource: &str) -> Option<i64> {
    quantities
        .and_then(|q| q.get(resource))
        .and_then(|q| parse_bytes(Some(q.0.as_str())))
}

pub fn api_service_record(api: &APIService) -> ApiServiceRecord {
    let available = api
        .status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .into_iter()
        .flatten()
        .any(|c| c.type_ == "Available" && c.status == "True");

    let service = api
        .spec
        .as_ref()
        .and_then(|s| s.service.as_ref())
        .map(|svc| {
            format!(
                "{}/{}",
                svc.namespace.as_deref().unwrap_or_default(),
                svc.name.as_deref().unwrap_or_default()
            )
        });

    ApiServiceRecord {
        name: name_of(&api.metadata),
        available,
        service,
        creation_timestamp: created_at(&api.metadata),
    }
}

pub fn namespace_record(namespace: &Namespace) -> NamespaceRecord {
    NamespaceRecord {
        name: name_of(&namespace.metadata),
        phase: namespace.status.as_ref().and_then(|s| s.phase.clone()),
        creation_timestamp: created_at(&namespace.metadata),
    }
}

pub fn node_record(node: &Node, samples: &MetricSamples, policy: PercentPolicy) -> NodeRecord {
    let status = node.status.as_ref();
    let allocatable = status.and_then(|s| s.allocatable.as_ref());
    let capacity = status.and_then(|s| s.capacity.as_ref());
    let info = status.and_then(|s| s.node_info.as_ref());
    let state = resolve_node(node);

    NodeRecord {
        name: name_of(&node.metadata),
        creation_timestamp: created_at(&node.metadata),

        allocatable_cpu: cpu_of(allocatable),
        allocatable_memory: bytes_of(allocatable, "memory"),
        allocatable_pods: bytes_of(allocatable, "pods"),

        capacity_cpu: cpu_of(capacity),
        capacity_memory: bytes_of(capacity, "memory"),
        capacity_pods: bytes_of(capacity, "pods"),

        architecture: info.map(|i| i.architecture.clone()),
        container_runtime_version: info.map(|i| i.container_runtime_version.clone()),
        kernel_version: info.map(|i| i.kernel_version.clone()),
        kube_proxy_version: info.map(|i| i.kube_proxy_version.clone()),
        kubelet_version: info.map(|i| i.kubelet_version.clone()),
        operating_system: info.map(|i| i.operating_system.clone()),

        roles: state.roles,
        status: state.status,
        usage: aggregate_node(node, samples, policy),
    }
}

pub fn pod_record(pod: &Pod, samples: &MetricSamples) -> PodRecord {
    let key = object_key(&pod.metadata);
    let state = resolve_pod(pod);

    PodRecord {
        name: key.to_string(),
        namespace: key.namespace.clone(),
        pod_name: key.name.clone(),
        phase: pod.status.as_ref().and_then(|s| s.phase.clone()),
        creation_timestamp: created_at(&pod.metadata),

        status: state.status,
        containers: state.containers,
        ready_containers: state.ready_containers,
        restarts: state.restarts,
        last_state: state.last_state,

        usage: aggregate_pod(&key, samples),
    }
}

/// One record per container declared in the pod spec
pub fn container_records(pod: &Pod, samples: &MetricSamples) -> Vec<ContainerRecord> {
    let key = object_key(&pod.metadata);
    let pod_name = key.to_string();
    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or_default();

    pod.spec
        .iter()
        .flat_map(|s| s.containers.iter())
        .map(|container| {
            let resources = container.resources.as_ref();
            let limits = resources.and_then(|r| r.limits.as_ref());
            let requests = resources.and_then(|r| r.requests.as_ref());
            let restarts = statuses
                .iter()
                .filter(|cs| cs.name == container.name)
                .map(|cs| i64::from(cs.restart_count))
                .sum();

            ContainerRecord {
                name: format!("{}/{}", pod_name, container.name),
                container_name: container.name.clone(),
                namespace: key.namespace.clone(),
                pod: pod_name.clone(),

                limits_cpu: cpu_of(limits),
                limits_memory: bytes_of(limits, "memory"),
                requests_cpu: cpu_of(requests),
                requests_memory: bytes_of(requests, "memory"),

                restarts,
                usage: aggregate_container(&key, &container.name, samples),
            }
        })
        .collect()
}

pub fn pvc_record(
    claim: &PersistentVolumeClaim,
    samples: &MetricSamples,
    policy: PercentPolicy,
) -> PvcRecord {
    let key = object_key(&claim.metadata);
    let spec = claim.spec.as_ref();
    let status = claim.status.as_ref();

    let mut access_modes = status
        .and_then(|s| s.access_modes.clone())
        .unwrap_or_default();
    access_modes.sort();

    PvcRecord {
        name: key.to_string(),
        namespace: key.namespace.clone(),
        creation_timestamp: created_at(&claim.metadata),
        storage_class: spec.and_then(|s| s.storage_class_name.clone()),
        volume_name: spec.and_then(|s| s.volume_name.clone()),
        phase: status.and_then(|s| s.phase.clone()),
        access_modes,
        capacity: bytes_of(status.and_then(|s| s.capacity.as_ref()), "storage"),
        usage: aggregate_volume(&key, samples, policy),
    }
}

pub fn service_record(service: &Service) -> ServiceRecord {
    let key = object_key(&service.metadata);
    let spec = service.spec.as_ref();

    let cluster_ip = spec
        .and_then(|s| s.cluster_ip.as_deref())
        .filter(|ip| !ip.is_empty() && *ip != "None")
        .map(str::to_string);

    ServiceRecord {
        name: key.to_string(),
        namespace: key.namespace.clone(),
        creation_timestamp: created_at(&service.metadata),
        service_type: spec.and_then(|s| s.type_.clone()),
        cluster_ip,
        external_ips: external_ips(service),
        ports: service_ports(service),
    }
}
