//! Cluster access through the Kubernetes API

use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Namespace, Node, PersistentVolumeClaim, Pod, Service};
use k8s_openapi::kube_aggregator::pkg::apis::apiregistration::v1::APIService;
use kube::api::{Api, ListParams};
use kube::{Client, Config};
use serde::de::DeserializeOwned;
use snapshot_lib::metrics::{NodeMetricsList, PodMetricsList, StatsSummary};
use snapshot_lib::{ClusterSource, SourceError};
use std::fmt::Debug;
use tracing::{debug, info};

const NODE_METRICS_PATH: &str = "/apis/metrics.k8s.io/v1beta1/nodes";
const POD_METRICS_PATH: &str = "/apis/metrics.k8s.io/v1beta1/pods";

/// [`ClusterSource`] backed by a `kube` client.
///
/// Volume statistics go through the node proxy and need `get` on
/// `nodes/proxy` in the core API group.
pub struct KubeSource {
    client: Client,
}

impl KubeSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect with the in-cluster service account or the local kubeconfig
    pub async fn connect(in_cluster: bool) -> Result<Self> {
        let config = if in_cluster {
            Config::incluster().context("Failed to load in-cluster configuration")?
        } else {
            Config::infer()
                .await
                .context("Failed to load kubeconfig")?
        };
        info!(cluster_url = %config.cluster_url, in_cluster, "Connecting to cluster");

        let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
        Ok(Self::new(client))
    }

    async fn list_all<K>(&self, kind: &'static str) -> Result<Vec<K>, SourceError>
    where
        K: kube::Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
    {
        let api: Api<K> = Api::all(self.client.clone());
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| SourceError::Api {
                kind,
                message: e.to_string(),
            })?;

        debug!(kind, count = list.items.len(), "Listed cluster objects");
        Ok(list.items)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        let metrics_error = |message: String| SourceError::Metrics {
            endpoint: path.to_string(),
            message,
        };

        let request = http::Request::get(path)
            .body(Vec::new())
            .map_err(|e| metrics_error(e.to_string()))?;
        let text = self
            .client
            .request_text(request)
            .await
            .map_err(|e| metrics_error(e.to_string()))?;

        serde_json::from_str(&text).map_err(|source| SourceError::Decode {
            what: path.to_string(),
            source,
        })
    }
}

#[async_trait]
impl ClusterSource for KubeSource {
    async fn list_api_services(&self) -> Result<Vec<APIService>, SourceError> {
        self.list_all("apiservices").await
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, SourceError> {
        self.list_all("namespaces").await
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, SourceError> {
        self.list_all("nodes").await
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, SourceError> {
        self.list_all("pods").await
    }

    async fn list_pvcs(&self) -> Result<Vec<PersistentVolumeClaim>, SourceError> {
        self.list_all("persistentvolumeclaims").await
    }

    async fn list_services(&self) -> Result<Vec<Service>, SourceError> {
        self.list_all("services").await
    }

    async fn node_metrics(&self) -> Result<NodeMetricsList, SourceError> {
        self.get_json(NODE_METRICS_PATH).await
    }

    async fn pod_metrics(&self) -> Result<PodMetricsList, SourceError> {
        self.get_json(POD_METRICS_PATH).await
    }

    async fn node_stats_summary(&self, node: &str) -> Result<StatsSummary, SourceError> {
        self.get_json(&stats_summary_path(node)).await
    }
}

fn stats_summary_path(node: &str) -> String {
    format!("/api/v1/nodes/{node}/proxy/stats/summary")
}
