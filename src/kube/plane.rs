//! Control-plane client abstraction
//!
//! The collector only talks to the cluster through `ControlPlane`, which
//! keeps it independent of kube-rs and lets tests and offline runs swap in
//! a different source of objects.

use super::error::ControlPlaneError;
use crate::models::ResourceKind;
use async_trait::async_trait;
use k8s_openapi::NamespaceResourceScope;
use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, StatefulSet};
use k8s_openapi::api::batch::v1::{CronJob, Job};
use k8s_openapi::api::core::v1::{LimitRange, Namespace, Node, Pod, ResourceQuota, Service};
use kube::api::ListParams;
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// List/get operations the snapshot collector needs from a control plane
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// API server endpoint shown in the cluster summary
    fn endpoint(&self) -> String;

    /// Control-plane version string (e.g. "v1.31.2")
    async fn server_version(&self) -> Result<String, ControlPlaneError>;

    async fn list_nodes(&self) -> Result<Vec<Node>, ControlPlaneError>;

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ControlPlaneError>;

    async fn list_resource_quotas(
        &self,
        namespace: &str,
    ) -> Result<Vec<ResourceQuota>, ControlPlaneError>;

    async fn list_limit_ranges(
        &self,
        namespace: &str,
    ) -> Result<Vec<LimitRange>, ControlPlaneError>;

    /// Services across all namespaces
    async fn list_services(&self) -> Result<Vec<Service>, ControlPlaneError>;

    /// Pods across all namespaces
    async fn list_pods(&self) -> Result<Vec<Pod>, ControlPlaneError>;

    /// Live spec of a single pod
    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ControlPlaneError>;

    /// Number of objects of a workload kind across all namespaces
    async fn count_workloads(&self, kind: ResourceKind) -> Result<usize, ControlPlaneError>;
}

/// `ControlPlane` backed by a live cluster through kube-rs
#[derive(Clone)]
pub struct KubeControlPlane {
    client: Client,
    endpoint: String,
}

impl KubeControlPlane {
    pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    async fn list_all<K>(&self, kind: ResourceKind) -> Result<Vec<K>, ControlPlaneError>
    where
        K: kube::Resource + Clone + DeserializeOwned + Debug,
        <K as kube::Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        api.list(&ListParams::default())
            .await
            .map(|list| list.items)
            .map_err(|e| ControlPlaneError::from_kube(kind, e))
    }

    async fn list_in<K>(
        &self,
        kind: ResourceKind,
        namespace: &str,
    ) -> Result<Vec<K>, ControlPlaneError>
    where
        K: kube::Resource<Scope = NamespaceResourceScope> + Clone + DeserializeOwned + Debug,
        <K as kube::Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::namespaced(self.client.clone(), namespace);
        api.list(&ListParams::default())
            .await
            .map(|list| list.items)
            .map_err(|e| ControlPlaneError::from_kube(kind, e))
    }

    /// Count objects using a metadata-only list
    async fn count_all<K>(&self, kind: ResourceKind) -> Result<usize, ControlPlaneError>
    where
        K: kube::Resource + Clone + DeserializeOwned + Debug,
        <K as kube::Resource>::DynamicType: Default,
    {
        let api: Api<K> = Api::all(self.client.clone());
        api.list_metadata(&ListParams::default())
            .await
            .map(|list| list.items.len())
            .map_err(|e| ControlPlaneError::from_kube(kind, e))
    }
}

#[async_trait]
impl ControlPlane for KubeControlPlane {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    async fn server_version(&self) -> Result<String, ControlPlaneError> {
        self.client
            .apiserver_version()
            .await
            .map(|info| info.git_version)
            .map_err(|e| ControlPlaneError::from_kube(ResourceKind::Version, e))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ControlPlaneError> {
        self.list_all::<Node>(ResourceKind::Nodes).await
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ControlPlaneError> {
        self.list_all::<Namespace>(ResourceKind::Namespaces).await
    }

    async fn list_resource_quotas(
        &self,
        namespace: &str,
    ) -> Result<Vec<ResourceQuota>, ControlPlaneError> {
        self.list_in::<ResourceQuota>(ResourceKind::ResourceQuotas, namespace)
            .await
    }

    async fn list_limit_ranges(
        &self,
        namespace: &str,
    ) -> Result<Vec<LimitRange>, ControlPlaneError> {
        self.list_in::<LimitRange>(ResourceKind::LimitRanges, namespace)
            .await
    }

    async fn list_services(&self) -> Result<Vec<Service>, ControlPlaneError> {
        self.list_all::<Service>(ResourceKind::Services).await
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, ControlPlaneError> {
        self.list_all::<Pod>(ResourceKind::Pods).await
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ControlPlaneError> {
        let api: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
        api.get(name)
            .await
            .map_err(|e| ControlPlaneError::from_kube(ResourceKind::Pods, e))
    }

    async fn count_workloads(&self, kind: ResourceKind) -> Result<usize, ControlPlaneError> {
        match kind {
            ResourceKind::Deployments => self.count_all::<Deployment>(kind).await,
            ResourceKind::StatefulSets => self.count_all::<StatefulSet>(kind).await,
            ResourceKind::DaemonSets => self.count_all::<DaemonSet>(kind).await,
            ResourceKind::Jobs => self.count_all::<Job>(kind).await,
            ResourceKind::CronJobs => self.count_all::<CronJob>(kind).await,
            other => Err(ControlPlaneError::NotWorkload { resource: other }),
        }
    }
}
