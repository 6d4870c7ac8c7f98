//! Cluster snapshot types
//!
//! A `ClusterSnapshot` is a point-in-time, read-only description of the
//! cluster. It is rebuilt from scratch for every query and discarded after
//! the prompt has been rendered. All maps are `BTreeMap` so iteration order
//! is stable and rendering is deterministic.

use super::ResourceKind;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Outcome of collecting one slice of the snapshot.
///
/// `Unavailable` means the control plane refused to hand the data out
/// (permission denied). It is deliberately distinct from an empty collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "lowercase")]
pub enum Collected<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> Collected<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Collected::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Collected::Available(_))
    }

    pub fn as_available(&self) -> Option<&T> {
        match self {
            Collected::Available(value) => Some(value),
            Collected::Unavailable { .. } => None,
        }
    }

    pub fn as_available_mut(&mut self) -> Option<&mut T> {
        match self {
            Collected::Available(value) => Some(value),
            Collected::Unavailable { .. } => None,
        }
    }

    pub fn as_ref(&self) -> Collected<&T> {
        match self {
            Collected::Available(value) => Collected::Available(value),
            Collected::Unavailable { reason } => Collected::Unavailable {
                reason: reason.clone(),
            },
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Collected<U> {
        match self {
            Collected::Available(value) => Collected::Available(f(value)),
            Collected::Unavailable { reason } => Collected::Unavailable { reason },
        }
    }
}

/// Control-plane version and topology
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub kubernetes_version: Collected<String>,
    pub api_server_endpoint: String,
    pub number_of_nodes: Collected<usize>,
}

/// One cluster node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeInfo {
    pub name: String,
    /// First address reported in the node status, if any
    pub ip: Option<String>,
    pub capacity: BTreeMap<String, String>,
    pub conditions: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

/// One namespace with its quota and limit-range objects kept opaque
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamespaceInfo {
    pub name: String,
    pub resource_quotas: Collected<Vec<Value>>,
    pub limit_ranges: Collected<Vec<Value>>,
}

/// Item counts per workload controller kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkloadInfo {
    pub counts: BTreeMap<ResourceKind, Collected<usize>>,
}

impl WorkloadInfo {
    /// Count for a kind; kinds never collected read as unavailable
    pub fn count(&self, kind: ResourceKind) -> Collected<usize> {
        self.counts
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Collected::unavailable(format!("{} not collected", kind)))
    }
}

/// One service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceInfo {
    pub name: String,
    pub namespace: String,
    pub service_type: Option<String>,
    pub cluster_ip: Option<String>,
}

/// Where an environment variable gets its value from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "lowercase")]
pub enum EnvValue {
    Literal(String),
    Secret,
    ConfigMap,
    Field,
    Resource,
    Unset,
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::Literal(value) => f.write_str(value),
            EnvValue::Secret => f.write_str("<from secret>"),
            EnvValue::ConfigMap => f.write_str("<from configmap>"),
            EnvValue::Field => f.write_str("<from field>"),
            EnvValue::Resource => f.write_str("<from resource>"),
            EnvValue::Unset => f.write_str("<unset>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvVarEntry {
    pub name: String,
    pub value: EnvValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeMountInfo {
    pub container: String,
    pub mount_path: String,
}

/// One pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodInfo {
    pub name: String,
    pub namespace: String,
    pub qos_class: Option<String>,
    pub restart_policy: Option<String>,
    pub init_containers: usize,
    pub env_vars: Vec<EnvVarEntry>,
    pub volume_mounts: Vec<VolumeMountInfo>,
}

/// One container within a pod
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerInfo {
    pub name: String,
    pub image: Option<String>,
    pub ports: Vec<i32>,
}

/// Environment of a single pod, merged across its containers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PodEnv {
    pub pod_name: String,
    pub env_vars: BTreeMap<String, EnvValue>,
}

pub type NodeMap = BTreeMap<String, NodeInfo>;
pub type NamespaceMap = BTreeMap<String, NamespaceInfo>;
pub type ServicesByNamespace = BTreeMap<String, Vec<ServiceInfo>>;
pub type PodsByNamespace = BTreeMap<String, Vec<PodInfo>>;
pub type ContainersByPod = BTreeMap<String, Vec<ContainerInfo>>;
pub type EnvVarsByNamespace = BTreeMap<String, Vec<PodEnv>>;

/// Aggregate root handed from the collector to the prompt composer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSnapshot {
    /// Collection time; serialized for inspection, never rendered
    pub collected_at: DateTime<Utc>,
    pub summary: ClusterSummary,
    pub nodes: Collected<NodeMap>,
    pub namespaces: Collected<NamespaceMap>,
    pub workloads: WorkloadInfo,
    pub services: Collected<ServicesByNamespace>,
    pub pods: Collected<PodsByNamespace>,
    pub containers: Collected<ContainersByPod>,
    pub env_vars: Collected<EnvVarsByNamespace>,
}

impl ClusterSnapshot {
    /// Every namespace the snapshot knows about, from any namespace-keyed slice
    pub fn known_namespaces(&self) -> BTreeSet<String> {
        let mut namespaces = BTreeSet::new();
        if let Some(map) = self.namespaces.as_available() {
            namespaces.extend(map.keys().cloned());
        }
        if let Some(map) = self.pods.as_available() {
            namespaces.extend(map.keys().cloned());
        }
        if let Some(map) = self.services.as_available() {
            namespaces.extend(map.keys().cloned());
        }
        if let Some(map) = self.env_vars.as_available() {
            namespaces.extend(map.keys().cloned());
        }
        namespaces
    }

    /// Give `pods`, `services` and `env_vars` the same namespace key set.
    ///
    /// A namespace with nothing in it gets an empty list instead of a
    /// missing key. Unavailable slices are left untouched.
    pub fn normalize_namespace_keys(&mut self) {
        let namespaces = self.known_namespaces();
        fill_missing(&mut self.pods, &namespaces);
        fill_missing(&mut self.services, &namespaces);
        fill_missing(&mut self.env_vars, &namespaces);
    }
}

fn fill_missing<T>(slice: &mut Collected<BTreeMap<String, Vec<T>>>, keys: &BTreeSet<String>) {
    if let Some(map) = slice.as_available_mut() {
        for key in keys {
            map.entry(key.clone()).or_default();
        }
    }
}
