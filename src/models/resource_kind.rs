//! Kubernetes resource kind definitions
//!
//! Centralizes the resource kinds the collector reads so that log lines,
//! error messages and workload counts never rely on hardcoded strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Every control-plane resource the collector touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Version,
    Nodes,
    Namespaces,
    ResourceQuotas,
    LimitRanges,
    Services,
    Pods,
    Deployments,
    StatefulSets,
    DaemonSets,
    Jobs,
    CronJobs,
}

impl ResourceKind {
    /// Controller kinds counted in the workload section, in render order
    pub const WORKLOADS: [ResourceKind; 5] = [
        ResourceKind::Deployments,
        ResourceKind::StatefulSets,
        ResourceKind::DaemonSets,
        ResourceKind::Jobs,
        ResourceKind::CronJobs,
    ];

    /// Plural, lowercase name as used by kubectl
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Version => "version",
            ResourceKind::Nodes => "nodes",
            ResourceKind::Namespaces => "namespaces",
            ResourceKind::ResourceQuotas => "resourcequotas",
            ResourceKind::LimitRanges => "limitranges",
            ResourceKind::Services => "services",
            ResourceKind::Pods => "pods",
            ResourceKind::Deployments => "deployments",
            ResourceKind::StatefulSets => "statefulsets",
            ResourceKind::DaemonSets => "daemonsets",
            ResourceKind::Jobs => "jobs",
            ResourceKind::CronJobs => "cronjobs",
        }
    }

    /// Singular `kind` field value used in object manifests
    pub fn manifest_kind(&self) -> Option<&'static str> {
        match self {
            ResourceKind::Version => None,
            ResourceKind::Nodes => Some("Node"),
            ResourceKind::Namespaces => Some("Namespace"),
            ResourceKind::ResourceQuotas => Some("ResourceQuota"),
            ResourceKind::LimitRanges => Some("LimitRange"),
            ResourceKind::Services => Some("Service"),
            ResourceKind::Pods => Some("Pod"),
            ResourceKind::Deployments => Some("Deployment"),
            ResourceKind::StatefulSets => Some("StatefulSet"),
            ResourceKind::DaemonSets => Some("DaemonSet"),
            ResourceKind::Jobs => Some("Job"),
            ResourceKind::CronJobs => Some("CronJob"),
        }
    }

    /// Whether this kind is one of the counted workload controllers
    pub fn is_workload(&self) -> bool {
        Self::WORKLOADS.contains(self)
    }

    /// Look up a kind by its manifest `kind` value (e.g. "Deployment")
    pub fn from_manifest_kind(kind: &str) -> Option<Self> {
        ALL.iter()
            .copied()
            .find(|k| k.manifest_kind() == Some(kind))
    }
}

const ALL: [ResourceKind; 12] = [
    ResourceKind::Version,
    ResourceKind::Nodes,
    ResourceKind::Namespaces,
    ResourceKind::ResourceQuotas,
    ResourceKind::LimitRanges,
    ResourceKind::Services,
    ResourceKind::Pods,
    ResourceKind::Deployments,
    ResourceKind::StatefulSets,
    ResourceKind::DaemonSets,
    ResourceKind::Jobs,
    ResourceKind::CronJobs,
];

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    /// Accepts the plural form, the singular manifest kind, or common kubectl short names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_lowercase();
        let kind = match lower.as_str() {
            "version" => ResourceKind::Version,
            "nodes" | "node" | "no" => ResourceKind::Nodes,
            "namespaces" | "namespace" | "ns" => ResourceKind::Namespaces,
            "resourcequotas" | "resourcequota" | "quota" => ResourceKind::ResourceQuotas,
            "limitranges" | "limitrange" | "limits" => ResourceKind::LimitRanges,
            "services" | "service" | "svc" => ResourceKind::Services,
            "pods" | "pod" | "po" => ResourceKind::Pods,
            "deployments" | "deployment" | "deploy" => ResourceKind::Deployments,
            "statefulsets" | "statefulset" | "sts" => ResourceKind::StatefulSets,
            "daemonsets" | "daemonset" | "ds" => ResourceKind::DaemonSets,
            "jobs" | "job" => ResourceKind::Jobs,
            "cronjobs" | "cronjob" | "cj" => ResourceKind::CronJobs,
            _ => return Err(format!("Unknown resource kind: {}", s)),
        };
        Ok(kind)
    }
}
