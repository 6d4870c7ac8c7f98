//! File-backed control plane
//!
//! Serves objects from a YAML dump (e.g. `kubectl get nodes,ns,pods,svc,deploy -A -o yaml`)
//! instead of a live API server. Useful for offline demos and tests.

use super::error::ControlPlaneError;
use super::plane::ControlPlane;
use crate::models::ResourceKind;
use anyhow::{Context, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{LimitRange, Namespace, Node, Pod, ResourceQuota, Service};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

const FIXTURE_VERSION: &str = "fixture";

/// Control plane that answers from an in-memory set of Kubernetes objects
#[derive(Debug, Clone, Default)]
pub struct FileControlPlane {
    endpoint: String,
    nodes: Vec<Node>,
    namespaces: Vec<Namespace>,
    resource_quotas: Vec<ResourceQuota>,
    limit_ranges: Vec<LimitRange>,
    services: Vec<Service>,
    pods: Vec<Pod>,
    workload_counts: BTreeMap<ResourceKind, usize>,
    forbidden: BTreeSet<ResourceKind>,
}

impl FileControlPlane {
    /// Load objects from a YAML file
    ///
    /// The file may hold a `kind: List` document, several `---` separated
    /// documents, or both. Objects of kinds the collector does not read are
    /// skipped.
    pub fn from_path(path: &Path) -> Result<Self> {
        tracing::debug!("Loading control-plane fixture: {:?}", path);

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture file: {:?}", path))?;

        let plane = Self::from_yaml_str(&content)
            .with_context(|| format!("Failed to parse fixture file: {:?}", path))?;

        Ok(plane.with_endpoint(format!("file://{}", path.display())))
    }

    /// Parse objects from YAML text
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let mut objects = Vec::new();
        for document in serde_yaml::Deserializer::from_str(content) {
            let value = serde_yaml::Value::deserialize(document)
                .context("Invalid YAML document")?;
            if value.is_null() {
                continue;
            }
            let json = serde_json::to_value(value).context("Fixture is not JSON-compatible")?;
            objects.push(json);
        }
        Self::from_objects(objects)
    }

    /// Build from already-parsed objects
    pub fn from_objects(objects: impl IntoIterator<Item = Value>) -> Result<Self> {
        let mut plane = Self {
            endpoint: "file://fixture".to_string(),
            ..Default::default()
        };

        for object in objects {
            plane.add_object(object)?;
        }

        tracing::debug!(
            "Fixture loaded: {} nodes, {} namespaces, {} pods, {} services",
            plane.nodes.len(),
            plane.namespaces.len(),
            plane.pods.len(),
            plane.services.len()
        );

        Ok(plane)
    }

    fn add_object(&mut self, object: Value) -> Result<()> {
        let kind = object
            .get("kind")
            .and_then(|k| k.as_str())
            .context("Object without a kind field")?
            .to_string();

        if kind == "List" {
            let items = object
                .get("items")
                .and_then(|i| i.as_array())
                .cloned()
                .unwrap_or_default();
            for item in items {
                self.add_object(item)?;
            }
            return Ok(());
        }

        let Some(resource) = ResourceKind::from_manifest_kind(&kind) else {
            tracing::debug!("Skipping fixture object of kind {}", kind);
            return Ok(());
        };

        match resource {
            ResourceKind::Nodes => self.nodes.push(decode(object, &kind)?),
            ResourceKind::Namespaces => self.namespaces.push(decode(object, &kind)?),
            ResourceKind::ResourceQuotas => self.resource_quotas.push(decode(object, &kind)?),
            ResourceKind::LimitRanges => self.limit_ranges.push(decode(object, &kind)?),
            ResourceKind::Services => self.services.push(decode(object, &kind)?),
            ResourceKind::Pods => self.pods.push(decode(object, &kind)?),
            workload if workload.is_workload() => {
                *self.workload_counts.entry(workload).or_insert(0) += 1;
            }
            _ => {}
        }

        Ok(())
    }

    /// Override the endpoint reported in the cluster summary
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Answer every request for `kind` with a permission error, as RBAC would
    pub fn forbid(mut self, kind: ResourceKind) -> Self {
        self.forbidden.insert(kind);
        self
    }

    fn check(&self, kind: ResourceKind) -> Result<(), ControlPlaneError> {
        if self.forbidden.contains(&kind) {
            return Err(ControlPlaneError::forbidden(
                kind,
                format!("{} is forbidden by fixture", kind),
            ));
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(object: Value, kind: &str) -> Result<T> {
    serde_json::from_value(object).with_context(|| format!("Invalid {} object", kind))
}

fn in_namespace<'a, T: kube::ResourceExt + 'a>(
    items: &'a [T],
    namespace: &'a str,
) -> impl Iterator<Item = &'a T> + 'a {
    items
        .iter()
        .filter(move |item| item.namespace().as_deref() == Some(namespace))
}

#[async_trait]
impl ControlPlane for FileControlPlane {
    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }

    async fn server_version(&self) -> Result<String, ControlPlaneError> {
        self.check(ResourceKind::Version)?;
        Ok(FIXTURE_VERSION.to_string())
    }

    async fn list_nodes(&self) -> Result<Vec<Node>, ControlPlaneError> {
        self.check(ResourceKind::Nodes)?;
        Ok(self.nodes.clone())
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>, ControlPlaneError> {
        self.check(ResourceKind::Namespaces)?;
        Ok(self.namespaces.clone())
    }

    async fn list_resource_quotas(
        &self,
        namespace: &str,
    ) -> Result<Vec<ResourceQuota>, ControlPlaneError> {
        self.check(ResourceKind::ResourceQuotas)?;
        Ok(in_namespace(&self.resource_quotas, namespace)
            .cloned()
            .collect())
    }

    async fn list_limit_ranges(
        &self,
        namespace: &str,
    ) -> Result<Vec<LimitRange>, ControlPlaneError> {
        self.check(ResourceKind::LimitRanges)?;
        Ok(in_namespace(&self.limit_ranges, namespace)
            .cloned()
            .collect())
    }

    async fn list_services(&self) -> Result<Vec<Service>, ControlPlaneError> {
        self.check(ResourceKind::Services)?;
        Ok(self.services.clone())
    }

    async fn list_pods(&self) -> Result<Vec<Pod>, ControlPlaneError> {
        self.check(ResourceKind::Pods)?;
        Ok(self.pods.clone())
    }

    async fn get_pod(&self, namespace: &str, name: &str) -> Result<Pod, ControlPlaneError> {
        self.check(ResourceKind::Pods)?;
        in_namespace(&self.pods, namespace)
            .find(|pod| pod.metadata.name.as_deref() == Some(name))
            .cloned()
            .ok_or_else(|| ControlPlaneError::NotFound {
                resource: ResourceKind::Pods,
                message: format!("pods \"{}\" not found in {}", name, namespace),
            })
    }

    async fn count_workloads(&self, kind: ResourceKind) -> Result<usize, ControlPlaneError> {
        if !kind.is_workload() {
            return Err(ControlPlaneError::NotWorkload { resource: kind });
        }
        self.check(kind)?;
        Ok(self.workload_counts.get(&kind).copied().unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
apiVersion: v1
kind: List
items:
  - apiVersion: v1
    kind: Node
    metadata:
      name: node-a
  - apiVersion: v1
    kind: Namespace
    metadata:
      name: default
  - apiVersion: apps/v1
    kind: Deployment
    metadata:
      name: web
      namespace: default
---
apiVersion: v1
kind: Pod
metadata:
  name: web-1
  namespace: default
spec:
  containers:
    - name: web
      image: nginx:1.27
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: ignored
  namespace: default
"#;

    #[tokio::test]
    async fn test_parses_lists_and_documents() {
        let plane = FileControlPlane::from_yaml_str(FIXTURE).unwrap();

        assert_eq!(plane.list_nodes().await.unwrap().len(), 1);
        assert_eq!(plane.list_namespaces().await.unwrap().len(), 1);
        assert_eq!(plane.list_pods().await.unwrap().len(), 1);
        assert_eq!(
            plane
                .count_workloads(ResourceKind::Deployments)
                .await
                .unwrap(),
            1
        );
        assert_eq!(plane.count_workloads(ResourceKind::Jobs).await.unwrap(), 0);
        assert_eq!(plane.server_version().await.unwrap(), "fixture");
    }

    #[tokio::test]
    async fn test_get_pod_by_namespace_and_name() {
        let plane = FileControlPlane::from_yaml_str(FIXTURE).unwrap();

        let pod = plane.get_pod("default", "web-1").await.unwrap();
        assert_eq!(pod.metadata.name.as_deref(), Some("web-1"));

        let missing = plane.get_pod("kube-system", "web-1").await.unwrap_err();
        assert!(missing.is_not_found());
    }

    #[tokio::test]
    async fn test_forbidden_kind() {
        let plane = FileControlPlane::from_yaml_str(FIXTURE)
            .unwrap()
            .forbid(ResourceKind::Services);

        let err = plane.list_services().await.unwrap_err();
        assert!(err.is_permission_denied());
        assert!(plane.list_pods().await.is_ok());
    }

    #[tokio::test]
    async fn test_count_rejects_non_workload_kind() {
        let plane = FileControlPlane::default();
        let err = plane.count_workloads(ResourceKind::Pods).await.unwrap_err();
        assert!(matches!(err, ControlPlaneError::NotWorkload { .. }));
    }

    #[test]
    fn test_object_without_kind_is_rejected() {
        let result = FileControlPlane::from_yaml_str("metadata:\n  name: nothing\n");
        assert!(result.is_err());
    }
}
