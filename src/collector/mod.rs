//! Cluster snapshot collector
//!
//! Reads the cluster through a `ControlPlane` and assembles a `ClusterSnapshot`.
//! Permission errors turn the affected slice into `Collected::Unavailable` and
//! collection continues; any other control-plane error aborts the snapshot.

pub mod extract;

use crate::config::{ClusterConfig, ContainerLookup};
use crate::kube::{ControlPlane, ControlPlaneError};
use crate::models::{
    ClusterSnapshot, ClusterSummary, Collected, ContainerInfo, ContainersByPod,
    EnvVarsByNamespace, NamespaceInfo, NamespaceMap, NodeMap, PodsByNamespace, ResourceKind,
    ServicesByNamespace, WorkloadInfo,
};
use futures::{StreamExt, TryStreamExt, stream};
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Collects cluster snapshots from a control plane
#[derive(Clone)]
pub struct Collector {
    plane: Arc<dyn ControlPlane>,
    call_timeout: Duration,
    container_lookup: ContainerLookup,
    lookup_concurrency: usize,
}

impl Collector {
    pub fn new(plane: Arc<dyn ControlPlane>, settings: &ClusterConfig) -> Self {
        Self {
            plane,
            call_timeout: settings.call_timeout(),
            container_lookup: settings.container_lookup,
            lookup_concurrency: settings.lookup_concurrency.max(1),
        }
    }

    /// Run one control-plane request under the call timeout
    async fn call<T>(
        &self,
        resource: ResourceKind,
        request: impl Future<Output = Result<T, ControlPlaneError>>,
    ) -> Result<T, ControlPlaneError> {
        tokio::time::timeout(self.call_timeout, request)
            .await
            .unwrap_or_else(|_| {
                Err(ControlPlaneError::Timeout {
                    resource,
                    after: self.call_timeout,
                })
            })
    }

    /// `call`, with permission errors absorbed into `Unavailable`
    async fn collect<T>(
        &self,
        resource: ResourceKind,
        request: impl Future<Output = Result<T, ControlPlaneError>>,
    ) -> Result<Collected<T>, ControlPlaneError> {
        absorb(self.call(resource, request).await)
    }

    async fn fetch_version(&self) -> Result<Collected<String>, ControlPlaneError> {
        self.collect(ResourceKind::Version, self.plane.server_version())
            .await
    }

    /// Control-plane version and node count
    pub async fn fetch_cluster_summary(&self) -> Result<ClusterSummary, ControlPlaneError> {
        let (version, nodes) = tokio::try_join!(
            self.fetch_version(),
            self.collect(ResourceKind::Nodes, self.plane.list_nodes()),
        )?;

        Ok(ClusterSummary {
            kubernetes_version: version,
            api_server_endpoint: self.plane.endpoint(),
            number_of_nodes: nodes.map(|list| list.len()),
        })
    }

    pub async fn fetch_nodes(&self) -> Result<Collected<NodeMap>, ControlPlaneError> {
        let nodes = self
            .collect(ResourceKind::Nodes, self.plane.list_nodes())
            .await?;
        Ok(nodes.map(|list| extract::nodes_by_name(&list)))
    }

    /// Namespaces with their quota and limit-range objects
    ///
    /// Quotas and limit ranges are listed per namespace, `lookup_concurrency`
    /// namespaces at a time.
    pub async fn fetch_namespaces(&self) -> Result<Collected<NamespaceMap>, ControlPlaneError> {
        let namespaces = self
            .collect(ResourceKind::Namespaces, self.plane.list_namespaces())
            .await?;

        let names: Vec<String> = match namespaces {
            Collected::Available(list) => list.iter().map(|ns| ns.name_any()).collect(),
            Collected::Unavailable { reason } => return Ok(Collected::Unavailable { reason }),
        };

        let infos: Vec<NamespaceInfo> = stream::iter(names)
            .map(|name| self.namespace_info(name))
            .buffered(self.lookup_concurrency)
            .try_collect()
            .await?;

        Ok(Collected::Available(
            infos
                .into_iter()
                .map(|info| (info.name.clone(), info))
                .collect(),
        ))
    }

    async fn namespace_info(&self, name: String) -> Result<NamespaceInfo, ControlPlaneError> {
        let (quotas, limits) = tokio::try_join!(
            self.collect(
                ResourceKind::ResourceQuotas,
                self.plane.list_resource_quotas(&name)
            ),
            self.collect(
                ResourceKind::LimitRanges,
                self.plane.list_limit_ranges(&name)
            ),
        )?;

        Ok(NamespaceInfo {
            resource_quotas: quotas.map(|items| extract::opaque_objects(&items)),
            limit_ranges: limits.map(|items| extract::opaque_objects(&items)),
            name,
        })
    }

    /// Item counts for every workload kind, listed concurrently
    pub async fn fetch_workloads(&self) -> Result<WorkloadInfo, ControlPlaneError> {
        let counts = futures::future::try_join_all(ResourceKind::WORKLOADS.into_iter().map(
            |kind| async move {
                let count = self
                    .collect(kind, self.plane.count_workloads(kind))
                    .await?;
                Ok::<_, ControlPlaneError>((kind, count))
            },
        ))
        .await?;

        Ok(WorkloadInfo {
            counts: counts.into_iter().collect(),
        })
    }

    pub async fn fetch_services(&self) -> Result<Collected<ServicesByNamespace>, ControlPlaneError> {
        let services = self
            .collect(ResourceKind::Services, self.plane.list_services())
            .await?;
        Ok(services.map(|list| extract::services_by_namespace(&list)))
    }

    pub async fn fetch_pods(&self) -> Result<Collected<PodsByNamespace>, ControlPlaneError> {
        let pods = self.list_pods().await?;
        Ok(pods.map(|list| extract::pods_by_namespace(&list)))
    }

    async fn list_pods(&self) -> Result<Collected<Vec<Pod>>, ControlPlaneError> {
        self.collect(ResourceKind::Pods, self.plane.list_pods())
            .await
    }

    /// Container specs for every listed pod, one live lookup per pod
    ///
    /// A pod deleted between listing and lookup yields an empty container
    /// list. Lookups run `lookup_concurrency` at a time.
    pub async fn fetch_containers(
        &self,
        pods: &PodsByNamespace,
    ) -> Result<Collected<ContainersByPod>, ControlPlaneError> {
        let targets: Vec<(String, String)> = pods
            .iter()
            .flat_map(|(namespace, list)| {
                list.iter()
                    .map(move |pod| (namespace.clone(), pod.name.clone()))
            })
            .collect();
        let colliding = extract::colliding_names(targets.iter().map(|(_, name)| name.as_str()));
        let colliding = &colliding;

        tracing::debug!("Looking up containers for {} pods", targets.len());

        let entries: Result<Vec<(String, Vec<ContainerInfo>)>, ControlPlaneError> =
            stream::iter(targets)
                .map(|(namespace, name)| async move {
                    let containers = match self
                        .call(ResourceKind::Pods, self.plane.get_pod(&namespace, &name))
                        .await
                    {
                        Ok(pod) => extract::containers_of(&pod),
                        Err(err) if err.is_not_found() => {
                            tracing::debug!("Pod {}/{} disappeared before lookup", namespace, name);
                            Vec::new()
                        }
                        Err(err) => return Err(err),
                    };
                    Ok((extract::pod_key(&namespace, &name, colliding), containers))
                })
                .buffer_unordered(self.lookup_concurrency)
                .try_collect()
                .await;

        absorb(entries.map(|entries| entries.into_iter().collect()))
    }

    pub async fn fetch_env_vars(&self) -> Result<Collected<EnvVarsByNamespace>, ControlPlaneError> {
        let pods = self.list_pods().await?;
        Ok(pods.map(|list| extract::env_vars_by_namespace(&list)))
    }

    /// Collect a full snapshot
    ///
    /// Independent slices are fetched concurrently; the first fatal error
    /// drops the remaining requests. Nodes and pods are each listed once and
    /// every slice derived from them is built from that listing.
    pub async fn snapshot(&self) -> Result<ClusterSnapshot, ControlPlaneError> {
        tracing::debug!("Collecting cluster snapshot");

        let (version, nodes, namespaces, workloads, services, pods) = tokio::try_join!(
            self.fetch_version(),
            self.collect(ResourceKind::Nodes, self.plane.list_nodes()),
            self.fetch_namespaces(),
            self.fetch_workloads(),
            self.fetch_services(),
            self.list_pods(),
        )?;

        let summary = ClusterSummary {
            kubernetes_version: version,
            api_server_endpoint: self.plane.endpoint(),
            number_of_nodes: nodes.as_ref().map(|list| list.len()),
        };

        let pods_by_namespace = pods.as_ref().map(|list| extract::pods_by_namespace(list));
        let env_vars = pods
            .as_ref()
            .map(|list| extract::env_vars_by_namespace(list));

        let containers = match (self.container_lookup, &pods_by_namespace) {
            (ContainerLookup::PerPod, Collected::Available(by_namespace)) => {
                self.fetch_containers(by_namespace).await?
            }
            _ => pods.as_ref().map(|list| extract::containers_by_pod(list)),
        };

        let mut snapshot = ClusterSnapshot {
            collected_at: chrono::Utc::now(),
            summary,
            nodes: nodes.map(|list| extract::nodes_by_name(&list)),
            namespaces,
            workloads,
            services,
            pods: pods_by_namespace,
            containers,
            env_vars,
        };
        snapshot.normalize_namespace_keys();

        tracing::info!(
            "Snapshot collected: {} namespaces, {} unavailable slices",
            snapshot.known_namespaces().len(),
            unavailable_slices(&snapshot)
        );

        Ok(snapshot)
    }
}

/// Turn a permission error into an unavailable slice; pass everything else through
fn absorb<T>(result: Result<T, ControlPlaneError>) -> Result<Collected<T>, ControlPlaneError> {
    match result {
        Ok(value) => Ok(Collected::Available(value)),
        Err(err) if err.is_permission_denied() => {
            tracing::warn!(resource = %err.resource(), "Marking slice unavailable: {}", err);
            Ok(Collected::unavailable(err.to_string()))
        }
        Err(err) => Err(err),
    }
}

fn unavailable_slices(snapshot: &ClusterSnapshot) -> usize {
    let whole = [
        snapshot.summary.kubernetes_version.is_available(),
        snapshot.summary.number_of_nodes.is_available(),
        snapshot.nodes.is_available(),
        snapshot.namespaces.is_available(),
        snapshot.services.is_available(),
        snapshot.pods.is_available(),
        snapshot.containers.is_available(),
        snapshot.env_vars.is_available(),
    ];
    let workloads = snapshot.workloads.counts.values().map(|c| c.is_available());
    whole
        .into_iter()
        .chain(workloads)
        .filter(|available| !available)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::{FileControlPlane, MockControlPlane};
    use k8s_openapi::api::core::v1::{Namespace, Node, Service};
    use serde_json::json;
    use std::collections::BTreeSet;

    const FIXTURE: &str = r#"
apiVersion: v1
kind: List
items:
  - {apiVersion: v1, kind: Node, metadata: {name: node-a}}
  - {apiVersion: v1, kind: Node, metadata: {name: node-b}}
  - {apiVersion: v1, kind: Namespace, metadata: {name: default}}
  - {apiVersion: v1, kind: Namespace, metadata: {name: empty}}
  - {apiVersion: v1, kind: Namespace, metadata: {name: shop}}
  - apiVersion: v1
    kind: ResourceQuota
    metadata: {name: compute, namespace: shop}
    spec: {hard: {pods: "10"}}
  - apiVersion: v1
    kind: Service
    metadata: {name: kubernetes, namespace: default}
    spec: {type: ClusterIP, clusterIP: 10.96.0.1}
  - apiVersion: v1
    kind: Pod
    metadata: {name: web-1, namespace: shop}
    spec:
      containers:
        - name: web
          image: nginx:1.27
          ports: [{containerPort: 80}]
          env: [{name: MODE, value: prod}]
  - apiVersion: v1
    kind: Pod
    metadata: {name: worker, namespace: shop}
    spec:
      containers: [{name: worker, image: worker:2}]
  - apiVersion: apps/v1
    kind: Deployment
    metadata: {name: web, namespace: shop}
"#;

    fn settings(lookup: ContainerLookup) -> ClusterConfig {
        ClusterConfig {
            container_lookup: lookup,
            ..Default::default()
        }
    }

    fn collector(plane: FileControlPlane, lookup: ContainerLookup) -> Collector {
        Collector::new(Arc::new(plane), &settings(lookup))
    }

    fn fixture() -> FileControlPlane {
        FileControlPlane::from_yaml_str(FIXTURE).unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_from_fixture() {
        let snapshot = collector(fixture(), ContainerLookup::Embedded)
            .snapshot()
            .await
            .unwrap();

        assert_eq!(snapshot.summary.number_of_nodes, Collected::Available(2));
        assert_eq!(
            snapshot.summary.kubernetes_version,
            Collected::Available("fixture".to_string())
        );
        assert_eq!(
            snapshot.workloads.count(ResourceKind::Deployments),
            Collected::Available(1)
        );
        assert_eq!(
            snapshot.workloads.count(ResourceKind::CronJobs),
            Collected::Available(0)
        );

        let namespaces = snapshot.namespaces.as_available().unwrap();
        assert_eq!(
            namespaces["shop"].resource_quotas.as_available().unwrap().len(),
            1
        );
        assert!(namespaces["default"].limit_ranges.as_available().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_namespace_keys_are_normalized() {
        let snapshot = collector(fixture(), ContainerLookup::Embedded)
            .snapshot()
            .await
            .unwrap();

        let pods: BTreeSet<_> = snapshot.pods.as_available().unwrap().keys().collect();
        let services: BTreeSet<_> = snapshot.services.as_available().unwrap().keys().collect();
        let env: BTreeSet<_> = snapshot.env_vars.as_available().unwrap().keys().collect();

        assert_eq!(pods, services);
        assert_eq!(pods, env);
        assert!(pods.contains(&"empty".to_string()));
        assert!(snapshot.services.as_available().unwrap()["shop"].is_empty());
    }

    #[tokio::test]
    async fn test_container_keys_match_pod_names() {
        for lookup in [ContainerLookup::Embedded, ContainerLookup::PerPod] {
            let collector = collector(fixture(), lookup);
            let pods = collector.fetch_pods().await.unwrap();
            let pods = pods.as_available().unwrap();

            let containers = collector.fetch_containers(pods).await.unwrap();
            let container_keys: BTreeSet<String> =
                containers.as_available().unwrap().keys().cloned().collect();
            let pod_names: BTreeSet<String> = pods
                .values()
                .flatten()
                .map(|pod| pod.name.clone())
                .collect();
            assert_eq!(container_keys, pod_names);

            let snapshot = collector.snapshot().await.unwrap();
            let snapshot_keys: BTreeSet<String> = snapshot
                .containers
                .as_available()
                .unwrap()
                .keys()
                .cloned()
                .collect();
            assert_eq!(snapshot_keys, pod_names, "lookup strategy {:?}", lookup);
        }
    }

    #[tokio::test]
    async fn test_per_pod_snapshot_runs_on_spawned_task() {
        // Handlers run on the multi-threaded runtime, so the future must be Send
        let collector = collector(fixture(), ContainerLookup::PerPod);
        let snapshot = tokio::spawn(async move { collector.snapshot().await })
            .await
            .unwrap()
            .unwrap();

        let containers = snapshot.containers.as_available().unwrap();
        assert_eq!(containers["web-1"][0].ports, vec![80]);
        assert_eq!(containers["worker"][0].image.as_deref(), Some("worker:2"));
    }

    #[tokio::test]
    async fn test_forbidden_services_leave_rest_intact() {
        let snapshot = collector(
            fixture().forbid(ResourceKind::Services),
            ContainerLookup::Embedded,
        )
        .snapshot()
        .await
        .unwrap();

        assert!(!snapshot.services.is_available());
        assert!(snapshot.pods.is_available());
        assert!(snapshot.nodes.is_available());
        assert!(snapshot.containers.is_available());
    }

    #[tokio::test]
    async fn test_forbidden_pods_mark_derived_slices() {
        let snapshot = collector(fixture().forbid(ResourceKind::Pods), ContainerLookup::PerPod)
            .snapshot()
            .await
            .unwrap();

        assert!(!snapshot.pods.is_available());
        assert!(!snapshot.containers.is_available());
        assert!(!snapshot.env_vars.is_available());
        assert!(snapshot.services.is_available());
    }

    #[tokio::test]
    async fn test_forbidden_quota_is_per_namespace_slice() {
        let namespaces = collector(
            fixture().forbid(ResourceKind::ResourceQuotas),
            ContainerLookup::Embedded,
        )
        .fetch_namespaces()
        .await
        .unwrap();

        let shop = &namespaces.as_available().unwrap()["shop"];
        assert!(!shop.resource_quotas.is_available());
        assert!(shop.limit_ranges.is_available());
    }

    fn permissive_mock() -> MockControlPlane {
        let mut plane = MockControlPlane::new();
        plane
            .expect_endpoint()
            .returning(|| "https://10.0.0.1:6443/".to_string());
        plane
            .expect_server_version()
            .returning(|| Ok("v1.31.2".to_string()));
        plane.expect_list_nodes().returning(|| {
            Ok(vec![
                serde_json::from_value::<Node>(json!({"metadata": {"name": "n1"}})).unwrap(),
            ])
        });
        plane.expect_list_namespaces().returning(|| {
            Ok(vec![
                serde_json::from_value::<Namespace>(json!({"metadata": {"name": "default"}}))
                    .unwrap(),
            ])
        });
        plane
            .expect_list_resource_quotas()
            .returning(|_| Ok(vec![]));
        plane.expect_list_limit_ranges().returning(|_| Ok(vec![]));
        plane.expect_count_workloads().returning(|_| Ok(0));
        plane.expect_list_pods().returning(|| Ok(vec![]));
        plane
    }

    #[tokio::test]
    async fn test_transport_error_is_fatal() {
        let mut plane = permissive_mock();
        plane.expect_list_services().returning(|| {
            Err(ControlPlaneError::transport(
                ResourceKind::Services,
                "connection refused",
            ))
        });

        let collector = Collector::new(Arc::new(plane), &settings(ContainerLookup::Embedded));
        let err = collector.snapshot().await.unwrap_err();
        assert_eq!(
            err,
            ControlPlaneError::transport(ResourceKind::Services, "connection refused")
        );
    }

    #[tokio::test]
    async fn test_permission_error_from_mock_is_absorbed() {
        let mut plane = permissive_mock();
        plane.expect_list_services().returning(|| {
            Err(ControlPlaneError::forbidden(
                ResourceKind::Services,
                "services is forbidden",
            ))
        });

        let collector = Collector::new(Arc::new(plane), &settings(ContainerLookup::Embedded));
        let snapshot = collector.snapshot().await.unwrap();
        assert_eq!(
            snapshot.services,
            Collected::unavailable("Permission denied for services: services is forbidden")
        );
        assert_eq!(snapshot.summary.number_of_nodes, Collected::Available(1));
        assert_eq!(
            snapshot.summary.api_server_endpoint,
            "https://10.0.0.1:6443/"
        );
    }

    #[tokio::test]
    async fn test_deleted_pod_yields_empty_containers() {
        let mut plane = MockControlPlane::new();
        plane.expect_get_pod().returning(|namespace, name| {
            Err(ControlPlaneError::NotFound {
                resource: ResourceKind::Pods,
                message: format!("pods \"{}\" not found in {}", name, namespace),
            })
        });

        let pods = extract::pods_by_namespace(&[serde_json::from_value::<Pod>(
            json!({"metadata": {"name": "gone", "namespace": "default"}}),
        )
        .unwrap()]);

        let collector = Collector::new(Arc::new(plane), &settings(ContainerLookup::PerPod));
        let containers = collector.fetch_containers(&pods).await.unwrap();
        assert_eq!(containers.as_available().unwrap()["gone"], Vec::new());
    }

    #[tokio::test]
    async fn test_slow_call_times_out() {
        struct Stalled;

        #[async_trait::async_trait]
        impl ControlPlane for Stalled {
            fn endpoint(&self) -> String {
                String::new()
            }
            async fn server_version(&self) -> Result<String, ControlPlaneError> {
                std::future::pending().await
            }
            async fn list_nodes(&self) -> Result<Vec<Node>, ControlPlaneError> {
                Ok(vec![])
            }
            async fn list_namespaces(&self) -> Result<Vec<Namespace>, ControlPlaneError> {
                Ok(vec![])
            }
            async fn list_resource_quotas(
                &self,
                _: &str,
            ) -> Result<Vec<k8s_openapi::api::core::v1::ResourceQuota>, ControlPlaneError>
            {
                Ok(vec![])
            }
            async fn list_limit_ranges(
                &self,
                _: &str,
            ) -> Result<Vec<k8s_openapi::api::core::v1::LimitRange>, ControlPlaneError>
            {
                Ok(vec![])
            }
            async fn list_services(&self) -> Result<Vec<Service>, ControlPlaneError> {
                Ok(vec![])
            }
            async fn list_pods(&self) -> Result<Vec<Pod>, ControlPlaneError> {
                Ok(vec![])
            }
            async fn get_pod(&self, _: &str, _: &str) -> Result<Pod, ControlPlaneError> {
                std::future::pending().await
            }
            async fn count_workloads(&self, _: ResourceKind) -> Result<usize, ControlPlaneError> {
                Ok(0)
            }
        }

        let mut config = settings(ContainerLookup::Embedded);
        config.call_timeout_secs = 1;
        let collector = Collector::new(Arc::new(Stalled), &config);

        let err = collector.fetch_cluster_summary().await.unwrap_err();
        assert!(matches!(
            err,
            ControlPlaneError::Timeout {
                resource: ResourceKind::Version,
                ..
            }
        ));
    }
}
