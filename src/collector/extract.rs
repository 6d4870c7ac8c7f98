//! Conversion from Kubernetes API objects to snapshot model types
//!
//! Pure functions only: every collector operation lists objects once and
//! hands them here, so the same listing can feed several snapshot slices.

use crate::models::{
    ContainerInfo, ContainersByPod, EnvValue, EnvVarEntry, EnvVarsByNamespace, NodeInfo, NodeMap,
    PodEnv, PodInfo, PodsByNamespace, ServiceInfo, ServicesByNamespace, VolumeMountInfo,
};
use k8s_openapi::api::core::v1::{Container, EnvVar, Node, Pod, Service};
use kube::ResourceExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Nodes keyed by name
pub fn nodes_by_name(nodes: &[Node]) -> NodeMap {
    nodes
        .iter()
        .map(|node| {
            let info = node_info(node);
            (info.name.clone(), info)
        })
        .collect()
}

pub fn node_info(node: &Node) -> NodeInfo {
    let status = node.status.as_ref();

    let ip = status
        .and_then(|s| s.addresses.as_ref())
        .and_then(|addresses| addresses.first())
        .map(|address| address.address.clone());

    let capacity = status
        .and_then(|s| s.capacity.as_ref())
        .map(|capacity| {
            capacity
                .iter()
                .map(|(name, quantity)| (name.clone(), quantity.0.clone()))
                .collect()
        })
        .unwrap_or_default();

    let conditions = status
        .and_then(|s| s.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .map(|c| (c.type_.clone(), c.status.clone()))
                .collect()
        })
        .unwrap_or_default();

    NodeInfo {
        name: node.name_any(),
        ip,
        capacity,
        conditions,
        labels: node.labels().clone(),
    }
}

/// Reduce an API object to its name plus payload for the prompt.
///
/// Drops `apiVersion`, `kind` and the bulky metadata block (managed fields,
/// uids, timestamps); the object's name is kept as a top-level `name`.
pub fn opaque_object<T: Serialize>(item: &T) -> Value {
    let mut value = serde_json::to_value(item).unwrap_or_default();
    if let Some(object) = value.as_object_mut() {
        let name = object
            .get("metadata")
            .and_then(|m| m.get("name"))
            .cloned();
        object.remove("metadata");
        object.remove("apiVersion");
        object.remove("kind");
        if let Some(name) = name {
            object.insert("name".to_string(), name);
        }
    }
    value
}

pub fn opaque_objects<T: Serialize>(items: &[T]) -> Vec<Value> {
    items.iter().map(opaque_object).collect()
}

/// Services grouped by namespace, sorted by name within each namespace
pub fn services_by_namespace(services: &[Service]) -> ServicesByNamespace {
    let mut grouped: ServicesByNamespace = BTreeMap::new();
    for service in services {
        let namespace = service.namespace().unwrap_or_default();
        let spec = service.spec.as_ref();
        grouped
            .entry(namespace.clone())
            .or_default()
            .push(ServiceInfo {
                name: service.name_any(),
                namespace,
                service_type: spec.and_then(|s| s.type_.clone()),
                cluster_ip: spec.and_then(|s| s.cluster_ip.clone()),
            });
    }
    for list in grouped.values_mut() {
        list.sort_by(|a, b| a.name.cmp(&b.name));
    }
    grouped
}

/// Pods grouped by namespace, sorted by name within each namespace
pub fn pods_by_namespace(pods: &[Pod]) -> PodsByNamespace {
    let mut grouped: PodsByNamespace = BTreeMap::new();
    for pod in pods {
        let info = pod_info(pod);
        grouped.entry(info.namespace.clone()).or_default().push(info);
    }
    for list in grouped.values_mut() {
        list.sort_by(|a, b| a.name.cmp(&b.name));
    }
    grouped
}

pub fn pod_info(pod: &Pod) -> PodInfo {
    let spec = pod.spec.as_ref();
    let containers: &[Container] = spec.map(|s| s.containers.as_slice()).unwrap_or_default();

    let env_vars = containers
        .iter()
        .flat_map(|c| c.env.iter().flatten())
        .map(|var| EnvVarEntry {
            name: var.name.clone(),
            value: env_value(var),
        })
        .collect();

    let volume_mounts = containers
        .iter()
        .flat_map(|c| {
            c.volume_mounts
                .iter()
                .flatten()
                .map(move |mount| VolumeMountInfo {
                    container: c.name.clone(),
                    mount_path: mount.mount_path.clone(),
                })
        })
        .collect();

    PodInfo {
        name: pod.name_any(),
        namespace: pod.namespace().unwrap_or_default(),
        qos_class: pod.status.as_ref().and_then(|s| s.qos_class.clone()),
        restart_policy: spec.and_then(|s| s.restart_policy.clone()),
        init_containers: spec
            .and_then(|s| s.init_containers.as_ref())
            .map(|c| c.len())
            .unwrap_or(0),
        env_vars,
        volume_mounts,
    }
}

/// Where an env var's value comes from; referenced values are never resolved
pub fn env_value(var: &EnvVar) -> EnvValue {
    if let Some(value) = &var.value {
        return EnvValue::Literal(value.clone());
    }
    match &var.value_from {
        Some(source) if source.secret_key_ref.is_some() => EnvValue::Secret,
        Some(source) if source.config_map_key_ref.is_some() => EnvValue::ConfigMap,
        Some(source) if source.field_ref.is_some() => EnvValue::Field,
        Some(source) if source.resource_field_ref.is_some() => EnvValue::Resource,
        _ => EnvValue::Unset,
    }
}

/// Container specs of one pod
pub fn containers_of(pod: &Pod) -> Vec<ContainerInfo> {
    pod.spec
        .as_ref()
        .map(|spec| {
            spec.containers
                .iter()
                .map(|c| ContainerInfo {
                    name: c.name.clone(),
                    image: c.image.clone(),
                    ports: c
                        .ports
                        .iter()
                        .flatten()
                        .map(|p| p.container_port)
                        .collect(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Pod names that occur in more than one namespace
pub fn colliding_names<'a>(names: impl IntoIterator<Item = &'a str>) -> HashSet<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in names {
        *counts.entry(name).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Key of a pod in the container map: the bare name, or `namespace/name`
/// when the name is not unique across namespaces
pub fn pod_key(namespace: &str, name: &str, colliding: &HashSet<String>) -> String {
    if colliding.contains(name) {
        format!("{}/{}", namespace, name)
    } else {
        name.to_string()
    }
}

/// Container specs keyed by owning pod, read from a pod listing
pub fn containers_by_pod(pods: &[Pod]) -> ContainersByPod {
    let names: Vec<String> = pods.iter().map(|p| p.name_any()).collect();
    let colliding = colliding_names(names.iter().map(String::as_str));

    pods.iter()
        .map(|pod| {
            let key = pod_key(
                &pod.namespace().unwrap_or_default(),
                &pod.name_any(),
                &colliding,
            );
            (key, containers_of(pod))
        })
        .collect()
}

/// Per-pod environment, merged across containers, grouped by namespace
pub fn env_vars_by_namespace(pods: &[Pod]) -> EnvVarsByNamespace {
    let mut grouped: EnvVarsByNamespace = BTreeMap::new();
    for pod in pods {
        let env_vars = pod
            .spec
            .iter()
            .flat_map(|spec| spec.containers.iter())
            .flat_map(|c| c.env.iter().flatten())
            .map(|var| (var.name.clone(), env_value(var)))
            .collect();

        grouped
            .entry(pod.namespace().unwrap_or_default())
            .or_default()
            .push(PodEnv {
                pod_name: pod.name_any(),
                env_vars,
            });
    }
    for list in grouped.values_mut() {
        list.sort_by(|a, b| a.pod_name.cmp(&b.pod_name));
    }
    grouped
}
