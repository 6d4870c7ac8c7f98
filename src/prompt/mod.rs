//! Prompt composition
//!
//! Renders a `ClusterSnapshot` and a user query into the text prompt sent to
//! the completion model. Rendering is pure: the same snapshot and query
//! always produce the same bytes.

use crate::config::PromptConfig;
use crate::constants::{NOT_AVAILABLE, UNAVAILABLE_MARKER};
use crate::llm::ChatMessage;
use crate::models::{
    ClusterSnapshot, Collected, ContainerInfo, EnvValue, NamespaceInfo, NodeInfo, PodEnv, PodInfo,
    ResourceKind, ServiceInfo,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Display;

/// Caller-supplied rendering policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Cut each section after this many lines
    pub max_items_per_section: Option<usize>,
}

/// Builds prompts and chat messages from snapshots
#[derive(Debug, Clone)]
pub struct PromptComposer {
    instruction: String,
    system_message: String,
    options: RenderOptions,
}

impl PromptComposer {
    pub fn new(settings: &PromptConfig) -> Self {
        Self {
            instruction: settings.instruction.clone(),
            system_message: settings.system_message.clone(),
            options: RenderOptions {
                max_items_per_section: settings.max_items_per_section,
            },
        }
    }

    pub fn render(&self, snapshot: &ClusterSnapshot, query: &str) -> String {
        render(snapshot, query, &self.instruction, &self.options)
    }

    /// System message followed by the rendered prompt
    pub fn messages(&self, snapshot: &ClusterSnapshot, query: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.system_message.clone()),
            ChatMessage::user(self.render(snapshot, query)),
        ]
    }
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self::new(&PromptConfig::default())
    }
}

/// Render the full prompt
///
/// The instruction header also restates the query, which is repeated on
/// the final line. Sections appear in a fixed order, each a heading followed by
/// `- <key>: <value>` lines. An unavailable slice renders as a single
/// `- [unavailable]` line; an empty slice renders the heading alone.
pub fn render(
    snapshot: &ClusterSnapshot,
    query: &str,
    instruction: &str,
    options: &RenderOptions,
) -> String {
    let limit = options.max_items_per_section;

    let sections = [
        format!("{}\nThe user asked: '{}'", instruction, query),
        summary_section(snapshot),
        section(
            "Nodes",
            lines(&snapshot.nodes, |nodes| nodes.values().map(node_line).collect()),
            limit,
        ),
        section(
            "Namespaces",
            lines(&snapshot.namespaces, |namespaces| {
                namespaces.values().map(namespace_line).collect()
            }),
            limit,
        ),
        section(
            "Workloads",
            Collected::Available(
                ResourceKind::WORKLOADS
                    .iter()
                    .map(|&kind| workload_line(kind, &snapshot.workloads.count(kind)))
                    .collect(),
            ),
            limit,
        ),
        section(
            "Services",
            lines(&snapshot.services, |services| {
                services
                    .iter()
                    .map(|(namespace, list)| keyed(namespace, list_of(list, service_summary)))
                    .collect()
            }),
            limit,
        ),
        section(
            "Pods",
            lines(&snapshot.pods, |pods| {
                pods.iter()
                    .map(|(namespace, list)| keyed(namespace, list_of(list, pod_summary)))
                    .collect()
            }),
            limit,
        ),
        section(
            "Containers",
            lines(&snapshot.containers, |containers| {
                containers
                    .iter()
                    .map(|(pod, list)| keyed(pod, list_of(list, container_summary)))
                    .collect()
            }),
            limit,
        ),
        section(
            "Environment Variables",
            lines(&snapshot.env_vars, |env_vars| {
                env_vars
                    .iter()
                    .map(|(namespace, list)| keyed(namespace, list_of(list, pod_env_summary)))
                    .collect()
            }),
            limit,
        ),
        format!("Query: {}", query),
    ];

    sections.join("\n\n")
}

fn summary_section(snapshot: &ClusterSnapshot) -> String {
    let summary = &snapshot.summary;
    [
        "Cluster Summary:".to_string(),
        keyed("Kubernetes Version", value_or_marker(&summary.kubernetes_version)),
        keyed("API Server Endpoint", &summary.api_server_endpoint),
        keyed("Number of Nodes", value_or_marker(&summary.number_of_nodes)),
    ]
    .join("\n")
}

fn section(heading: &str, body: Collected<Vec<String>>, limit: Option<usize>) -> String {
    let mut out = format!("{}:", heading);
    let mut body = match body {
        Collected::Available(lines) => lines,
        Collected::Unavailable { .. } => vec![format!("- {}", UNAVAILABLE_MARKER)],
    };

    if let Some(limit) = limit {
        if body.len() > limit {
            let hidden = body.len() - limit;
            body.truncate(limit);
            body.push(format!("- ... ({} more)", hidden));
        }
    }

    for line in body {
        out.push('\n');
        out.push_str(&line);
    }
    out
}

fn lines<T>(slice: &Collected<T>, render: impl FnOnce(&T) -> Vec<String>) -> Collected<Vec<String>> {
    slice.as_ref().map(render)
}

fn keyed(key: &str, value: impl Display) -> String {
    format!("- {}: {}", key, value)
}

fn value_or_marker<T: Display>(value: &Collected<T>) -> String {
    match value {
        Collected::Available(value) => value.to_string(),
        Collected::Unavailable { .. } => UNAVAILABLE_MARKER.to_string(),
    }
}

fn list_of<T>(items: &[T], render: impl Fn(&T) -> String) -> String {
    let rendered: Vec<String> = items.iter().map(render).collect();
    format!("[{}]", rendered.join(", "))
}

fn map_of<V: Display>(map: &BTreeMap<String, V>) -> String {
    let rendered: Vec<String> = map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    format!("{{{}}}", rendered.join(", "))
}

fn or_na(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or(NOT_AVAILABLE)
}

fn node_line(node: &NodeInfo) -> String {
    keyed(
        &node.name,
        format!(
            "ip={}, capacity={}, conditions={}, labels={}",
            or_na(&node.ip),
            map_of(&node.capacity),
            map_of(&node.conditions),
            map_of(&node.labels)
        ),
    )
}

fn namespace_line(namespace: &NamespaceInfo) -> String {
    keyed(
        &namespace.name,
        format!(
            "resourceQuotas={}, limitRanges={}",
            opaque_list(&namespace.resource_quotas),
            opaque_list(&namespace.limit_ranges)
        ),
    )
}

fn opaque_list(items: &Collected<Vec<Value>>) -> String {
    match items {
        Collected::Available(items) => list_of(items, |item| item.to_string()),
        Collected::Unavailable { .. } => UNAVAILABLE_MARKER.to_string(),
    }
}

fn workload_line(kind: ResourceKind, count: &Collected<usize>) -> String {
    match count {
        Collected::Available(count) => keyed(kind.as_str(), format!("{} items", count)),
        Collected::Unavailable { .. } => keyed(kind.as_str(), UNAVAILABLE_MARKER),
    }
}

fn service_summary(service: &ServiceInfo) -> String {
    format!(
        "{} (type={}, clusterIP={})",
        service.name,
        or_na(&service.service_type),
        or_na(&service.cluster_ip)
    )
}

fn pod_summary(pod: &PodInfo) -> String {
    let env: Vec<String> = pod
        .env_vars
        .iter()
        .map(|var| format!("{}={}", var.name, var.value))
        .collect();
    let mounts: Vec<String> = pod
        .volume_mounts
        .iter()
        .map(|mount| format!("{}:{}", mount.container, mount.mount_path))
        .collect();

    format!(
        "{} (qos={}, restartPolicy={}, initContainers={}, env=[{}], volumeMounts=[{}])",
        pod.name,
        or_na(&pod.qos_class),
        or_na(&pod.restart_policy),
        pod.init_containers,
        env.join(", "),
        mounts.join(", ")
    )
}

fn container_summary(container: &ContainerInfo) -> String {
    let ports: Vec<String> = container.ports.iter().map(i32::to_string).collect();
    format!(
        "{} (image={}, ports=[{}])",
        container.name,
        or_na(&container.image),
        ports.join(", ")
    )
}

fn pod_env_summary(env: &PodEnv) -> String {
    format!("{} {}", env.pod_name, map_of::<EnvValue>(&env.env_vars))
}
