//! Query answering service
//!
//! `Assistant` runs the whole pipeline for one query: collect a snapshot,
//! render the prompt, ask the completion model. The HTTP handler and the
//! CLI both go through it.

use crate::collector::Collector;
use crate::config::Config;
use crate::constants::APOLOGY_MESSAGE;
use crate::kube::{ControlPlane, ControlPlaneError};
use crate::llm::{CompletionModel, OpenAiClient};
use crate::models::ClusterSnapshot;
use crate::prompt::PromptComposer;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

/// Answers natural-language questions about a cluster
pub struct Assistant {
    collector: Collector,
    composer: PromptComposer,
    model: Arc<dyn CompletionModel>,
    temperature: f32,
    model_timeout: Duration,
}

impl Assistant {
    pub fn new(
        plane: Arc<dyn ControlPlane>,
        model: Arc<dyn CompletionModel>,
        config: &Config,
    ) -> Self {
        Self {
            collector: Collector::new(plane, &config.cluster),
            composer: PromptComposer::new(&config.prompt),
            model,
            temperature: config.model.temperature,
            model_timeout: config.model.timeout(),
        }
    }

    /// Build an assistant against the configured cluster and completion API
    pub async fn from_config(config: &Config) -> Result<Self> {
        let plane = crate::kube::create_control_plane(&config.cluster).await?;
        let model = OpenAiClient::new(&config.model)?;
        tracing::debug!("Completion endpoint: {}", model.endpoint());
        Ok(Self::new(plane, Arc::new(model), config))
    }

    /// Collect a fresh snapshot
    pub async fn snapshot(&self) -> Result<ClusterSnapshot, ControlPlaneError> {
        self.collector.snapshot().await
    }

    /// Collect a snapshot and render the prompt for `query`
    pub async fn prompt_for(&self, query: &str) -> Result<String, ControlPlaneError> {
        let snapshot = self.snapshot().await?;
        Ok(self.composer.render(&snapshot, query))
    }

    /// Answer a query
    ///
    /// Control-plane failures are returned to the caller. Completion failures
    /// are logged and replaced with the apology message, so an answer is
    /// always produced once the snapshot has been collected.
    pub async fn answer(&self, query: &str) -> Result<String, ControlPlaneError> {
        tracing::info!("Received query: {}", query);

        let snapshot = self.snapshot().await?;
        let messages = self.composer.messages(&snapshot, query);
        if let Some(prompt) = messages.last() {
            tracing::debug!("Rendered prompt:\n{}", prompt.content);
        }

        let completion = tokio::time::timeout(
            self.model_timeout,
            self.model.complete(messages, self.temperature),
        )
        .await;

        let answer = match completion {
            Ok(Ok(answer)) => answer,
            Ok(Err(err)) => {
                tracing::error!("Completion with {} failed: {}", self.model.name(), err);
                APOLOGY_MESSAGE.to_string()
            }
            Err(_) => {
                tracing::error!(
                    "Completion with {} timed out after {:?}",
                    self.model.name(),
                    self.model_timeout
                );
                APOLOGY_MESSAGE.to_string()
            }
        };

        tracing::info!("Generated answer: {}", answer);
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kube::{FileControlPlane, MockControlPlane};
    use crate::llm::{CompletionError, MockCompletionModel, Role};
    use crate::models::ResourceKind;

    const FIXTURE: &str = r#"
apiVersion: v1
kind: List
items:
  - {apiVersion: v1, kind: Node, metadata: {name: node-a}}
  - {apiVersion: v1, kind: Node, metadata: {name: node-b}}
  - {apiVersion: v1, kind: Namespace, metadata: {name: default}}
"#;

    fn plane() -> Arc<dyn ControlPlane> {
        Arc::new(FileControlPlane::from_yaml_str(FIXTURE).unwrap())
    }

    fn model(
        reply: impl Fn() -> Result<String, CompletionError> + Send + Sync + 'static,
    ) -> Arc<dyn CompletionModel> {
        let mut model = MockCompletionModel::new();
        model.expect_name().returning(|| "stub".to_string());
        model.expect_complete().returning(move |_, _| reply());
        Arc::new(model)
    }

    #[tokio::test]
    async fn test_answer_passes_model_output_through() {
        let mut mock = MockCompletionModel::new();
        mock.expect_complete()
            .withf(|messages, temperature| {
                messages.len() == 2
                    && messages[0].role == Role::System
                    && messages[1].content.contains("Number of Nodes: 2")
                    && (*temperature - 0.3).abs() < f32::EPSILON
            })
            .times(1)
            .returning(|_, _| Ok("2".to_string()));

        let assistant = Assistant::new(plane(), Arc::new(mock), &Config::default());
        assert_eq!(assistant.answer("How many nodes?").await.unwrap(), "2");
    }

    #[tokio::test]
    async fn test_model_error_becomes_apology() {
        let assistant = Assistant::new(
            plane(),
            model(|| Err(CompletionError::Transport("connection reset".to_string()))),
            &Config::default(),
        );
        assert_eq!(
            assistant.answer("How many nodes?").await.unwrap(),
            APOLOGY_MESSAGE
        );
    }

    #[tokio::test]
    async fn test_forbidden_nodes_still_answer() {
        let plane = Arc::new(
            FileControlPlane::from_yaml_str(FIXTURE)
                .unwrap()
                .forbid(ResourceKind::Nodes),
        );
        let assistant = Assistant::new(plane, model(|| Ok("?".to_string())), &Config::default());
        assert_eq!(assistant.answer("q").await.unwrap(), "?");

        let prompt = assistant.prompt_for("q").await.unwrap();
        assert!(prompt.contains("Number of Nodes: [unavailable]"));
    }

    #[tokio::test]
    async fn test_control_plane_error_skips_model() {
        let mut plane = MockControlPlane::new();
        plane.expect_endpoint().returning(String::new);
        plane.expect_server_version().returning(|| {
            Err(ControlPlaneError::transport(
                ResourceKind::Version,
                "connection refused",
            ))
        });
        plane.expect_list_nodes().returning(|| Ok(vec![]));
        plane.expect_list_namespaces().returning(|| Ok(vec![]));
        plane.expect_count_workloads().returning(|_| Ok(0));
        plane.expect_list_services().returning(|| Ok(vec![]));
        plane.expect_list_pods().returning(|| Ok(vec![]));

        let mut mock = MockCompletionModel::new();
        mock.expect_complete().never();

        let assistant = Assistant::new(Arc::new(plane), Arc::new(mock), &Config::default());
        let err = assistant.answer("q").await.unwrap_err();
        assert!(matches!(err, ControlPlaneError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_prompt_ends_with_query() {
        let assistant = Assistant::new(plane(), model(|| Ok("x".to_string())), &Config::default());
        let prompt = assistant.prompt_for("Which namespaces exist?").await.unwrap();
        assert!(prompt.ends_with("Query: Which namespaces exist?"));
        assert!(prompt.contains("Namespaces:\n- default:"));
    }
}
