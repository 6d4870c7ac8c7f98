//! OpenAI-compatible chat-completion client

use super::{ChatMessage, CompletionError, CompletionModel};
use crate::config::ModelConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Client for `POST {api_base}/chat/completions`
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    timeout: Duration,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(settings: &ModelConfig) -> Result<Self> {
        let endpoint = completions_url(&settings.api_base)?;

        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            endpoint,
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            api_key_env: settings.api_key_env.clone(),
            timeout: settings.timeout(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

/// Resolve `chat/completions` under the API base, keeping any path prefix
/// (`https://host/v1` becomes `https://host/v1/chat/completions`)
fn completions_url(api_base: &str) -> Result<Url> {
    let mut base = Url::parse(api_base)
        .with_context(|| format!("Invalid completion API base URL: {}", api_base))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("chat/completions")
        .with_context(|| format!("Invalid completion API base URL: {}", api_base))
}

#[async_trait]
impl CompletionModel for OpenAiClient {
    fn name(&self) -> String {
        self.model.clone()
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| CompletionError::MissingApiKey(self.api_key_env.clone()))?;

        let body = CompletionRequest {
            model: &self.model,
            messages: &messages,
            temperature,
        };

        tracing::debug!(
            "Requesting completion from {} (model {})",
            self.endpoint,
            self.model
        );

        let response = self
            .http
            .post(self.endpoint.clone())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout(self.timeout)
                } else {
                    CompletionError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: CompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Malformed(e.to_string()))?;

        let answer = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(CompletionError::Empty);
        }

        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    async fn spawn(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/v1", addr)
    }

    fn settings(api_base: String) -> ModelConfig {
        ModelConfig {
            api_base,
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_completions_url_keeps_prefix() {
        assert_eq!(
            completions_url("https://api.openai.com/v1").unwrap().as_str(),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            completions_url("http://localhost:11434/v1/").unwrap().as_str(),
            "http://localhost:11434/v1/chat/completions"
        );
        assert!(completions_url("not a url").is_err());
    }

    #[tokio::test]
    async fn test_complete_trims_answer() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                assert_eq!(headers["authorization"], "Bearer sk-test");
                assert_eq!(body["model"], "gpt-4o");
                assert_eq!(body["messages"][1]["role"], "user");
                Json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "  3\n"}}]
                }))
            }),
        );
        let client = OpenAiClient::new(&settings(spawn(router).await)).unwrap();

        let answer = client
            .complete(
                vec![ChatMessage::system("be brief"), ChatMessage::user("nodes?")],
                0.3,
            )
            .await
            .unwrap();
        assert_eq!(answer, "3");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { (StatusCode::TOO_MANY_REQUESTS, "quota exceeded") }),
        );
        let client = OpenAiClient::new(&settings(spawn(router).await)).unwrap();

        let err = client
            .complete(vec![ChatMessage::user("hi")], 0.3)
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Status { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_empty_choices_are_an_error() {
        let router = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(json!({"choices": []})) }),
        );
        let client = OpenAiClient::new(&settings(spawn(router).await)).unwrap();

        let err = client
            .complete(vec![ChatMessage::user("hi")], 0.3)
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Empty));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let mut config = settings("http://127.0.0.1:9/v1".to_string());
        config.api_key = None;
        let client = OpenAiClient::new(&config).unwrap();

        let err = client
            .complete(vec![ChatMessage::user("hi")], 0.3)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No API key configured (set OPENAI_API_KEY)");
    }
}
