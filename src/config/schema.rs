//! Configuration schema definitions
//!
//! Defines the structure of the configuration file using serde for serialization.

use crate::constants::{
    DEFAULT_API_BASE, DEFAULT_API_KEY_ENV, DEFAULT_CALL_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS,
    DEFAULT_HOST, DEFAULT_INSTRUCTION, DEFAULT_LOOKUP_CONCURRENCY, DEFAULT_MODEL,
    DEFAULT_MODEL_TIMEOUT_SECS, DEFAULT_PORT, DEFAULT_SYSTEM_MESSAGE, DEFAULT_TEMPERATURE,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// HTTP listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Control-plane connection and collection settings
    #[serde(default)]
    pub cluster: ClusterConfig,

    /// Completion model configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Prompt template configuration
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Logger configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

/// How the snapshot obtains container specs for each pod
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ContainerLookup {
    /// Read container specs from the pod list response
    #[default]
    Embedded,
    /// Issue one pod lookup per listed pod
    PerPod,
}

/// Control-plane connection and collection settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClusterConfig {
    /// Explicit kubeconfig path (defaults to in-cluster config, KUBECONFIG, ~/.kube/config)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubeconfig: Option<PathBuf>,

    /// Kubeconfig context to use instead of the current context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,

    /// Serve snapshots from a YAML dump of Kubernetes objects instead of a live cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixture: Option<PathBuf>,

    /// Timeout for a single control-plane call, in seconds
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    /// Connection timeout, in seconds
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default)]
    pub container_lookup: ContainerLookup,

    /// Maximum concurrent per-pod lookups when `containerLookup` is `per-pod`
    #[serde(default = "default_lookup_concurrency")]
    pub lookup_concurrency: usize,
}

impl ClusterConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Completion model configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ModelConfig {
    /// Base URL of an OpenAI-compatible API
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Timeout for one completion request, in seconds
    #[serde(default = "default_model_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Resolved from `api_key_env` at load time, never written back
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl ModelConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Prompt template configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    /// Instruction header placed at the top of the prompt
    #[serde(default = "default_instruction")]
    pub instruction: String,

    /// System message sent before the prompt
    #[serde(default = "default_system_message")]
    pub system_message: String,

    /// Cut each section after this many lines (no truncation when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items_per_section: Option<usize>,
}

/// Logger configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Append logs to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

// Default value functions
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_call_timeout_secs() -> u64 {
    DEFAULT_CALL_TIMEOUT_SECS
}

fn default_connect_timeout_secs() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_lookup_concurrency() -> usize {
    DEFAULT_LOOKUP_CONCURRENCY
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_model_timeout_secs() -> u64 {
    DEFAULT_MODEL_TIMEOUT_SECS
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

fn default_instruction() -> String {
    DEFAULT_INSTRUCTION.to_string()
}

fn default_system_message() -> String {
    DEFAULT_SYSTEM_MESSAGE.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubeconfig: None,
            context: None,
            fixture: None,
            call_timeout_secs: default_call_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
            container_lookup: ContainerLookup::default(),
            lookup_concurrency: default_lookup_concurrency(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_model_timeout_secs(),
            api_key_env: default_api_key_env(),
            api_key: None,
        }
    }
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            instruction: default_instruction(),
            system_message: default_system_message(),
            max_items_per_section: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.cluster.container_lookup, ContainerLookup::Embedded);
        assert!(config.prompt.max_items_per_section.is_none());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.model.api_key = Some("sk-secret".to_string());
        let yaml = serde_yaml::to_string(&config).unwrap();
        assert!(yaml.contains("apiKeyEnv"));
        assert!(yaml.contains("containerLookup: embedded"));
        assert!(!yaml.contains("sk-secret"));
    }

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
server:
  port: 9090
cluster:
  context: staging
  containerLookup: per-pod
model:
  temperature: 0.0
prompt:
  maxItemsPerSection: 20
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.cluster.context.as_deref(), Some("staging"));
        assert_eq!(config.cluster.container_lookup, ContainerLookup::PerPod);
        assert_eq!(config.model.temperature, 0.0);
        assert_eq!(config.model.model, "gpt-4o");
        assert_eq!(config.prompt.max_items_per_section, Some(20));
    }
}
