//! kubechat library
//!
//! Answers natural-language questions about a Kubernetes cluster: collects a
//! snapshot of cluster state, renders it into a prompt and asks a
//! chat-completion model. Used by the binary and by the integration tests.

pub mod cli;
pub mod collector;
pub mod config;
pub mod constants;
pub mod kube;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod server;
pub mod services;

// Re-export commonly used types for convenience
pub use crate::collector::Collector;
pub use crate::config::{Config, ConfigLoader};
pub use crate::kube::{ControlPlane, ControlPlaneError, FileControlPlane};
pub use crate::llm::{ChatMessage, CompletionError, CompletionModel};
pub use crate::models::{ClusterSnapshot, Collected};
pub use crate::prompt::{PromptComposer, RenderOptions};
pub use crate::services::Assistant;
