//! Configuration system for kubechat
//!
//! A single `Config` is loaded once at startup (defaults, YAML file,
//! environment overrides, CLI flags) and handed to the components that need
//! it. Nothing reads configuration from global state afterwards.

mod defaults;
pub mod loader;
pub mod paths;
pub mod schema;

pub use defaults::starter_yaml;
pub use loader::ConfigLoader;
pub use schema::{
    ClusterConfig, Config, ContainerLookup, LoggingConfig, ModelConfig, PromptConfig,
    ServerConfig,
};
