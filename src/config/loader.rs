//! Configuration loading and merging logic
//!
//! Handles loading configuration from multiple sources and merging them
//! according to precedence rules.

use super::{defaults, paths, schema::Config};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with all layers merged
    ///
    /// Precedence order (highest to lowest):
    /// 1. Environment variable overrides
    /// 2. Config file (explicit path, or the root config path if it exists)
    /// 3. Built-in defaults
    ///
    /// CLI flags are applied on top of the result by the binary. Returns the
    /// config together with warnings for overrides that were ignored; they
    /// are reported by the caller once logging is up.
    pub fn load(path: Option<&Path>) -> Result<(Config, Vec<String>)> {
        let mut config = match path {
            // An explicit path must exist
            Some(explicit) => Self::load_file(explicit)?,
            None => {
                let root = paths::root_config_path();
                if root.exists() {
                    Self::load_file(&root)?
                } else {
                    Self::load_defaults()
                }
            }
        };

        let warnings = Self::apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        config.model.api_key = std::env::var(&config.model.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());

        Ok((config, warnings))
    }

    /// Load configuration from a file
    pub fn load_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", path.display()));
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load default configuration
    pub fn load_defaults() -> Config {
        defaults::default_config()
    }

    /// Path the loader reads when no explicit path is given
    pub fn default_path() -> PathBuf {
        paths::root_config_path()
    }

    /// Validate configuration values
    ///
    /// Collects every problem instead of stopping at the first one.
    pub fn validate(config: &Config) -> Result<()> {
        let mut problems = Vec::new();

        if config.server.host.trim().is_empty() {
            problems.push("server.host must not be empty".to_string());
        }
        if config.cluster.call_timeout_secs == 0 {
            problems.push("cluster.callTimeoutSecs must be greater than 0".to_string());
        }
        if config.cluster.connect_timeout_secs == 0 {
            problems.push("cluster.connectTimeoutSecs must be greater than 0".to_string());
        }
        if config.cluster.lookup_concurrency == 0 {
            problems.push("cluster.lookupConcurrency must be greater than 0".to_string());
        }
        if let Some(fixture) = &config.cluster.fixture {
            if !fixture.exists() {
                problems.push(format!(
                    "cluster.fixture does not exist: {}",
                    fixture.display()
                ));
            }
        }
        if config.model.model.trim().is_empty() {
            problems.push("model.model must not be empty".to_string());
        }
        if !(0.0..=2.0).contains(&config.model.temperature) {
            problems.push(format!(
                "model.temperature must be between 0 and 2, got {}",
                config.model.temperature
            ));
        }
        if config.model.timeout_secs == 0 {
            problems.push("model.timeoutSecs must be greater than 0".to_string());
        }
        if let Err(e) = url::Url::parse(&config.model.api_base) {
            problems.push(format!(
                "model.apiBase is not a valid URL ({}): {}",
                config.model.api_base, e
            ));
        }
        if config.prompt.max_items_per_section == Some(0) {
            problems.push("prompt.maxItemsPerSection must be greater than 0 when set".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(anyhow::anyhow!(
                "Invalid configuration:\n  - {}",
                problems.join("\n  - ")
            ))
        }
    }

    /// Apply environment variable overrides
    ///
    /// `lookup` resolves a variable name to its value; the process
    /// environment is used by `load`. Returns one warning per value that
    /// could not be applied.
    pub fn apply_env_overrides(
        config: &mut Config,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Some(host) = lookup("KUBECHAT_HOST") {
            config.server.host = host;
        }

        if let Some(port) = lookup("KUBECHAT_PORT") {
            match port.parse::<u16>() {
                Ok(val) => config.server.port = val,
                Err(_) => warnings.push(format!("Ignoring invalid KUBECHAT_PORT: {}", port)),
            }
        }

        if let Some(model) = lookup("KUBECHAT_MODEL") {
            config.model.model = model;
        }

        if let Some(api_base) = lookup("KUBECHAT_API_BASE") {
            config.model.api_base = api_base;
        }

        if let Some(context) = lookup("KUBECHAT_CONTEXT") {
            config.cluster.context = Some(context);
        }

        if let Some(fixture) = lookup("KUBECHAT_FIXTURE") {
            config.cluster.fixture = Some(PathBuf::from(fixture));
        }

        if let Some(level) = lookup("KUBECHAT_LOG_LEVEL") {
            config.logging.level = level;
        }

        warnings
    }

    /// Write the starter configuration file to `path`
    ///
    /// Refuses to replace an existing file unless `force` is set.
    pub fn init(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(anyhow::anyhow!(
                "Config file already exists: {} (use --force to overwrite)",
                path.display()
            ));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path, defaults::starter_yaml())
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
