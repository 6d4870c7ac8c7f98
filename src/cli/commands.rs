//! CLI command handlers

use anyhow::{Context, Result};
use clap::Subcommand;
use std::path::{Path, PathBuf};

use crate::config::{Config, ConfigLoader};
use crate::services::Assistant;

/// Configuration management subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigSubcommand {
    /// Show configuration file path
    Path,
    /// Print the effective configuration
    Show,
    /// Validate configuration
    Validate,
    /// Write a starter configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Handle configuration subcommands
///
/// `explicit` is the `--config` path, if one was given.
pub fn handle_config_command(cmd: ConfigSubcommand, explicit: Option<&Path>) -> Result<()> {
    let path = config_path(explicit);

    match cmd {
        ConfigSubcommand::Path => {
            println!("{}", path.display());
        }
        ConfigSubcommand::Show => {
            let (config, warnings) =
                ConfigLoader::load(explicit).context("Failed to load configuration")?;
            for warning in &warnings {
                eprintln!("Warning: {}", warning);
            }
            let yaml =
                serde_yaml::to_string(&config).context("Failed to serialize configuration")?;
            print!("{}", yaml);
        }
        ConfigSubcommand::Validate => {
            let (config, warnings) =
                ConfigLoader::load(explicit).context("Failed to load configuration")?;
            ConfigLoader::validate(&config)?;
            for warning in &warnings {
                println!("Warning: {}", warning);
            }
            if config.model.api_key.is_none() {
                println!(
                    "Warning: {} is not set; completions will fail",
                    config.model.api_key_env
                );
            }
            println!("Configuration is valid");
        }
        ConfigSubcommand::Init { force } => {
            ConfigLoader::init(&path, force)?;
            println!("Configuration written to {}", path.display());
        }
    }

    Ok(())
}

fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(ConfigLoader::default_path)
}

/// Answer one query and print the answer
pub async fn ask(config: &Config, query: &str) -> Result<()> {
    let assistant = Assistant::from_config(config).await?;
    let answer = assistant
        .answer(query)
        .await
        .context("Failed to collect cluster snapshot")?;
    println!("{}", answer);
    Ok(())
}

/// Print the prompt that would be sent for a query
pub async fn prompt(config: &Config, query: &str) -> Result<()> {
    let assistant = Assistant::from_config(config).await?;
    let prompt = assistant
        .prompt_for(query)
        .await
        .context("Failed to collect cluster snapshot")?;
    println!("{}", prompt);
    Ok(())
}

/// Print a collected snapshot as JSON
pub async fn snapshot(config: &Config) -> Result<()> {
    let assistant = Assistant::from_config(config).await?;
    let snapshot = assistant
        .snapshot()
        .await
        .context("Failed to collect cluster snapshot")?;
    let json =
        serde_json::to_string_pretty(&snapshot).context("Failed to serialize snapshot")?;
    println!("{}", json);
    Ok(())
}
