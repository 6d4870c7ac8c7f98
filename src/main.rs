//! kubechat - ask questions about a Kubernetes cluster in plain language
//!
//! Runs an HTTP service (`POST /query`) by default; the other subcommands run
//! the same pipeline once from the command line.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kubechat::cli::{self, ConfigSubcommand};
use kubechat::config::{Config, ConfigLoader};
use kubechat::services::Assistant;
use std::path::PathBuf;
use std::sync::Arc;

/// Ask questions about a Kubernetes cluster in plain language
#[derive(Parser, Debug)]
#[command(name = "kubechat")]
#[command(about = "Ask questions about a Kubernetes cluster in plain language", long_about = None)]
struct Args {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    /// Read the cluster from a YAML dump instead of a live API server
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

/// Main commands
#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve {
        /// Listen address
        #[arg(long)]
        host: Option<String>,
        /// Listen port
        #[arg(long, short = 'p')]
        port: Option<u16>,
    },
    /// Answer one query and exit
    Ask {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Print the prompt for a query without calling the model
    Prompt {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Print the collected cluster snapshot as JSON
    Snapshot,
    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args {
        config: config_path,
        debug,
        fixture,
        command,
    } = Args::parse();

    let setup = Setup {
        config_path,
        fixture,
        debug,
    };

    match command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            let config = setup.load(|config| {
                if let Some(host) = host {
                    config.server.host = host;
                }
                if let Some(port) = port {
                    config.server.port = port;
                }
            })?;
            serve(config).await
        }
        Command::Ask { query } => {
            let config = setup.load(|_| {})?;
            cli::ask(&config, &query.join(" ")).await
        }
        Command::Prompt { query } => {
            let config = setup.load(|_| {})?;
            cli::prompt(&config, &query.join(" ")).await
        }
        Command::Snapshot => {
            let config = setup.load(|_| {})?;
            cli::snapshot(&config).await
        }
        Command::Config { subcommand } => {
            cli::handle_config_command(subcommand, setup.config_path.as_deref())
        }
        Command::Version => {
            cli::display_version();
            Ok(())
        }
    }
}

/// Global flags needed to build the effective configuration
struct Setup {
    config_path: Option<PathBuf>,
    fixture: Option<PathBuf>,
    debug: bool,
}

impl Setup {
    /// Load, apply CLI flags, validate, then start logging and report
    /// anything the loader skipped
    fn load(self, flags: impl FnOnce(&mut Config)) -> Result<Config> {
        let (mut config, warnings) = ConfigLoader::load(self.config_path.as_deref())
            .context("Failed to load configuration")?;
        if let Some(fixture) = self.fixture {
            config.cluster.fixture = Some(fixture);
        }
        flags(&mut config);
        ConfigLoader::validate(&config)?;

        cli::init_logging(&config.logging, self.debug)?;
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }
        Ok(config)
    }
}

async fn serve(config: Config) -> Result<()> {
    if config.model.api_key.is_none() {
        tracing::warn!(
            "{} is not set; every answer will be the apology message",
            config.model.api_key_env
        );
    }

    match kubechat::kube::current_context(&config.cluster) {
        Some(context) => tracing::info!("Using kubeconfig context: {}", context),
        None => tracing::debug!("No kubeconfig context found"),
    }

    let assistant = Assistant::from_config(&config).await?;
    kubechat::server::serve(Arc::new(assistant), &config.server.host, config.server.port).await
}
