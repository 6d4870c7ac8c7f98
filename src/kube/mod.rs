//! Kubernetes client module
//!
//! Handles connection to the Kubernetes API server and builds the
//! `ControlPlane` the collector reads from.

mod error;
mod fixture;
mod plane;

pub use error::ControlPlaneError;
pub use fixture::FileControlPlane;
#[cfg(test)]
pub use plane::MockControlPlane;
pub use plane::{ControlPlane, KubeControlPlane};

use crate::config::ClusterConfig;
use anyhow::{Context, Result};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::sync::Arc;

/// Build the control plane described by the cluster configuration
///
/// A configured fixture file takes precedence over any live cluster.
pub async fn create_control_plane(settings: &ClusterConfig) -> Result<Arc<dyn ControlPlane>> {
    if let Some(fixture) = &settings.fixture {
        tracing::info!("Using control-plane fixture: {}", fixture.display());
        let plane = FileControlPlane::from_path(fixture)?;
        return Ok(Arc::new(plane));
    }

    let (client, endpoint) = create_client(settings).await?;
    Ok(Arc::new(KubeControlPlane::new(client, endpoint)))
}

/// Initialize and return a Kubernetes client plus the API server URL
///
/// Uses the kubeconfig loading strategy:
/// 1. Explicit kubeconfig path from configuration (optionally with a context)
/// 2. Explicit context from the default kubeconfig
/// 3. In-cluster config, KUBECONFIG environment variable, ~/.kube/config
///
/// Connect and read timeouts come from the cluster configuration so no
/// control-plane call can hang indefinitely.
pub async fn create_client(settings: &ClusterConfig) -> Result<(Client, String)> {
    let mut config = load_config(settings).await?;
    config.connect_timeout = Some(settings.connect_timeout());
    config.read_timeout = Some(settings.call_timeout());

    let endpoint = config.cluster_url.to_string();
    tracing::debug!("Connecting to Kubernetes API server at {}", endpoint);

    let client = Client::try_from(config).context("Failed to create Kubernetes client")?;
    Ok((client, endpoint))
}

async fn load_config(settings: &ClusterConfig) -> Result<Config> {
    let options = KubeConfigOptions {
        context: settings.context.clone(),
        ..Default::default()
    };

    match (&settings.kubeconfig, &settings.context) {
        (Some(path), _) => {
            let kubeconfig = Kubeconfig::read_from(path)
                .with_context(|| format!("Failed to read kubeconfig: {}", path.display()))?;
            Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .with_context(|| format!("Failed to load kubeconfig: {}", path.display()))
        }
        (None, Some(context)) => Config::from_kubeconfig(&options)
            .await
            .with_context(|| format!("Failed to load kubeconfig context '{}'", context)),
        (None, None) => Config::infer()
            .await
            .context("Failed to infer Kubernetes configuration"),
    }
}

/// Get the kubeconfig context that will be used, if one can be determined
pub fn current_context(settings: &ClusterConfig) -> Option<String> {
    if let Some(context) = &settings.context {
        return Some(context.clone());
    }

    let kubeconfig = match &settings.kubeconfig {
        Some(path) => Kubeconfig::read_from(path).ok()?,
        None => Kubeconfig::read().ok()?,
    };
    kubeconfig.current_context
}
