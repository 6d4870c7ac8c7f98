//! Control-plane error classification
//!
//! Permission errors are recoverable (the slice becomes unavailable), every
//! other variant is fatal to the snapshot being collected.

use crate::models::ResourceKind;
use std::time::Duration;

/// Errors returned by a control-plane client
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControlPlaneError {
    #[error("Permission denied for {resource}: {message}")]
    Forbidden {
        resource: ResourceKind,
        message: String,
    },

    #[error("{resource} not found: {message}")]
    NotFound {
        resource: ResourceKind,
        message: String,
    },

    #[error("Control plane rejected {resource} request ({code}): {message}")]
    Api {
        resource: ResourceKind,
        code: u16,
        message: String,
    },

    #[error("Failed to reach control plane for {resource}: {message}")]
    Transport {
        resource: ResourceKind,
        message: String,
    },

    #[error("Timed out after {}s waiting for {resource}", .after.as_secs_f64())]
    Timeout {
        resource: ResourceKind,
        after: Duration,
    },

    #[error("{resource} is not a workload kind")]
    NotWorkload { resource: ResourceKind },
}

impl ControlPlaneError {
    /// Classify a kube-rs error for the given resource
    ///
    /// 401 and 403 responses are permission errors, 404 is not-found, any
    /// other status is an API error. Errors without a status response
    /// (connection, TLS, decoding) are transport errors.
    pub fn from_kube(resource: ResourceKind, err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) => {
                let code = response.code;
                let message = response.message.clone();
                match code {
                    401 | 403 => ControlPlaneError::Forbidden { resource, message },
                    404 => ControlPlaneError::NotFound { resource, message },
                    _ => ControlPlaneError::Api {
                        resource,
                        code,
                        message,
                    },
                }
            }
            other => ControlPlaneError::Transport {
                resource,
                message: other.to_string(),
            },
        }
    }

    pub fn forbidden(resource: ResourceKind, message: impl Into<String>) -> Self {
        ControlPlaneError::Forbidden {
            resource,
            message: message.into(),
        }
    }

    pub fn transport(resource: ResourceKind, message: impl Into<String>) -> Self {
        ControlPlaneError::Transport {
            resource,
            message: message.into(),
        }
    }

    /// Whether collection may continue with this slice marked unavailable
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, ControlPlaneError::Forbidden { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ControlPlaneError::NotFound { .. })
    }

    /// Resource the failing call was about
    pub fn resource(&self) -> ResourceKind {
        match self {
            ControlPlaneError::Forbidden { resource, .. }
            | ControlPlaneError::NotFound { resource, .. }
            | ControlPlaneError::Api { resource, .. }
            | ControlPlaneError::Transport { resource, .. }
            | ControlPlaneError::Timeout { resource, .. }
            | ControlPlaneError::NotWorkload { resource } => *resource,
        }
    }
}
