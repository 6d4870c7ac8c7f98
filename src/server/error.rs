//! HTTP error responses

use super::validation::ValidationIssue;
use crate::kube::ControlPlaneError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Failure of a `/query` request
#[derive(Debug)]
pub enum ApiError {
    /// Request body failed validation (400)
    Validation(Vec<ValidationIssue>),
    /// Snapshot collection failed
    ControlPlane(ControlPlaneError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::ControlPlane(ControlPlaneError::Timeout { .. }) => {
                StatusCode::GATEWAY_TIMEOUT
            }
            ApiError::ControlPlane(ControlPlaneError::Transport { .. }) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ApiError::ControlPlane(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl From<ControlPlaneError> for ApiError {
    fn from(err: ControlPlaneError) -> Self {
        ApiError::ControlPlane(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::Validation(issues) => json!({ "error": issues }),
            ApiError::ControlPlane(err) => {
                tracing::error!("Failed to collect cluster snapshot: {}", err);
                json!({ "error": err.to_string() })
            }
        };
        (status, Json(body)).into_response()
    }
}
