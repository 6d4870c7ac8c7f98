//! HTTP API
//!
//! Exposes `POST /query`: body `{"query": "..."}`, response
//! `{"query": "...", "answer": "..."}`.

pub mod error;
pub mod validation;

pub use error::ApiError;
pub use validation::{QueryRequest, ValidationIssue, validate_query};

use crate::constants::MAX_REQUEST_BODY_BYTES;
use crate::services::Assistant;
use anyhow::Context;
use axum::body::Body;
use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResponse {
    pub query: String,
    pub answer: String,
}

async fn query(
    State(assistant): State<Arc<Assistant>>,
    body: Body,
) -> Result<Json<QueryResponse>, ApiError> {
    // Oversized bodies are validation errors, not axum's plain-text 413
    let body = axum::body::to_bytes(body, MAX_REQUEST_BODY_BYTES)
        .await
        .map_err(|e| {
            tracing::debug!("Rejected query request body: {}", e);
            ApiError::Validation(vec![ValidationIssue::body_too_large(MAX_REQUEST_BODY_BYTES)])
        })?;

    let request = validate_query(&body).map_err(|issues| {
        tracing::debug!("Rejected query request: {} issue(s)", issues.len());
        ApiError::Validation(issues)
    })?;

    let answer = assistant.answer(&request.query).await?;

    Ok(Json(QueryResponse {
        query: request.query,
        answer,
    }))
}

/// Create the API router
pub fn create_router(assistant: Arc<Assistant>) -> Router {
    Router::new()
        .route("/query", post(query))
        .layer(TraceLayer::new_for_http())
        .with_state(assistant)
}

/// Serve the API until Ctrl-C
pub async fn serve(assistant: Arc<Assistant>, host: &str, port: u16) -> anyhow::Result<()> {
    let app = create_router(assistant);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "Starting API server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
