//! Shared state and the operational handlers (health, metrics).

use crate::api::models::{HealthResponse, ProviderStatus};
use crate::core::config::AppConfig;
use crate::core::metrics::get_metrics;
use crate::services::ProviderKind;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use prometheus::{Encoder, TextEncoder};
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    /// Shared HTTP client for connection pooling
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: AppConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

/// Liveness plus a summary of which providers have a fallback credential.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let providers = ProviderKind::ALL
        .into_iter()
        .map(|kind| {
            let config = state.config.providers.get(kind);
            ProviderStatus {
                name: kind,
                configured: config
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.trim().is_empty()),
                model: config.model.clone(),
            }
        })
        .collect();

    Json(HealthResponse {
        status: "ok".to_string(),
        providers,
        cv_analyzer_configured: state.config.cv_analyzer_key().is_some(),
    })
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler() -> Response {
    // Make sure all collectors are registered before gathering
    get_metrics();

    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response();
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buffer,
    )
        .into_response()
}
