//! API layer for the gateway.
//!
//! This module contains the HTTP handlers, request/response models,
//! SSE streaming support and the router that ties them together.

pub mod chat;
pub mod cv;
pub mod handlers;
pub mod models;
pub mod streaming;

use crate::core::middleware::{request_id_middleware, MetricsMiddleware};
use crate::core::metrics::init_metrics;
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

// Re-export commonly used types
pub use chat::chat;
pub use cv::cv_analyze;
pub use handlers::{health, metrics_handler, AppState};
pub use models::{ChatMessage, ChatRequest, ChatResponse, ErrorBody, HealthResponse, Role};
pub use streaming::create_sse_stream;

/// OpenAPI documentation for the public API.
#[derive(OpenApi)]
#[openapi(
    paths(chat::chat, cv::cv_analyze, handlers::health),
    components(
        schemas(
            models::Role,
            models::ChatMessage,
            models::ChatRequest,
            models::ChatResponse,
            models::ChatOutput,
            models::CvTextAnalysisResponse,
            models::StreamToken,
            models::ErrorBody,
            models::HealthResponse,
            models::ProviderStatus,
            models::CvUploadForm,
            crate::services::ProviderKind,
            crate::services::CvAnalysisResult,
            crate::services::CvSection,
            crate::services::SectionStatus,
            crate::services::KeywordReport,
        )
    ),
    tags(
        (name = "chat", description = "Multi-provider chat and CV text analysis"),
        (name = "cv", description = "CV document analysis"),
        (name = "health", description = "Service health")
    ),
    info(
        title = "WorkApp Gateway API",
        version = "1.0.0",
        description = "Chat gateway for Groq, Gemini and xAI, plus CV analysis.",
        license(name = "MIT")
    )
)]
pub struct ApiDoc;

/// Build the application router with all endpoints and middleware.
pub fn router(state: Arc<AppState>) -> Router {
    init_metrics();

    let upload_limit = state.config.max_upload_bytes;

    let api_routes = Router::new()
        .route("/api/chat", post(chat))
        .route(
            "/api/cv-analyze",
            post(cv_analyze).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/health", get(health))
        .layer(axum::middleware::from_fn(MetricsMiddleware::track_metrics))
        .with_state(state);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_routes)
        .route("/metrics", get(metrics_handler))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
