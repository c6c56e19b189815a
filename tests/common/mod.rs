//! Shared helpers for the integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::MockServer;
use workapp_gateway::{
    core::{AppConfig, ProviderConfig},
    router, AppState, ProviderKind,
};

/// Configuration pointing every upstream at the mock server, with no
/// fallback credentials.
pub fn mock_config(server: &MockServer) -> AppConfig {
    let mut config = AppConfig {
        verify_ssl: false,
        request_timeout_secs: 10,
        ..AppConfig::default()
    };
    for kind in ProviderKind::ALL {
        *config.providers.get_mut(kind) = ProviderConfig {
            api_base: server.uri(),
            model: kind.default_model().to_string(),
            api_key: None,
        };
    }
    config.cv_analyzer.url = format!("{}/v1/cv/analyze", server.uri());
    config
}

/// Same as [`mock_config`] with a fallback key per provider.
pub fn mock_config_with_keys(server: &MockServer) -> AppConfig {
    let mut config = mock_config(server);
    config.providers.groq.api_key = Some("env-groq".to_string());
    config.providers.gemini.api_key = Some("env-gemini".to_string());
    config.providers.xai.api_key = Some("env-xai".to_string());
    config
}

pub fn create_test_app(config: AppConfig) -> Router {
    let http_client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
        .build()
        .expect("Failed to build HTTP client");
    router(Arc::new(AppState::new(config, http_client)))
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = body_bytes(response).await;
    (status, serde_json::from_slice(&bytes).unwrap())
}

pub async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}
