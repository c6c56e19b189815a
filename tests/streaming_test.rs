//! Streaming tests: upstream SSE is re-framed as `{"content": ...}` events.

mod common;

use axum::http::StatusCode;
use common::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::{
    matchers::{body_partial_json, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

fn sse(events: &[&str]) -> String {
    events.iter().map(|e| format!("data: {}\n\n", e)).collect()
}

#[tokio::test]
async fn test_groq_stream_relays_tokens_in_order() {
    let server = MockServer::start().await;
    let upstream = sse(&[
        r#"{"choices":[{"delta":{"role":"assistant"}}]}"#,
        r#"{"choices":[{"delta":{"content":"Hel"}}]}"#,
        r#"{"choices":[{"delta":{"content":"lo"}}]}"#,
        r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#,
        "[DONE]",
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(upstream),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = create_test_app(mock_config_with_keys(&server));
    let response = post_json(
        app,
        "/api/chat",
        json!({"messages": [{"role": "user", "content": "hi"}], "stream": true}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "text/event-stream");
    assert_eq!(
        body_text(response).await,
        "data: {\"content\":\"Hel\"}\n\ndata: {\"content\":\"lo\"}\n\ndata: [DONE]\n\n"
    );
}

#[tokio::test]
async fn test_gemini_stream_gets_done_trailer() {
    let server = MockServer::start().await;
    let upstream = sse(&[
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Good "}]}}]}"#,
        r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"morning"}]},"finishReason":"STOP"}]}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-1.5-flash:streamGenerateContent"))
        .and(query_param("alt", "sse"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(upstream),
        )
        .expect(1)
        .mount(&server)
        .await;

    let app = create_test_app(mock_config_with_keys(&server));
    let response = post_json(
        app,
        "/api/chat",
        json!({
            "messages": [{"role": "user", "content": "hi"}],
            "provider": "gemini",
            "stream": true
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "data: {\"content\":\"Good \"}\n\ndata: {\"content\":\"morning\"}\n\ndata: [DONE]\n\n"
    );
}

#[tokio::test]
async fn test_mid_stream_error_ends_without_trailer() {
    let server = MockServer::start().await;
    let upstream = sse(&[
        r#"{"choices":[{"delta":{"content":"partial"}}]}"#,
        r#"{"error":{"message":"upstream exploded"}}"#,
        r#"{"choices":[{"delta":{"content":"never"}}]}"#,
    ]);
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(upstream),
        )
        .mount(&server)
        .await;

    let app = create_test_app(mock_config_with_keys(&server));
    let response = post_json(
        app,
        "/api/chat",
        json!({"messages": [{"role": "user", "content": "hi"}], "provider": "xai", "stream": true}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "data: {\"content\":\"partial\"}\n\n"
    );
}

#[tokio::test]
async fn test_stream_setup_failure_is_a_json_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Invalid API Key"}
        })))
        .mount(&server)
        .await;

    let app = create_test_app(mock_config_with_keys(&server));
    let response = post_json(
        app,
        "/api/chat",
        json!({"messages": [{"role": "user", "content": "hi"}], "stream": true}),
    )
    .await;

    let (status, body) = body_json(response).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["details"], "Invalid API Key");
}

#[tokio::test]
async fn test_stream_without_done_marker_still_terminates() {
    let server = MockServer::start().await;
    // No trailing blank line on the last event
    let upstream = format!(
        "{}data: {}",
        sse(&[r#"{"choices":[{"delta":{"content":"a"}}]}"#]),
        r#"{"choices":[{"delta":{"content":"b"}}]}"#
    );
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_string(upstream),
        )
        .mount(&server)
        .await;

    let app = create_test_app(mock_config_with_keys(&server));
    let response = post_json(
        app,
        "/api/chat",
        json!({"messages": [{"role": "user", "content": "hi"}], "stream": true}),
    )
    .await;

    assert_eq!(
        body_text(response).await,
        "data: {\"content\":\"a\"}\n\ndata: {\"content\":\"b\"}\n\ndata: [DONE]\n\n"
    );
}
