//! Provider clients for the chat endpoint.
//!
//! Groq and xAI speak the OpenAI chat-completions dialect; Gemini has its
//! own `generateContent` API. [`ProviderClient`] hides the difference
//! behind one buffered and one streaming call.

use crate::api::models::{ChatMessage, Role};
use crate::core::logging::get_request_id;
use crate::core::metrics::get_metrics;
use crate::core::{AppError, Result};
use crate::services::provider::ProviderKind;
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::time::Instant;

const MAX_ERROR_MESSAGE_LEN: usize = 500;

/// Where and as whom to call a provider.
#[derive(Debug, Clone)]
pub struct ProviderEndpoint {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
}

impl ProviderEndpoint {
    pub fn new(api_base: &str, api_key: impl Into<String>, model: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.to_string(),
        }
    }
}

/// One decoded upstream stream event.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token(String),
    Done,
    /// Keep-alives, role-only deltas and other events with no text
    Skip,
    Error(String),
}

/// Client for OpenAI-compatible chat-completions APIs (Groq, xAI).
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    endpoint: ProviderEndpoint,
}

impl OpenAiCompatClient {
    pub fn new(http: reqwest::Client, endpoint: ProviderEndpoint) -> Self {
        Self { http, endpoint }
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.api_base)
    }

    pub fn build_payload(&self, messages: &[ChatMessage], stream: bool) -> Value {
        let mut payload = json!({
            "model": self.endpoint.model,
            "messages": messages,
        });
        if stream {
            payload["stream"] = Value::Bool(true);
        }
        payload
    }

    fn request(&self, messages: &[ChatMessage], stream: bool) -> reqwest::RequestBuilder {
        self.http
            .post(self.url())
            .bearer_auth(&self.endpoint.api_key)
            .json(&self.build_payload(messages, stream))
    }

    /// Text of the first choice.
    /// Text of the first choice. A choice with null or missing content
    /// yields an empty string; `None` means there was no choice at all.
    pub fn extract_text(body: &Value) -> Option<String> {
        let choice = body.pointer("/choices/0")?;
        Some(
            choice
                .pointer("/message/content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        )
    }

    pub fn stream_event(data: &str) -> StreamEvent {
        let data = data.trim();
        if data == "[DONE]" {
            return StreamEvent::Done;
        }
        let Ok(chunk) = serde_json::from_str::<Value>(data) else {
            return StreamEvent::Skip;
        };
        if chunk.get("error").is_some() {
            return StreamEvent::Error(
                extract_error_message(&chunk).unwrap_or_else(|| truncate_message(data)),
            );
        }
        match chunk
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
        {
            Some(text) if !text.is_empty() => StreamEvent::Token(text.to_string()),
            _ => StreamEvent::Skip,
        }
    }
}

/// Client for the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: ProviderEndpoint,
}

impl GeminiClient {
    pub fn new(http: reqwest::Client, endpoint: ProviderEndpoint) -> Self {
        Self { http, endpoint }
    }

    fn url(&self, stream: bool) -> String {
        let base = format!(
            "{}/v1beta/models/{}",
            self.endpoint.api_base, self.endpoint.model
        );
        if stream {
            format!("{}:streamGenerateContent?alt=sse", base)
        } else {
            format!("{}:generateContent", base)
        }
    }

    /// Convert a conversation to Gemini's request shape.
    ///
    /// System turns become `systemInstruction`, assistant turns use the
    /// `model` role, and consecutive turns of the same role are merged
    /// since Gemini requires alternation.
    pub fn build_payload(messages: &[ChatMessage]) -> Value {
        let mut system_parts: Vec<Value> = Vec::new();
        let mut contents: Vec<Value> = Vec::new();
        let mut last_role: Option<&str> = None;

        for message in messages {
            let role = match message.role {
                Role::System => {
                    system_parts.push(json!({ "text": message.content }));
                    continue;
                }
                Role::User => "user",
                Role::Assistant => "model",
            };
            let part = json!({ "text": message.content });

            match contents.last_mut() {
                Some(last) if last_role == Some(role) => {
                    if let Some(parts) = last["parts"].as_array_mut() {
                        parts.push(part);
                    }
                }
                _ => contents.push(json!({ "role": role, "parts": [part] })),
            }
            last_role = Some(role);
        }

        let mut payload = json!({ "contents": contents });
        if !system_parts.is_empty() {
            payload["systemInstruction"] = json!({ "parts": system_parts });
        }
        payload
    }

    fn request(&self, messages: &[ChatMessage], stream: bool) -> reqwest::RequestBuilder {
        self.http
            .post(self.url(stream))
            .header("x-goog-api-key", &self.endpoint.api_key)
            .json(&Self::build_payload(messages))
    }

    /// Concatenated text parts of the first candidate.
    /// Concatenated text parts of the first candidate, empty when the
    /// candidate carries no content.
    pub fn extract_text(body: &Value) -> Option<String> {
        let candidate = body.pointer("/candidates/0")?;
        let parts = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default();
        Some(
            parts
                .iter()
                .filter_map(|p| p.get("text").and_then(Value::as_str))
                .collect(),
        )
    }

    pub fn stream_event(data: &str) -> StreamEvent {
        let Ok(chunk) = serde_json::from_str::<Value>(data.trim()) else {
            return StreamEvent::Skip;
        };
        if chunk.get("error").is_some() {
            return StreamEvent::Error(
                extract_error_message(&chunk).unwrap_or_else(|| truncate_message(data)),
            );
        }
        match Self::extract_text(&chunk) {
            Some(text) if !text.is_empty() => StreamEvent::Token(text),
            _ => StreamEvent::Skip,
        }
    }
}

/// A client bound to one provider, model and credential.
#[derive(Debug, Clone)]
pub enum ProviderClient {
    Groq(OpenAiCompatClient),
    Gemini(GeminiClient),
    Xai(OpenAiCompatClient),
}

impl ProviderClient {
    pub fn new(kind: ProviderKind, http: reqwest::Client, endpoint: ProviderEndpoint) -> Self {
        match kind {
            ProviderKind::Groq => ProviderClient::Groq(OpenAiCompatClient::new(http, endpoint)),
            ProviderKind::Gemini => ProviderClient::Gemini(GeminiClient::new(http, endpoint)),
            ProviderKind::Xai => ProviderClient::Xai(OpenAiCompatClient::new(http, endpoint)),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderClient::Groq(_) => ProviderKind::Groq,
            ProviderClient::Gemini(_) => ProviderKind::Gemini,
            ProviderClient::Xai(_) => ProviderKind::Xai,
        }
    }

    fn request(&self, messages: &[ChatMessage], stream: bool) -> reqwest::RequestBuilder {
        match self {
            ProviderClient::Groq(c) | ProviderClient::Xai(c) => c.request(messages, stream),
            ProviderClient::Gemini(c) => c.request(messages, stream),
        }
    }

    /// Run a buffered completion and return the generated text.
    pub async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let kind = self.kind();
        let start = Instant::now();

        let response = self
            .request(messages, false)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.check_status(response).await?;

        let body: Value = response.json().await.map_err(|e| self.transport_error(e))?;
        get_metrics()
            .upstream_latency
            .with_label_values(&[kind.as_str(), "buffered"])
            .observe(start.elapsed().as_secs_f64());

        let text = match self {
            ProviderClient::Groq(_) | ProviderClient::Xai(_) => {
                OpenAiCompatClient::extract_text(&body)
            }
            ProviderClient::Gemini(_) => GeminiClient::extract_text(&body),
        };

        text.ok_or_else(|| {
            self.record_error("empty");
            AppError::Provider(format!("{} returned no completion text", kind.display_name()))
        })
    }

    /// Start a streaming completion. The returned response has a success
    /// status; its body is the provider's SSE stream.
    pub async fn open_stream(&self, messages: &[ChatMessage]) -> Result<reqwest::Response> {
        let start = Instant::now();
        let response = self
            .request(messages, true)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let response = self.check_status(response).await?;

        get_metrics()
            .upstream_latency
            .with_label_values(&[self.kind().as_str(), "stream"])
            .observe(start.elapsed().as_secs_f64());
        Ok(response)
    }

    /// Decode one upstream SSE `data` payload.
    pub fn stream_event(&self, data: &str) -> StreamEvent {
        match self {
            ProviderClient::Groq(_) | ProviderClient::Xai(_) => {
                OpenAiCompatClient::stream_event(data)
            }
            ProviderClient::Gemini(_) => GeminiClient::stream_event(data),
        }
    }

    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let raw = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<Value>(&raw)
            .ok()
            .and_then(|body| extract_error_message(&body))
            .unwrap_or_else(|| {
                if raw.trim().is_empty() {
                    status.to_string()
                } else {
                    truncate_message(raw.trim())
                }
            });

        let error = AppError::from_provider(to_http_status(status), message);
        self.record_error(error.kind());
        tracing::warn!(
            request_id = %get_request_id(),
            provider = %self.kind(),
            status = status.as_u16(),
            error = %error,
            "Provider returned an error"
        );
        Err(error)
    }

    fn transport_error(&self, e: reqwest::Error) -> AppError {
        self.record_error("transport");
        let status = e.status().and_then(to_http_status);
        AppError::from_provider(status, e.to_string())
    }

    fn record_error(&self, kind: &str) {
        get_metrics()
            .upstream_errors
            .with_label_values(&[self.kind().as_str(), kind])
            .inc();
    }
}

/// Extract canonical error message from provider error payload.
///
/// Handles `{"error": {"message": ...}}`, `{"error": "..."}`,
/// `{"message": ...}` and Gemini's list-wrapped variant.
pub fn extract_error_message(body: &Value) -> Option<String> {
    let body = match body {
        Value::Array(items) => items.first()?,
        other => other,
    };
    body.get("error")
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .or_else(|| body.get("error").and_then(Value::as_str))
        .or_else(|| body.get("message").and_then(Value::as_str))
        .map(str::to_string)
}

/// reqwest and axum depend on different `http` major versions.
pub(crate) fn to_http_status(status: reqwest::StatusCode) -> Option<StatusCode> {
    StatusCode::from_u16(status.as_u16()).ok()
}

fn truncate_message(message: &str) -> String {
    let mut chars = message.chars();
    let truncated: String = chars.by_ref().take(MAX_ERROR_MESSAGE_LEN).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}
