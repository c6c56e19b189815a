//! API request and response models.
//!
//! This module defines the JSON shapes of the chat endpoint, error bodies
//! and the health report.

use crate::core::{AppError, Result};
use crate::services::cv_analysis::CvAnalysisResult;
use crate::services::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"role": "user", "content": "Hello!"}))]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Body of `POST /api/chat`.
///
/// `messages` and `provider` are kept loosely typed so that shape errors
/// surface as the gateway's own 400 responses instead of extractor
/// rejections.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "messages": [{"role": "user", "content": "hi"}],
    "provider": "groq"
}))]
pub struct ChatRequest {
    /// Conversation, oldest first. Required and non-empty.
    #[serde(default)]
    #[schema(value_type = Vec<ChatMessage>)]
    pub messages: Option<serde_json::Value>,

    /// `groq` (default), `gemini` or `xai`
    #[serde(default)]
    pub provider: Option<String>,

    /// Per-provider credential overrides keyed by provider name
    #[serde(default)]
    pub api_keys: Option<HashMap<String, String>>,

    /// Prepended to the conversation as a system message
    #[serde(default)]
    pub system_message: Option<String>,

    /// CV text to analyze instead of chatting
    #[serde(default)]
    pub cv_text: Option<String>,

    /// Stream tokens as server-sent events
    #[serde(default)]
    pub stream: bool,
}

impl ChatRequest {
    /// Validate `messages` into typed chat messages.
    pub fn validated_messages(&self) -> Result<Vec<ChatMessage>> {
        let items = match &self.messages {
            Some(serde_json::Value::Array(items)) if !items.is_empty() => items,
            _ => return Err(AppError::validation("No messages provided")),
        };

        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<ChatMessage>(item.clone()).map_err(|e| {
                    AppError::validation_with(
                        "Invalid message format",
                        format!("message {}: {}", index, e),
                    )
                })
            })
            .collect()
    }

    pub fn provider_kind(&self) -> Result<ProviderKind> {
        ProviderKind::resolve(self.provider.as_deref())
    }

    /// The system message, if one was sent and is not blank.
    pub fn system_message(&self) -> Option<&str> {
        self.system_message
            .as_deref()
            .filter(|s| !s.trim().is_empty())
    }

    /// The CV text, if one was sent and is not blank.
    pub fn cv_text(&self) -> Option<&str> {
        self.cv_text.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Prefix `messages` with the system message when one is given.
pub fn with_system_message(
    system_message: Option<&str>,
    messages: Vec<ChatMessage>,
) -> Vec<ChatMessage> {
    match system_message {
        Some(system) => std::iter::once(ChatMessage::system(system))
            .chain(messages)
            .collect(),
        None => messages,
    }
}

/// Buffered chat completion.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"result": {"output": "Hello! How can I help?"}}))]
pub struct ChatResponse {
    pub result: ChatOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatOutput {
    pub output: String,
}

impl ChatResponse {
    pub fn new(output: impl Into<String>) -> Self {
        Self {
            result: ChatOutput {
                output: output.into(),
            },
        }
    }
}

/// Result of the `cvText` analysis path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CvTextAnalysisResponse {
    pub result: CvAnalysisResult,
}

/// One SSE event of a streamed completion.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StreamToken {
    pub content: String,
}

/// Error body returned by every endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"error": "No messages provided"}))]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,

    /// Underlying cause, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Health report.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub providers: Vec<ProviderStatus>,
    pub cv_analyzer_configured: bool,
}

/// Per-provider health entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderStatus {
    pub name: ProviderKind,
    /// Whether a fallback credential is configured
    pub configured: bool,
    pub model: String,
}

/// Multipart form accepted by `POST /api/cv-analyze` (documentation only).
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct CvUploadForm {
    /// The CV file (PDF, DOCX, ...)
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}
