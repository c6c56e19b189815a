//! Error types and handling for the gateway.
//!
//! Every failure is funnelled into [`AppError`], which renders itself as the
//! `{ "error": ..., "details": ... }` JSON body the UI expects.

use crate::api::models::ErrorBody;
use crate::core::logging::{get_provider_context, get_request_id};
use crate::services::provider::ProviderKind;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Message shown for any credential problem, missing or rejected.
pub const AUTH_ERROR_MESSAGE: &str =
    "Invalid or missing API key. Please check your API key settings.";

/// Message shown when the provider refuses for quota or billing reasons.
pub const QUOTA_ERROR_MESSAGE: &str =
    "API quota exceeded or billing issue. Please check your account.";

pub const INTERNAL_ERROR_MESSAGE: &str = "Internal Server Error";

/// Main error type for the application.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed or missing client input
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<String>,
    },

    /// Upload exceeded the configured body limit
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Provider name outside the closed set
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Neither the request nor the environment supplied a credential
    #[error("{} API key is required", .0.display_name())]
    MissingApiKey(ProviderKind),

    /// Provider rejected the credential
    #[error("Provider authentication failed: {0}")]
    ProviderAuth(String),

    /// Provider refused for quota or billing reasons
    #[error("Provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other provider-reported failure
    #[error("Provider error: {0}")]
    Provider(String),

    /// Handler ran past its deadline (seconds)
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Non-success reply from the CV analysis service
    #[error("xAI error: {0}")]
    Upstream(String),

    /// HTTP request errors from the reqwest client
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic internal server errors with custom message
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn validation_with(message: impl Into<String>, details: impl Into<String>) -> Self {
        AppError::Validation {
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Classify a failure reported by an LLM provider.
    ///
    /// The upstream status wins when it is unambiguous (401/403, 429);
    /// otherwise the provider's message is searched for credential or
    /// quota wording.
    pub fn from_provider(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN) => {
                return AppError::ProviderAuth(message)
            }
            Some(StatusCode::TOO_MANY_REQUESTS) => return AppError::QuotaExceeded(message),
            _ => {}
        }

        let lowered = message.to_lowercase();
        if lowered.contains("api key") || lowered.contains("authentication") {
            AppError::ProviderAuth(message)
        } else if lowered.contains("quota") || lowered.contains("billing") {
            AppError::QuotaExceeded(message)
        } else {
            AppError::Provider(message)
        }
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::UnsupportedProvider(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::MissingApiKey(_) | AppError::ProviderAuth(_) => StatusCode::UNAUTHORIZED,
            AppError::QuotaExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Provider(_)
            | AppError::Request(_)
            | AppError::Serialization(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation { .. } | AppError::PayloadTooLarge(_) => "validation",
            AppError::UnsupportedProvider(_) => "config",
            AppError::MissingApiKey(_) | AppError::ProviderAuth(_) => "auth",
            AppError::QuotaExceeded(_) => "quota",
            AppError::Upstream(_) => "upstream",
            AppError::Timeout(_) => "timeout",
            AppError::Provider(_) | AppError::Request(_) => "provider",
            AppError::Serialization(_) | AppError::Internal(_) => "internal",
        }
    }

    fn into_body(self) -> ErrorBody {
        match self {
            AppError::Validation { message, details } => ErrorBody {
                error: message,
                details,
            },
            AppError::MissingApiKey(_) => ErrorBody {
                error: AUTH_ERROR_MESSAGE.to_string(),
                details: Some(self.to_string()),
            },
            AppError::ProviderAuth(msg) => ErrorBody {
                error: AUTH_ERROR_MESSAGE.to_string(),
                details: Some(msg),
            },
            AppError::QuotaExceeded(msg) => ErrorBody {
                error: QUOTA_ERROR_MESSAGE.to_string(),
                details: Some(msg),
            },
            AppError::PayloadTooLarge(_)
            | AppError::UnsupportedProvider(_)
            | AppError::Upstream(_)
            | AppError::Timeout(_) => ErrorBody {
                error: self.to_string(),
                details: None,
            },
            AppError::Provider(msg) | AppError::Internal(msg) => ErrorBody {
                error: INTERNAL_ERROR_MESSAGE.to_string(),
                details: Some(msg),
            },
            AppError::Request(e) => ErrorBody {
                error: INTERNAL_ERROR_MESSAGE.to_string(),
                details: Some(e.to_string()),
            },
            AppError::Serialization(e) => ErrorBody {
                error: INTERNAL_ERROR_MESSAGE.to_string(),
                details: Some(e.to_string()),
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let request_id = get_request_id();
        let provider = get_provider_context();
        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                provider = %provider,
                kind = self.kind(),
                error = %self,
                "Request failed"
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                provider = %provider,
                kind = self.kind(),
                error = %self,
                "Request rejected"
            );
        }

        (status, Json(self.into_body())).into_response()
    }
}

/// Convenience type alias for Results using [`AppError`].
pub type Result<T> = std::result::Result<T, AppError>;
