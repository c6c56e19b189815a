//! `POST /api/chat`: chat completions and CV text analysis.

use crate::api::handlers::AppState;
use crate::api::models::{
    with_system_message, ChatMessage, ChatRequest, ChatResponse, CvTextAnalysisResponse,
    ErrorBody,
};
use crate::api::streaming::create_sse_stream;
use crate::core::logging::{get_request_id, PROVIDER_CONTEXT};
use crate::core::middleware::ProviderName;
use crate::core::{AppError, Result};
use crate::services::cv_text::analyze_cv_text;
use crate::services::{resolve_api_key, ProviderClient, ProviderEndpoint, ProviderKind};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use std::time::Duration;

/// Route a conversation to the selected provider.
///
/// Checks run in a fixed order: messages, then provider, then credential.
/// With `cvText` set the request becomes a CV analysis; with `stream` set
/// the reply is a server-sent event stream.
#[utoipa::path(
    post,
    path = "/api/chat",
    tag = "chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Completion, CV analysis, or an SSE token stream", body = ChatResponse),
        (status = 400, description = "Invalid messages or unsupported provider", body = ErrorBody),
        (status = 401, description = "Missing or rejected API key", body = ErrorBody),
        (status = 429, description = "Provider quota exceeded", body = ErrorBody),
        (status = 500, description = "Provider or internal failure", body = ErrorBody),
        (status = 504, description = "Provider did not answer in time", body = ErrorBody)
    )
)]
#[tracing::instrument(skip(state, payload))]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(request) = payload.map_err(|rejection| {
        AppError::validation_with("Invalid request body", rejection.body_text())
    })?;

    let messages = request.validated_messages()?;
    let kind = request.provider_kind()?;

    let timeout_secs = state.config.chat_timeout_secs;
    let mut response = PROVIDER_CONTEXT
        .scope(kind.as_str().to_string(), async {
            let dispatched = tokio::time::timeout(
                Duration::from_secs(timeout_secs),
                dispatch(&state, &request, kind, messages),
            )
            .await
            .unwrap_or_else(|_| Err(AppError::Timeout(timeout_secs)));
            dispatched.into_response()
        })
        .await;

    response
        .extensions_mut()
        .insert(ProviderName(kind.as_str().to_string()));
    Ok(response)
}

async fn dispatch(
    state: &AppState,
    request: &ChatRequest,
    kind: ProviderKind,
    messages: Vec<ChatMessage>,
) -> Result<Response> {
    let config = state.config.providers.get(kind);
    let api_key = resolve_api_key(kind, request.api_keys.as_ref(), config)?;

    tracing::info!(
        request_id = %get_request_id(),
        provider = %kind,
        model = %config.model,
        stream = request.stream,
        cv_text = request.cv_text().is_some(),
        "Using provider"
    );

    let client = ProviderClient::new(
        kind,
        state.http_client.clone(),
        ProviderEndpoint::new(&config.api_base, api_key, &config.model),
    );

    if let Some(cv_text) = request.cv_text() {
        let result = analyze_cv_text(&client, cv_text, request.system_message()).await?;
        return Ok(Json(CvTextAnalysisResponse { result }).into_response());
    }

    let messages = with_system_message(request.system_message(), messages);

    if request.stream {
        let upstream = client.open_stream(&messages).await?;
        return Ok(create_sse_stream(upstream, client));
    }

    let output = client.complete(&messages).await?;
    Ok(Json(ChatResponse::new(output)).into_response())
}
