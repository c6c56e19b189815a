//! `POST /api/cv-analyze`: forward an uploaded CV to the analysis service.

use crate::api::handlers::AppState;
use crate::api::models::{CvUploadForm, ErrorBody};
use crate::core::middleware::ProviderName;
use crate::core::{AppError, Result};
use crate::services::{CvAnalysisResult, CvAnalyzerClient, CvUpload};
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

const FILE_FIELD: &str = "file";
const NO_FILE_MESSAGE: &str = "No file uploaded";

#[utoipa::path(
    post,
    path = "/api/cv-analyze",
    tag = "cv",
    request_body(content = CvUploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Normalized analysis", body = CvAnalysisResult),
        (status = 400, description = "No file uploaded", body = ErrorBody),
        (status = 413, description = "File exceeds the upload limit", body = ErrorBody),
        (status = 502, description = "Analysis service returned an error", body = ErrorBody),
        (status = 500, description = "Internal failure", body = ErrorBody)
    )
)]
#[tracing::instrument(skip(state, multipart))]
pub async fn cv_analyze(
    State(state): State<Arc<AppState>>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Response> {
    let mut multipart = multipart
        .map_err(|rejection| AppError::validation_with(NO_FILE_MESSAGE, rejection.body_text()))?;

    let upload = read_file_field(&mut multipart)
        .await?
        .ok_or_else(|| AppError::validation(NO_FILE_MESSAGE))?;

    let client = CvAnalyzerClient::from_config(state.http_client.clone(), &state.config);
    let result = client.analyze(upload).await;

    let mut response = result.map(Json).into_response();
    response
        .extensions_mut()
        .insert(ProviderName("cv_analyzer".to_string()));
    Ok(response)
}

/// Find the `file` field; other fields are skipped.
async fn read_file_field(multipart: &mut Multipart) -> Result<Option<CvUpload>> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;

        return Ok(Some(CvUpload {
            file_name,
            content_type,
            bytes,
        }));
    }
    Ok(None)
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::validation_with("Invalid multipart body", e.body_text())
    }
}
