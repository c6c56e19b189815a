//! Client for the external CV analysis service.

use crate::core::config::AppConfig;
use crate::core::logging::get_request_id;
use crate::core::metrics::get_metrics;
use crate::core::{AppError, Result};
use crate::services::cv_analysis::CvAnalysisResult;
use bytes::Bytes;
use serde_json::Value;
use std::time::Instant;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// An uploaded CV, forwarded as-is.
#[derive(Debug, Clone)]
pub struct CvUpload {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct CvAnalyzerClient {
    http: reqwest::Client,
    url: String,
    api_key: Option<String>,
}

impl CvAnalyzerClient {
    pub fn new(http: reqwest::Client, url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            http,
            url: url.into(),
            api_key,
        }
    }

    pub fn from_config(http: reqwest::Client, config: &AppConfig) -> Self {
        Self::new(
            http,
            config.cv_analyzer.url.clone(),
            config.cv_analyzer_key().map(str::to_string),
        )
    }

    /// Send the document to the analysis service and normalize its reply.
    pub async fn analyze(&self, upload: CvUpload) -> Result<CvAnalysisResult> {
        let start = Instant::now();
        let content_type = upload
            .content_type
            .as_deref()
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let mut request = self
            .http
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, content_type);
        match self.api_key.as_deref() {
            Some(key) => request = request.bearer_auth(key),
            None => tracing::warn!("No CV analyzer credential configured, sending unauthenticated"),
        }

        tracing::debug!(
            file_name = upload.file_name.as_deref().unwrap_or("<unnamed>"),
            content_type = content_type,
            size = upload.bytes.len(),
            "Forwarding CV to analysis service"
        );

        let response = request.body(upload.bytes).send().await.map_err(|e| {
            record_error("transport");
            AppError::Internal(format!("CV analysis request failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            record_error("upstream");
            tracing::warn!(
                request_id = %get_request_id(),
                status = status.as_u16(),
                "CV analysis service returned an error"
            );
            return Err(AppError::Upstream(text));
        }

        let body: Value = response.json().await.map_err(|e| {
            record_error("decode");
            AppError::Internal(format!("Invalid CV analysis response: {}", e))
        })?;

        get_metrics()
            .upstream_latency
            .with_label_values(&["cv_analyzer", "cv"])
            .observe(start.elapsed().as_secs_f64());

        Ok(CvAnalysisResult::from_upstream(&body))
    }
}

fn record_error(kind: &str) {
    get_metrics()
        .upstream_errors
        .with_label_values(&["cv_analyzer", kind])
        .inc();
}
