//! WorkApp Gateway - chat and CV analysis backend for the workplace assistant
//!
//! This library provides the HTTP backend behind the assistant UI:
//!
//! - **Multi-provider chat**: one endpoint routing conversations to Groq, Gemini or xAI
//! - **Streaming Support**: token-by-token relay over Server-Sent Events (SSE)
//! - **CV Analysis**: forwards uploaded CVs to an analysis service, or asks the
//!   selected LLM to analyze pasted CV text, and normalizes the result
//! - **Metrics & Monitoring**: Prometheus metrics for observability
//!
//! # Architecture
//!
//! The codebase is organized into three main layers:
//!
//! - [`core`]: Core functionality (config, errors, logging, metrics, middleware)
//! - [`api`]: HTTP handlers, router and request/response models
//! - [`services`]: Provider clients, credential resolution and CV analysis
//!
//! # Configuration
//!
//! All settings are optional:
//! - `HOST`: Server bind address (default: 0.0.0.0)
//! - `PORT`: Server port (default: 3000)
//! - `GROQ_API_KEY`, `GEMINI_API_KEY`, `XAI_API_KEY`: fallback provider credentials
//! - `CV_ANALYZER_URL`, `CV_ANALYZER_API_KEY`: CV analysis service
//! - `VERIFY_SSL`: Verify SSL certificates for upstream (default: true)
//! - `REQUEST_TIMEOUT_SECS`: Upstream timeout in seconds (default: 60)
//! - `CONFIG_FILE`: Optional YAML/TOML file layered under the environment

pub mod api;
pub mod core;
pub mod services;

// Re-export commonly used types for convenience
pub use api::{router, ApiDoc, AppState, ChatRequest, ChatResponse};
pub use core::{AppConfig, AppError, Result};
pub use services::{CvAnalysisResult, ProviderKind};
