//! Business logic services for the gateway.
//!
//! Provider selection and credentials, the LLM clients, and CV analysis
//! (both the external service and the LLM-backed text path).

pub mod cv_analysis;
pub mod cv_analyzer;
pub mod cv_text;
pub mod llm_client;
pub mod provider;

// Re-export commonly used types
pub use cv_analysis::{CvAnalysisResult, CvSection, KeywordReport, SectionStatus};
pub use cv_analyzer::{CvAnalyzerClient, CvUpload};
pub use llm_client::{ProviderClient, ProviderEndpoint, StreamEvent};
pub use provider::{resolve_api_key, ProviderKind};
