//! CV analysis over pasted text, performed by the selected LLM.

use crate::api::models::{with_system_message, ChatMessage};
use crate::core::Result;
use crate::services::cv_analysis::CvAnalysisResult;
use crate::services::llm_client::ProviderClient;
use serde_json::Value;

pub const ANALYZER_INSTRUCTION: &str = "You are a professional CV analyzer. Analyze the provided \
CV text and provide actionable feedback, section analysis, keyword suggestions, and \
recommendations for improvement. Be concise, clear, and helpful. Reply with a single JSON \
object with the fields overallScore (0-100), sections (name, score, feedback, suggestions, \
status), keywords (found, missing, suggestions), atsCompatibility (0-100) and recommendations.";

pub fn format_prompt(cv_text: &str) -> String {
    format!("{}\n\nCV Content:\n{}", ANALYZER_INSTRUCTION, cv_text)
}

pub fn build_messages(cv_text: &str, system_message: Option<&str>) -> Vec<ChatMessage> {
    with_system_message(system_message, vec![ChatMessage::user(format_prompt(cv_text))])
}

/// Map model output to a result.
///
/// A JSON object, bare or inside a fenced code block, is normalized; any
/// other output becomes the single recommendation.
pub fn map_output(output: &str) -> CvAnalysisResult {
    match serde_json::from_str::<Value>(strip_code_fence(output)) {
        Ok(value @ Value::Object(_)) => CvAnalysisResult::from_upstream(&value),
        _ if output.trim().is_empty() => CvAnalysisResult::default(),
        _ => CvAnalysisResult {
            recommendations: vec![output.trim().to_string()],
            ..Default::default()
        },
    }
}

fn strip_code_fence(output: &str) -> &str {
    let trimmed = output.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") up to the first newline
    let body = rest.split_once('\n').map_or(rest, |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub async fn analyze_cv_text(
    client: &ProviderClient,
    cv_text: &str,
    system_message: Option<&str>,
) -> Result<CvAnalysisResult> {
    let messages = build_messages(cv_text, system_message);
    let output = client.complete(&messages).await?;
    tracing::debug!(
        provider = %client.kind(),
        output_len = output.len(),
        "CV text analysis completed"
    );
    Ok(map_output(&output))
}
