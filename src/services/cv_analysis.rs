//! CV analysis result model and its normalization.
//!
//! Analysis is always performed elsewhere (the external CV service or an
//! LLM). This module only turns whatever JSON came back into a
//! structurally complete [`CvAnalysisResult`]: every field is defaulted on
//! its own, so a missing or mistyped field never hides the others.

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use utoipa::ToSchema;

/// Complete analysis of one CV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CvAnalysisResult {
    /// 0-100, as reported upstream
    #[schema(value_type = f64)]
    pub overall_score: Number,
    pub sections: Vec<CvSection>,
    pub keywords: KeywordReport,
    /// 0-100, as reported upstream
    #[schema(value_type = f64)]
    pub ats_compatibility: Number,
    pub recommendations: Vec<String>,
}

/// Per-section feedback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CvSection {
    pub name: String,
    #[schema(value_type = f64)]
    pub score: Number,
    pub feedback: String,
    pub suggestions: Vec<String>,
    pub status: SectionStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum SectionStatus {
    Excellent,
    Good,
    NeedsImprovement,
    Missing,
}

impl SectionStatus {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "excellent" => Some(SectionStatus::Excellent),
            "good" => Some(SectionStatus::Good),
            "needs-improvement" => Some(SectionStatus::NeedsImprovement),
            "missing" => Some(SectionStatus::Missing),
            _ => None,
        }
    }
}

/// Keyword coverage. Each list is a set: no duplicates, first occurrence kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KeywordReport {
    pub found: Vec<String>,
    pub missing: Vec<String>,
    pub suggestions: Vec<String>,
}

impl Default for CvAnalysisResult {
    fn default() -> Self {
        Self {
            overall_score: Number::from(0),
            sections: Vec::new(),
            keywords: KeywordReport::default(),
            ats_compatibility: Number::from(0),
            recommendations: Vec::new(),
        }
    }
}

impl CvAnalysisResult {
    /// Build a complete result from an arbitrary upstream JSON value.
    pub fn from_upstream(value: &Value) -> Self {
        let keywords = value.get("keywords");
        Self {
            overall_score: number_or_zero(value.get("overallScore")),
            sections: value
                .get("sections")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(CvSection::from_upstream).collect())
                .unwrap_or_default(),
            keywords: KeywordReport {
                found: string_set(keywords.and_then(|k| k.get("found"))),
                missing: string_set(keywords.and_then(|k| k.get("missing"))),
                suggestions: string_set(keywords.and_then(|k| k.get("suggestions"))),
            },
            ats_compatibility: number_or_zero(value.get("atsCompatibility")),
            recommendations: strings(value.get("recommendations")),
        }
    }
}

impl CvSection {
    /// Non-object entries are dropped; missing fields inside an object are defaulted.
    fn from_upstream(value: &Value) -> Option<Self> {
        value.as_object()?;
        Some(Self {
            name: string_or_empty(value.get("name")),
            score: number_or_zero(value.get("score")),
            feedback: string_or_empty(value.get("feedback")),
            suggestions: strings(value.get("suggestions")),
            status: value
                .get("status")
                .and_then(Value::as_str)
                .and_then(SectionStatus::parse)
                .unwrap_or(SectionStatus::NeedsImprovement),
        })
    }
}

fn number_or_zero(value: Option<&Value>) -> Number {
    value
        .and_then(Value::as_number)
        .cloned()
        .unwrap_or_else(|| Number::from(0))
}

fn string_or_empty(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn string_set(value: Option<&Value>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    strings(value)
        .into_iter()
        .filter(|s| seen.insert(s.clone()))
        .collect()
}
