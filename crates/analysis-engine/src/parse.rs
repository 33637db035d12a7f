//! Strict parsing of inference-engine output
//!
//! Provider output is untrusted, loosely-typed data. It is parsed into a
//! permissive intermediate representation, then every field is validated
//! or coerced into the closed domain types before anything is persisted
//! or returned. Scores are clamped into [0, 100] regardless of what the
//! model claimed, as a defense against an injection that forges an
//! out-of-range verdict.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use shared_types::{DetectedLanguage, Issue, IssueSeverity, IssueType, Suggestion};

lazy_static! {
    /// Greedy first-to-last brace span, used when the model wraps its JSON
    /// in prose or fences.
    static ref BRACE_SPAN: Regex = Regex::new(r"(?s)\{.*\}").expect("brace span regex");
}

/// Permissive mirror of the document-analysis response contract.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAnalysis {
    pub is_compliant: bool,
    pub compliance_score: f64,
    pub detected_language: String,
    pub french_percentage: f64,
    #[serde(default)]
    pub issues: Vec<RawIssue>,
    #[serde(default)]
    pub suggestions: Vec<RawSuggestion>,
    #[serde(default)]
    pub corrected_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawIssue {
    #[serde(rename = "type", default)]
    pub issue_type: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSuggestion {
    #[serde(default)]
    pub issue_index: usize,
    #[serde(default)]
    pub original_text: String,
    #[serde(default)]
    pub suggested_text: String,
    #[serde(default)]
    pub explanation: String,
}

/// Permissive mirror of the signage response contract.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSignage {
    pub score: f64,
    #[serde(default)]
    pub problems: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub corrected_description: String,
}

/// Parse the provider's text payload: direct JSON first, then the first
/// greedy brace-matched span. Both failing is terminal; there is no
/// partial-result fallback.
pub fn parse_payload<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    match serde_json::from_str::<T>(raw) {
        Ok(parsed) => Ok(parsed),
        Err(direct_err) => {
            if let Some(span) = BRACE_SPAN.find(raw) {
                serde_json::from_str::<T>(span.as_str())
                    .map_err(|e| format!("unparseable analysis payload: {e}"))
            } else {
                Err(format!("no JSON object in analysis payload: {direct_err}"))
            }
        }
    }
}

/// Clamp an untrusted numeric score into [0, 100].
pub fn clamp_score(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.clamp(0.0, 100.0).round() as u8
}

/// Coerce raw issues into domain issues with stable synthetic ids.
pub fn coerce_issues(raw: Vec<RawIssue>) -> Vec<Issue> {
    raw.into_iter()
        .enumerate()
        .map(|(index, issue)| Issue {
            id: format!("issue-{index}"),
            issue_type: IssueType::coerce(&issue.issue_type),
            severity: IssueSeverity::coerce(&issue.severity),
            description: issue.description,
            location: issue.location,
            original_text: issue.original_text,
        })
        .collect()
}

/// Coerce raw suggestions, linking each to an issue by its declared
/// index, not by content matching.
pub fn coerce_suggestions(raw: Vec<RawSuggestion>) -> Vec<Suggestion> {
    raw.into_iter()
        .enumerate()
        .map(|(index, suggestion)| Suggestion {
            id: format!("suggestion-{index}"),
            issue_index: suggestion.issue_index,
            original_text: suggestion.original_text,
            suggested_text: suggestion.suggested_text,
            explanation: suggestion.explanation,
        })
        .collect()
}

/// Coerce the raw language string into the closed enum.
pub fn coerce_language(raw: &str) -> DetectedLanguage {
    DetectedLanguage::coerce(raw)
}
