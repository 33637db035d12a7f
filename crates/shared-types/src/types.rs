use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the analyzed text entered the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    UploadedPdf,
    UploadedWord,
    UploadedTextFile,
    PastedText,
}

/// Predominant language detected in the document.
///
/// Spellings are part of the inference-engine wire contract and must not
/// change: `"french" | "english" | "bilingual" | "other"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectedLanguage {
    French,
    English,
    Bilingual,
    Other,
}

impl DetectedLanguage {
    /// Coerce an untrusted provider string into the closed set.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "french" => Self::French,
            "english" => Self::English,
            "bilingual" => Self::Bilingual,
            _ => Self::Other,
        }
    }
}

/// Closed set of compliance issue categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IssueType {
    LanguagePredominance,
    MissingFrenchTerm,
    EnglishOnly,
    FrenchNotFirst,
    TaxTerminology,
    BusinessTerminology,
    ContractClause,
    LegalMention,
    ButtonLabel,
    Other,
}

impl IssueType {
    /// Coerce an untrusted provider string into the closed set.
    /// Unknown categories fall back to `Other` rather than failing the parse.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "language-predominance" => Self::LanguagePredominance,
            "missing-french-term" => Self::MissingFrenchTerm,
            "english-only" => Self::EnglishOnly,
            "french-not-first" => Self::FrenchNotFirst,
            "tax-terminology" => Self::TaxTerminology,
            "business-terminology" => Self::BusinessTerminology,
            "contract-clause" => Self::ContractClause,
            "legal-mention" => Self::LegalMention,
            "button-label" => Self::ButtonLabel,
            _ => Self::Other,
        }
    }
}

/// Issue severity. Wire spelling is `"HIGH" | "MEDIUM" | "LOW"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueSeverity {
    High,
    Medium,
    Low,
}

impl IssueSeverity {
    /// Coerce an untrusted provider string; unknown severities become Medium.
    pub fn coerce(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "HIGH" => Self::High,
            "LOW" => Self::Low,
            _ => Self::Medium,
        }
    }
}

/// A single compliance problem found in the analyzed text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Synthetic stable id (`issue-{index}`), assigned by the orchestrator.
    pub id: String,
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    pub severity: IssueSeverity,
    pub description: String,
    /// Where in the document the issue was found, if the model located it.
    pub location: Option<String>,
    /// Offending excerpt from the original text.
    pub original_text: Option<String>,
}

/// A proposed correction, linked to an [`Issue`] by its declared index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    /// Synthetic stable id (`suggestion-{index}`).
    pub id: String,
    /// Index into the analysis' issue list. Linked by index, not by
    /// content matching.
    pub issue_index: usize,
    pub original_text: String,
    pub suggested_text: String,
    pub explanation: String,
}

/// An uploaded or pasted document. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub owner_id: String,
    pub name: String,
    pub source_kind: SourceKind,
    /// Extracted raw text, already truncated to the analysis limit.
    pub text: String,
    /// Reference to the stored original file, when one was kept.
    pub stored_file: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The persisted result of one compliance analysis. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Analysis {
    pub id: String,
    pub owner_id: String,
    pub document_id: String,
    pub is_compliant: bool,
    /// Always clamped into [0, 100] before storage.
    pub compliance_score: u8,
    pub detected_language: DetectedLanguage,
    /// Always clamped into [0, 100] before storage.
    pub french_percentage: u8,
    pub issues: Vec<Issue>,
    pub suggestions: Vec<Suggestion>,
    pub corrected_text: Option<String>,
    /// Inference model identifier used for this analysis.
    pub model_id: String,
    pub processing_ms: u64,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Result of a signage-description analysis. Not persisted as a Document;
/// only the caller's quota increment is durable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignageReport {
    /// Clamped into [0, 100].
    pub score: u8,
    pub problems: Vec<String>,
    pub suggestions: Vec<String>,
    pub corrected_description: String,
    pub model_id: String,
    pub processing_ms: u64,
}
