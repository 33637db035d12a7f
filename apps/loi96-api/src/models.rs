//! Data models for the Loi 96 API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shared_types::{Analysis, SignageReport, UsageSummary};

/// Analysis row as stored in SQLite. Issues and suggestions are JSON
/// blobs; enum columns are their wire spellings.
#[derive(Debug, Clone, FromRow)]
pub struct DbAnalysis {
    pub id: String,
    pub owner_id: String,
    pub document_id: String,
    pub is_compliant: bool,
    pub compliance_score: i64,
    pub detected_language: String,
    pub french_percentage: i64,
    pub issues_json: String,
    pub suggestions_json: String,
    pub corrected_text: Option<String>,
    pub model_id: String,
    pub processing_ms: i64,
    pub created_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Request to analyze a document. Exactly one of `text` or
/// `file_base64`+`mime_type` must be provided.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeApiRequest {
    pub document_name: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub file_base64: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// Request to analyze a signage description.
#[derive(Debug, Clone, Deserialize)]
pub struct SignageApiRequest {
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzeApiResponse {
    pub success: bool,
    pub analysis: Analysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignageApiResponse {
    pub success: bool,
    pub report: SignageReport,
}

/// Pagination parameters for the history listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResponse {
    pub items: Vec<Analysis>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UsageResponse {
    pub used: u32,
    pub limit: u32,
    pub remaining: u32,
    pub period_start: DateTime<Utc>,
    pub unlimited: bool,
}

impl UsageResponse {
    pub fn from_summary(summary: UsageSummary, unlimited: bool) -> Self {
        Self {
            used: summary.used,
            limit: summary.limit,
            remaining: summary.remaining(),
            period_start: summary.period_start,
            unlimited,
        }
    }
}
