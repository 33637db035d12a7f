//! SQLite implementations of the analysis-engine collaborator traits

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use analysis_engine::{AnalysisStore, QuotaStore};
use shared_types::{
    Analysis, DetectedLanguage, Document, Issue, PlanTier, SourceKind, Suggestion, UsageSummary,
};

use crate::models::DbAnalysis;

pub struct SqliteAnalysisStore {
    pub db: SqlitePool,
}

pub struct SqliteQuotaStore {
    pub db: SqlitePool,
}

fn source_kind_to_str(kind: SourceKind) -> &'static str {
    match kind {
        SourceKind::UploadedPdf => "uploaded-pdf",
        SourceKind::UploadedWord => "uploaded-word",
        SourceKind::UploadedTextFile => "uploaded-text-file",
        SourceKind::PastedText => "pasted-text",
    }
}

fn language_to_str(language: DetectedLanguage) -> &'static str {
    match language {
        DetectedLanguage::French => "french",
        DetectedLanguage::English => "english",
        DetectedLanguage::Bilingual => "bilingual",
        DetectedLanguage::Other => "other",
    }
}

impl DbAnalysis {
    fn into_analysis(self) -> anyhow::Result<Analysis> {
        let issues: Vec<Issue> = serde_json::from_str(&self.issues_json)?;
        let suggestions: Vec<Suggestion> = serde_json::from_str(&self.suggestions_json)?;
        Ok(Analysis {
            id: self.id,
            owner_id: self.owner_id,
            document_id: self.document_id,
            is_compliant: self.is_compliant,
            compliance_score: self.compliance_score.clamp(0, 100) as u8,
            detected_language: DetectedLanguage::coerce(&self.detected_language),
            french_percentage: self.french_percentage.clamp(0, 100) as u8,
            issues,
            suggestions,
            corrected_text: self.corrected_text,
            model_id: self.model_id,
            processing_ms: self.processing_ms.max(0) as u64,
            created_at: self.created_at,
            completed_at: self.completed_at,
        })
    }
}

const SELECT_ANALYSIS: &str = r#"
    SELECT id, owner_id, document_id, is_compliant, compliance_score,
           detected_language, french_percentage, issues_json, suggestions_json,
           corrected_text, model_id, processing_ms, created_at, completed_at
    FROM analyses
"#;

#[async_trait]
impl AnalysisStore for SqliteAnalysisStore {
    async fn create_document_and_analysis(
        &self,
        document: &Document,
        analysis: &Analysis,
    ) -> anyhow::Result<()> {
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, owner_id, name, source_kind, text, stored_file, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&document.id)
        .bind(&document.owner_id)
        .bind(&document.name)
        .bind(source_kind_to_str(document.source_kind))
        .bind(&document.text)
        .bind(&document.stored_file)
        .bind(document.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO analyses (id, owner_id, document_id, is_compliant, compliance_score,
                                  detected_language, french_percentage, issues_json,
                                  suggestions_json, corrected_text, model_id, processing_ms,
                                  created_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&analysis.id)
        .bind(&analysis.owner_id)
        .bind(&analysis.document_id)
        .bind(analysis.is_compliant)
        .bind(analysis.compliance_score as i64)
        .bind(language_to_str(analysis.detected_language))
        .bind(analysis.french_percentage as i64)
        .bind(serde_json::to_string(&analysis.issues)?)
        .bind(serde_json::to_string(&analysis.suggestions)?)
        .bind(&analysis.corrected_text)
        .bind(&analysis.model_id)
        .bind(analysis.processing_ms as i64)
        .bind(analysis.created_at.to_rfc3339())
        .bind(analysis.completed_at.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get_analysis(&self, owner_id: &str, id: &str) -> anyhow::Result<Option<Analysis>> {
        let row: Option<DbAnalysis> =
            sqlx::query_as(&format!("{SELECT_ANALYSIS} WHERE id = ? AND owner_id = ?"))
                .bind(id)
                .bind(owner_id)
                .fetch_optional(&self.db)
                .await?;

        row.map(DbAnalysis::into_analysis).transpose()
    }

    async fn list_analyses(
        &self,
        owner_id: &str,
        page: u32,
        page_size: u32,
    ) -> anyhow::Result<(Vec<Analysis>, u64)> {
        let offset = (page.saturating_sub(1) as i64) * page_size as i64;
        let rows: Vec<DbAnalysis> = sqlx::query_as(&format!(
            "{SELECT_ANALYSIS} WHERE owner_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?"
        ))
        .bind(owner_id)
        .bind(page_size as i64)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;

        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM analyses WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(&self.db)
            .await?;

        let analyses = rows
            .into_iter()
            .map(DbAnalysis::into_analysis)
            .collect::<anyhow::Result<Vec<_>>>()?;
        Ok((analyses, total.max(0) as u64))
    }

    async fn delete_analysis_and_document(
        &self,
        owner_id: &str,
        id: &str,
    ) -> anyhow::Result<bool> {
        let mut tx = self.db.begin().await?;

        let document_id: Option<(String,)> =
            sqlx::query_as("SELECT document_id FROM analyses WHERE id = ? AND owner_id = ?")
                .bind(id)
                .bind(owner_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some((document_id,)) = document_id else {
            return Ok(false);
        };

        sqlx::query("DELETE FROM analyses WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM documents WHERE id = ? AND owner_id = ?")
            .bind(&document_id)
            .bind(owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}

impl SqliteQuotaStore {
    /// Look up the caller's tier to derive the monthly limit. Callers
    /// without a subscription row are free tier.
    async fn monthly_limit(&self, owner_id: &str) -> anyhow::Result<u32> {
        let tier: Option<(String,)> =
            sqlx::query_as("SELECT tier FROM subscriptions WHERE user_id = ?")
                .bind(owner_id)
                .fetch_optional(&self.db)
                .await?;
        let tier = match tier.as_ref().map(|(t,)| t.as_str()) {
            Some("pro") => PlanTier::Pro,
            Some("business") => PlanTier::Business,
            _ => PlanTier::Free,
        };
        Ok(tier.monthly_limit())
    }
}

#[async_trait]
impl QuotaStore for SqliteQuotaStore {
    async fn get_usage(&self, owner_id: &str) -> anyhow::Result<UsageSummary> {
        let now = Utc::now();
        let row: Option<(i64, chrono::DateTime<Utc>)> =
            sqlx::query_as("SELECT used, period_start FROM usage_counters WHERE user_id = ?")
                .bind(owner_id)
                .fetch_optional(&self.db)
                .await?;

        let limit = self.monthly_limit(owner_id).await?;

        let summary = match row {
            Some((used, period_start)) => {
                let summary = UsageSummary {
                    used: used.max(0) as u32,
                    limit,
                    period_start,
                };
                if summary.is_stale(now) {
                    // New calendar month: roll the counter.
                    sqlx::query(
                        "UPDATE usage_counters SET used = 0, period_start = ? WHERE user_id = ?",
                    )
                    .bind(now.to_rfc3339())
                    .bind(owner_id)
                    .execute(&self.db)
                    .await?;
                    UsageSummary {
                        used: 0,
                        limit,
                        period_start: now,
                    }
                } else {
                    summary
                }
            }
            None => {
                sqlx::query(
                    "INSERT INTO usage_counters (user_id, used, period_start) VALUES (?, 0, ?)",
                )
                .bind(owner_id)
                .bind(now.to_rfc3339())
                .execute(&self.db)
                .await?;
                UsageSummary {
                    used: 0,
                    limit,
                    period_start: now,
                }
            }
        };

        Ok(summary)
    }

    async fn increment_usage(&self, owner_id: &str) -> anyhow::Result<u32> {
        // get_usage creates or rolls the row as needed; the increment
        // itself is a single atomic UPDATE, and RETURNING reports the
        // stored value so concurrent increments each see their own count.
        self.get_usage(owner_id).await?;
        let (used,): (i64,) =
            sqlx::query_as("UPDATE usage_counters SET used = used + 1 WHERE user_id = ? RETURNING used")
                .bind(owner_id)
                .fetch_one(&self.db)
                .await?;
        Ok(used.max(0) as u32)
    }
}
