//! Application state for the Loi 96 API

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

use analysis_engine::{Caller, DocumentAnalyzer, SignageAnalyzer};
use rate_limit::MemoryBackend;
use shared_types::{PlanTier, SubscriptionStatus};

use crate::inference::AnthropicClient;
use crate::store::{SqliteAnalysisStore, SqliteQuotaStore};

pub struct AppState {
    pub db: SqlitePool,
    pub counter: Arc<MemoryBackend>,
    pub quota: Arc<SqliteQuotaStore>,
    pub store: Arc<SqliteAnalysisStore>,
    pub document_analyzer: DocumentAnalyzer,
    pub signage_analyzer: SignageAnalyzer,
}

impl AppState {
    pub async fn new(model_id: &str) -> Result<Self> {
        let db_path = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            let data_dir = dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("loi96-api");
            std::fs::create_dir_all(&data_dir).ok();
            format!("sqlite:{}/loi96.db?mode=rwc", data_dir.display())
        });

        tracing::info!("Connecting to database: {}", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_path)
            .await?;

        Self::run_migrations(&pool).await?;

        let api_key =
            std::env::var("ANTHROPIC_API_KEY").context("ANTHROPIC_API_KEY must be set")?;
        let inference = Arc::new(AnthropicClient::new(api_key)?);

        let counter = Arc::new(MemoryBackend::new());
        let quota = Arc::new(SqliteQuotaStore { db: pool.clone() });
        let store = Arc::new(SqliteAnalysisStore { db: pool.clone() });

        let document_analyzer = DocumentAnalyzer::new(
            inference.clone(),
            store.clone(),
            quota.clone(),
            counter.clone(),
            model_id,
        );
        let signage_analyzer =
            SignageAnalyzer::new(inference, quota.clone(), counter.clone(), model_id);

        Ok(Self {
            db: pool,
            counter,
            quota,
            store,
            document_analyzer,
            signage_analyzer,
        })
    }

    /// Resolve the caller's tier and status from the subscriptions table.
    /// Users without a row are free tier.
    pub async fn caller(&self, user_id: &str) -> Result<Caller> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT tier, status FROM subscriptions WHERE user_id = ?")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;

        let (tier, status) = match row {
            Some((tier, status)) => {
                let tier = match tier.as_str() {
                    "pro" => PlanTier::Pro,
                    "business" => PlanTier::Business,
                    _ => PlanTier::Free,
                };
                let status = match status.as_str() {
                    "active" => SubscriptionStatus::Active,
                    "trialing" => SubscriptionStatus::Trialing,
                    "past_due" => SubscriptionStatus::PastDue,
                    _ => SubscriptionStatus::Canceled,
                };
                (tier, status)
            }
            None => (PlanTier::Free, SubscriptionStatus::Active),
        };

        Ok(Caller {
            user_id: user_id.to_string(),
            tier,
            status,
        })
    }

    pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                name TEXT NOT NULL,
                source_kind TEXT NOT NULL,
                text TEXT NOT NULL,
                stored_file TEXT,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS analyses (
                id TEXT PRIMARY KEY,
                owner_id TEXT NOT NULL,
                document_id TEXT NOT NULL REFERENCES documents(id),
                is_compliant INTEGER NOT NULL,
                compliance_score INTEGER NOT NULL,
                detected_language TEXT NOT NULL,
                french_percentage INTEGER NOT NULL,
                issues_json TEXT NOT NULL DEFAULT '[]',
                suggestions_json TEXT NOT NULL DEFAULT '[]',
                corrected_text TEXT,
                model_id TEXT NOT NULL,
                processing_ms INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                completed_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS subscriptions (
                user_id TEXT PRIMARY KEY,
                tier TEXT NOT NULL DEFAULT 'free',
                status TEXT NOT NULL DEFAULT 'active'
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS usage_counters (
                user_id TEXT PRIMARY KEY,
                used INTEGER NOT NULL DEFAULT 0,
                period_start TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        // Index for history lookups
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_analyses_owner ON analyses(owner_id, created_at)
            "#,
        )
        .execute(pool)
        .await?;

        tracing::info!("Migrations complete");
        Ok(())
    }
}

/// Get platform-specific data directory
mod dirs {
    use std::path::PathBuf;

    pub fn data_dir() -> Option<PathBuf> {
        #[cfg(target_os = "macos")]
        {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join("Library/Application Support"))
        }
        #[cfg(target_os = "linux")]
        {
            std::env::var("XDG_DATA_HOME")
                .ok()
                .map(PathBuf::from)
                .or_else(|| {
                    std::env::var("HOME")
                        .ok()
                        .map(|h| PathBuf::from(h).join(".local/share"))
                })
        }
        #[cfg(target_os = "windows")]
        {
            std::env::var("APPDATA").ok().map(PathBuf::from)
        }
        #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
        {
            None
        }
    }
}
