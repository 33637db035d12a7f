//! Collaborator contracts consumed by the orchestrators
//!
//! Implementations live in the application (SQLite stores, the Anthropic
//! client); tests use in-memory mocks.

use async_trait::async_trait;

use shared_types::{Analysis, Document, PlanTier, SubscriptionStatus, UsageSummary};

/// The authenticated caller, as established by the upstream identity
/// layer. Authentication mechanics are outside this crate.
#[derive(Debug, Clone)]
pub struct Caller {
    pub user_id: String,
    pub tier: PlanTier,
    pub status: SubscriptionStatus,
}

impl Caller {
    /// Paid tiers with an active or trialing subscription bypass the
    /// monthly quota and are never metered.
    pub fn is_unlimited(&self) -> bool {
        self.tier.is_paid() && self.status.is_entitled()
    }
}

/// Hosted text-generation API. One call per analysis; errors propagate
/// with no structured retry metadata assumed.
#[async_trait]
pub trait InferenceEngine: Send + Sync {
    async fn invoke(
        &self,
        system_prompt: &str,
        user_message: &str,
        max_output_tokens: u32,
        model_id: &str,
    ) -> anyhow::Result<String>;
}

/// Document/Analysis persistence.
#[async_trait]
pub trait AnalysisStore: Send + Sync {
    /// Commit a document and its analysis as one transaction: both rows
    /// or neither.
    async fn create_document_and_analysis(
        &self,
        document: &Document,
        analysis: &Analysis,
    ) -> anyhow::Result<()>;

    async fn get_analysis(&self, owner_id: &str, id: &str) -> anyhow::Result<Option<Analysis>>;

    /// Page through a caller's analyses, newest first. Returns the page
    /// and the total count.
    async fn list_analyses(
        &self,
        owner_id: &str,
        page: u32,
        page_size: u32,
    ) -> anyhow::Result<(Vec<Analysis>, u64)>;

    /// Delete an analysis and its document atomically. Returns false if
    /// the analysis did not exist for this owner.
    async fn delete_analysis_and_document(&self, owner_id: &str, id: &str)
        -> anyhow::Result<bool>;
}

/// Monthly usage accounting. The orchestrator treats this as an atomic
/// check-then-increment resource; it never caches values across calls.
#[async_trait]
pub trait QuotaStore: Send + Sync {
    /// Current usage for the caller. Implementations reset `used` to 0
    /// when the wall-clock month differs from `period_start`'s month.
    async fn get_usage(&self, owner_id: &str) -> anyhow::Result<UsageSummary>;

    /// Atomically add one analysis to the caller's counter. Returns the
    /// new count.
    async fn increment_usage(&self, owner_id: &str) -> anyhow::Result<u32>;
}
