//! In-memory collaborator mocks shared by the orchestrator tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;

use rate_limit::MemoryBackend;
use shared_types::{Analysis, Document, PlanTier, SubscriptionStatus, UsageSummary};

use crate::analyzer::DocumentAnalyzer;
use crate::signage::SignageAnalyzer;
use crate::traits::{AnalysisStore, Caller, InferenceEngine, QuotaStore};

pub(crate) const TEST_MODEL: &str = "claude-sonnet-4-test";

pub(crate) struct MockEngine {
    response: String,
    calls: AtomicUsize,
    last_user_message: Mutex<String>,
}

impl MockEngine {
    fn new(response: &str) -> Arc<Self> {
        Arc::new(Self {
            response: response.to_string(),
            calls: AtomicUsize::new(0),
            last_user_message: Mutex::new(String::new()),
        })
    }
}

#[async_trait]
impl InferenceEngine for MockEngine {
    async fn invoke(
        &self,
        _system_prompt: &str,
        user_message: &str,
        _max_output_tokens: u32,
        _model_id: &str,
    ) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_user_message.lock().unwrap() = user_message.to_string();
        Ok(self.response.clone())
    }
}

pub(crate) struct MockStore {
    persisted: AtomicUsize,
    fail: bool,
}

#[async_trait]
impl AnalysisStore for MockStore {
    async fn create_document_and_analysis(
        &self,
        _document: &Document,
        _analysis: &Analysis,
    ) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("database unavailable");
        }
        self.persisted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_analysis(&self, _owner_id: &str, _id: &str) -> anyhow::Result<Option<Analysis>> {
        Ok(None)
    }

    async fn list_analyses(
        &self,
        _owner_id: &str,
        _page: u32,
        _page_size: u32,
    ) -> anyhow::Result<(Vec<Analysis>, u64)> {
        Ok((Vec::new(), 0))
    }

    async fn delete_analysis_and_document(
        &self,
        _owner_id: &str,
        _id: &str,
    ) -> anyhow::Result<bool> {
        Ok(false)
    }
}

pub(crate) struct MockQuota {
    used: u32,
    limit: u32,
    increments: AtomicUsize,
    broken: bool,
}

#[async_trait]
impl QuotaStore for MockQuota {
    async fn get_usage(&self, _owner_id: &str) -> anyhow::Result<UsageSummary> {
        Ok(UsageSummary {
            used: self.used,
            limit: self.limit,
            period_start: Utc::now(),
        })
    }

    async fn increment_usage(&self, _owner_id: &str) -> anyhow::Result<u32> {
        if self.broken {
            anyhow::bail!("usage counter unavailable");
        }
        self.increments.fetch_add(1, Ordering::SeqCst);
        Ok(self.used + 1)
    }
}

/// Handles into the mocks for post-run assertions.
pub(crate) struct Probes {
    engine: Arc<MockEngine>,
    store: Arc<MockStore>,
    quota: Arc<MockQuota>,
}

impl Probes {
    pub(crate) fn inference_calls(&self) -> usize {
        self.engine.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn persisted(&self) -> usize {
        self.store.persisted.load(Ordering::SeqCst)
    }

    pub(crate) fn increments(&self) -> usize {
        self.quota.increments.load(Ordering::SeqCst)
    }

    pub(crate) fn last_user_message(&self) -> String {
        self.engine.last_user_message.lock().unwrap().clone()
    }
}

pub(crate) fn quota_at(used: u32, limit: u32) -> Arc<MockQuota> {
    Arc::new(MockQuota {
        used,
        limit,
        increments: AtomicUsize::new(0),
        broken: false,
    })
}

pub(crate) fn broken_quota() -> Arc<MockQuota> {
    Arc::new(MockQuota {
        used: 0,
        limit: 3,
        increments: AtomicUsize::new(0),
        broken: true,
    })
}

pub(crate) fn store_ok() -> Arc<MockStore> {
    Arc::new(MockStore {
        persisted: AtomicUsize::new(0),
        fail: false,
    })
}

pub(crate) fn failing_store() -> Arc<MockStore> {
    Arc::new(MockStore {
        persisted: AtomicUsize::new(0),
        fail: true,
    })
}

pub(crate) fn caller_free() -> Caller {
    Caller {
        user_id: "user-free-0001".into(),
        tier: PlanTier::Free,
        status: SubscriptionStatus::Active,
    }
}

pub(crate) fn caller_paid() -> Caller {
    Caller {
        user_id: "user-paid-0001".into(),
        tier: PlanTier::Pro,
        status: SubscriptionStatus::Trialing,
    }
}

pub(crate) fn engine_with(
    response: &str,
    quota: Arc<MockQuota>,
    store: Arc<MockStore>,
) -> (DocumentAnalyzer, Probes) {
    let engine = MockEngine::new(response);
    let analyzer = DocumentAnalyzer::new(
        engine.clone(),
        store.clone(),
        quota.clone(),
        Arc::new(MemoryBackend::new()),
        TEST_MODEL,
    );
    (
        analyzer,
        Probes {
            engine,
            store,
            quota,
        },
    )
}

pub(crate) fn signage_with(response: &str, quota: Arc<MockQuota>) -> (SignageAnalyzer, Probes) {
    let engine = MockEngine::new(response);
    let analyzer = SignageAnalyzer::new(
        engine.clone(),
        quota.clone(),
        Arc::new(MemoryBackend::new()),
        TEST_MODEL,
    );
    (
        analyzer,
        Probes {
            engine,
            store: store_ok(),
            quota,
        },
    )
}
