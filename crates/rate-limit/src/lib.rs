//! Per-identifier admission control
//!
//! Fixed-window counters keyed `prefix:identifier`. A counter created at
//! the first request in a window resets at `first_hit + window_ms`; once
//! the count reaches the policy maximum, further admits fail until the
//! reset. Two interchangeable backends share these semantics: the
//! in-process [`MemoryBackend`] for single-instance deployments and any
//! distributed [`CounterBackend`] implementation for multi-instance ones.
//!
//! Backend failure fails open: during infrastructure trouble the request
//! is admitted rather than blocking all traffic.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;

/// Admission policy: `max_requests` per `window_ms`, namespaced by `prefix`.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    pub prefix: &'static str,
    pub window_ms: i64,
    pub max_requests: u64,
}

/// Preconfigured policies.
pub const DOCUMENT_ANALYSIS: RatePolicy = RatePolicy {
    prefix: "doc-analysis",
    window_ms: 60_000,
    max_requests: 10,
};

pub const SIGNAGE_ANALYSIS: RatePolicy = RatePolicy {
    prefix: "signage-analysis",
    window_ms: 60_000,
    max_requests: 10,
};

pub const API_GENERAL: RatePolicy = RatePolicy {
    prefix: "api",
    window_ms: 60_000,
    max_requests: 100,
};

pub const WEBHOOK_INGEST: RatePolicy = RatePolicy {
    prefix: "webhook",
    window_ms: 60_000,
    max_requests: 50,
};

pub const AUTH_ATTEMPTS: RatePolicy = RatePolicy {
    prefix: "auth",
    window_ms: 60_000,
    max_requests: 5,
};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub success: bool,
    /// Requests left in the live window (0 when denied).
    pub remaining: u64,
    /// Epoch milliseconds at which the window resets.
    pub reset_at: i64,
}

/// A windowed counter. Implementations must make the increment atomic so
/// two concurrent requests cannot both take the last slot.
#[async_trait]
pub trait CounterBackend: Send + Sync {
    /// Increment the counter for `key`, creating it with expiry
    /// `now_ms + window_ms` if absent or expired. Returns the count after
    /// the increment and the window's reset time.
    async fn incr(&self, key: &str, window_ms: i64, now_ms: i64) -> anyhow::Result<(u64, i64)>;
}

#[async_trait]
impl<B: CounterBackend + ?Sized> CounterBackend for std::sync::Arc<B> {
    async fn incr(&self, key: &str, window_ms: i64, now_ms: i64) -> anyhow::Result<(u64, i64)> {
        (**self).incr(key, window_ms, now_ms).await
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowSlot {
    count: u64,
    reset_at: i64,
}

/// In-process backend for single-instance deployments. All mutation happens
/// under one lock, making the check-and-increment atomic.
#[derive(Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<String, WindowSlot>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Evict expired windows to bound memory. Call periodically from a
    /// maintenance task.
    pub fn sweep(&self, now_ms: i64) -> usize {
        let mut slots = self.slots.lock().expect("rate limit map poisoned");
        let before = slots.len();
        slots.retain(|_, slot| slot.reset_at > now_ms);
        before - slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().expect("rate limit map poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CounterBackend for MemoryBackend {
    async fn incr(&self, key: &str, window_ms: i64, now_ms: i64) -> anyhow::Result<(u64, i64)> {
        let mut slots = self.slots.lock().expect("rate limit map poisoned");
        let slot = slots
            .entry(key.to_string())
            .and_modify(|slot| {
                if slot.reset_at <= now_ms {
                    slot.count = 0;
                    slot.reset_at = now_ms + window_ms;
                }
            })
            .or_insert(WindowSlot {
                count: 0,
                reset_at: now_ms + window_ms,
            });
        slot.count += 1;
        Ok((slot.count, slot.reset_at))
    }
}

/// Admission controller over a counter backend.
pub struct RateLimiter<B> {
    backend: B,
    policy: RatePolicy,
}

impl<B: CounterBackend> RateLimiter<B> {
    pub fn new(backend: B, policy: RatePolicy) -> Self {
        Self { backend, policy }
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    /// Check and consume one admission slot for `identifier`.
    pub async fn admit(&self, identifier: &str) -> Decision {
        self.admit_at(identifier, Utc::now().timestamp_millis()).await
    }

    /// Same as [`admit`](Self::admit) with an explicit clock, for tests.
    pub async fn admit_at(&self, identifier: &str, now_ms: i64) -> Decision {
        let key = format!("{}:{}", self.policy.prefix, identifier);
        match self.backend.incr(&key, self.policy.window_ms, now_ms).await {
            Ok((count, reset_at)) => Decision {
                success: count <= self.policy.max_requests,
                remaining: self.policy.max_requests.saturating_sub(count),
                reset_at,
            },
            Err(e) => {
                // Availability over strict enforcement: a broken counter
                // service must not take down all traffic.
                tracing::warn!(error = %e, key = %key, "rate limit backend failed; admitting request");
                Decision {
                    success: true,
                    remaining: self.policy.max_requests,
                    reset_at: now_ms + self.policy.window_ms,
                }
            }
        }
    }
}
