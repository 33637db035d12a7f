use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Billing tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Free,
    Pro,
    Business,
}

impl PlanTier {
    pub fn is_paid(self) -> bool {
        !matches!(self, PlanTier::Free)
    }

    /// Monthly analysis allowance for metered tiers.
    pub fn monthly_limit(self) -> u32 {
        match self {
            PlanTier::Free => 3,
            // Paid tiers are unmetered; the limit is informational only.
            PlanTier::Pro | PlanTier::Business => u32::MAX,
        }
    }
}

/// Subscription lifecycle state, as reported by the billing collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Trialing,
    PastDue,
    Canceled,
}

impl SubscriptionStatus {
    /// Whether the subscription entitles the caller to paid-tier treatment.
    pub fn is_entitled(self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trialing)
    }
}

/// Snapshot of a caller's monthly usage counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageSummary {
    pub used: u32,
    pub limit: u32,
    pub period_start: DateTime<Utc>,
}

impl UsageSummary {
    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    /// True when the counter belongs to a previous calendar month and the
    /// store should treat `used` as 0.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        self.period_start.year() != now.year() || self.period_start.month() != now.month()
    }
}
