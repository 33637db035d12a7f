pub mod sanitize;
pub mod types;
pub mod usage;

pub use sanitize::{RiskLevel, SanitizationResult};
pub use types::{
    Analysis, DetectedLanguage, Document, Issue, IssueSeverity, IssueType, SignageReport,
    SourceKind, Suggestion,
};
pub use usage::{PlanTier, SubscriptionStatus, UsageSummary};
