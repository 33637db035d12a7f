use serde::{Deserialize, Serialize};

/// Risk classification for adversarial-input telemetry.
///
/// Ordered so that callers can compare (`risk >= Medium`) when deciding
/// whether to emit a suspicious-input event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Outcome of running user text through the prompt-injection sanitizer.
/// Transient; never persisted.
#[derive(Debug, Clone)]
pub struct SanitizationResult {
    pub sanitized_text: String,
    /// Verbatim substrings that matched a suspicious pattern, for audit logs.
    pub suspicious_patterns: Vec<String>,
    pub was_modified: bool,
    pub risk_level: RiskLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_levels_are_ordered() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
    }
}
