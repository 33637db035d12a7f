//! Signage-description analysis
//!
//! Narrower sibling of the document pipeline: a single free-text
//! description, a signage-specific system prompt, and a simpler response
//! contract. Same sanitize → wrap → invoke → parse → clamp path and the
//! same throttle/quota preconditions; the only durable side effect is
//! the usage increment.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use rate_limit::{CounterBackend, RateLimiter, SIGNAGE_ANALYSIS};
use shared_types::{RiskLevel, SignageReport};

use crate::error::AnalysisError;
use crate::parse::{clamp_score, parse_payload, RawSignage};
use crate::prompt::{build_signage_message, SIGNAGE_MAX_OUTPUT_TOKENS, SIGNAGE_SYSTEM_PROMPT};
use crate::traits::{Caller, InferenceEngine, QuotaStore};
use crate::{truncated_id, MAX_SIGNAGE_CHARS, MIN_TEXT_CHARS};

pub struct SignageRequest {
    pub description: String,
}

pub struct SignageAnalyzer {
    inference: Arc<dyn InferenceEngine>,
    quota: Arc<dyn QuotaStore>,
    throttle: RateLimiter<Arc<dyn CounterBackend>>,
    model_id: String,
}

impl SignageAnalyzer {
    pub fn new(
        inference: Arc<dyn InferenceEngine>,
        quota: Arc<dyn QuotaStore>,
        counter_backend: Arc<dyn CounterBackend>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            inference,
            quota,
            throttle: RateLimiter::new(counter_backend, SIGNAGE_ANALYSIS),
            model_id: model_id.into(),
        }
    }

    pub async fn analyze(
        &self,
        caller: &Caller,
        request: SignageRequest,
    ) -> Result<SignageReport, AnalysisError> {
        let started = Instant::now();

        let decision = self.throttle.admit(&caller.user_id).await;
        if !decision.success {
            return Err(AnalysisError::Throttled {
                reset_at: decision.reset_at,
            });
        }

        self.check_quota(caller).await?;

        let description = request.description.trim().to_string();
        if description.chars().count() < MIN_TEXT_CHARS {
            return Err(AnalysisError::Validation(format!(
                "Description is too short (minimum {MIN_TEXT_CHARS} characters)"
            )));
        }
        if description.chars().count() > MAX_SIGNAGE_CHARS {
            return Err(AnalysisError::Validation(format!(
                "Description is too long ({MAX_SIGNAGE_CHARS} characters max)"
            )));
        }

        let sanitized = prompt_guard::sanitize(&description);
        if sanitized.risk_level >= RiskLevel::Medium {
            tracing::warn!(
                user = %truncated_id(&caller.user_id),
                pattern_count = sanitized.suspicious_patterns.len(),
                text_len = description.chars().count(),
                risk = ?sanitized.risk_level,
                "suspicious input detected in signage analysis"
            );
        }

        let user_message = build_signage_message(&prompt_guard::wrap(&sanitized.sanitized_text));
        let raw_output = self
            .inference
            .invoke(
                SIGNAGE_SYSTEM_PROMPT,
                &user_message,
                SIGNAGE_MAX_OUTPUT_TOKENS,
                &self.model_id,
            )
            .await
            .map_err(AnalysisError::Inference)?;

        let raw: RawSignage = parse_payload(&raw_output).map_err(AnalysisError::Parse)?;

        let report = SignageReport {
            score: clamp_score(raw.score),
            problems: raw.problems,
            suggestions: raw.suggestions,
            corrected_description: raw.corrected_description,
            model_id: self.model_id.clone(),
            processing_ms: started.elapsed().as_millis() as u64,
        };

        self.meter_usage(caller).await;

        Ok(report)
    }

    async fn check_quota(&self, caller: &Caller) -> Result<(), AnalysisError> {
        if caller.is_unlimited() {
            return Ok(());
        }
        let usage = self
            .quota
            .get_usage(&caller.user_id)
            .await
            .map_err(AnalysisError::Storage)?;
        let used = if usage.is_stale(Utc::now()) { 0 } else { usage.used };
        if used >= usage.limit {
            return Err(AnalysisError::QuotaExceeded);
        }
        Ok(())
    }

    async fn meter_usage(&self, caller: &Caller) {
        if caller.is_unlimited() {
            return;
        }
        if let Err(e) = self.quota.increment_usage(&caller.user_id).await {
            tracing::warn!(
                user = %truncated_id(&caller.user_id),
                error = %e,
                "usage increment failed after successful signage analysis"
            );
        }
    }
}
