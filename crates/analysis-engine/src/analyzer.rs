//! Document compliance pipeline
//!
//! Per request: throttle → quota → validate → verify → extract →
//! sanitize → prompt → invoke → parse → persist → meter. Validation
//! failures short-circuit before any external call, first failure wins,
//! and no side effect is applied on a rejected request. The inference
//! call is made exactly once; there is no automatic retry.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use uuid::Uuid;

use doc_ingest::{extract_text, verify_content, MIME_DOC, MIME_DOCX, MIME_PDF};
use rate_limit::{CounterBackend, RateLimiter, DOCUMENT_ANALYSIS};
use shared_types::{Analysis, Document, RiskLevel, SourceKind};

use crate::error::AnalysisError;
use crate::parse::{
    clamp_score, coerce_issues, coerce_language, coerce_suggestions, parse_payload, RawAnalysis,
};
use crate::prompt::{build_document_message, DOCUMENT_MAX_OUTPUT_TOKENS, DOCUMENT_SYSTEM_PROMPT};
use crate::traits::{AnalysisStore, Caller, InferenceEngine, QuotaStore};
use crate::{truncated_id, MAX_FILE_BYTES, MAX_NAME_CHARS, MAX_TEXT_CHARS, MIN_TEXT_CHARS};

/// What the caller submitted for analysis: exactly one of a file or
/// pasted text.
pub enum AnalyzeSource {
    File {
        bytes: Vec<u8>,
        declared_mime: String,
    },
    Text(String),
}

pub struct AnalyzeRequest {
    pub document_name: String,
    pub source: AnalyzeSource,
}

/// Orchestrator for the document-compliance pipeline. The only component
/// that performs durable writes and the only one that meters quota.
pub struct DocumentAnalyzer {
    inference: Arc<dyn InferenceEngine>,
    store: Arc<dyn AnalysisStore>,
    quota: Arc<dyn QuotaStore>,
    throttle: RateLimiter<Arc<dyn CounterBackend>>,
    model_id: String,
}

impl DocumentAnalyzer {
    pub fn new(
        inference: Arc<dyn InferenceEngine>,
        store: Arc<dyn AnalysisStore>,
        quota: Arc<dyn QuotaStore>,
        counter_backend: Arc<dyn CounterBackend>,
        model_id: impl Into<String>,
    ) -> Self {
        Self {
            inference,
            store,
            quota,
            throttle: RateLimiter::new(counter_backend, DOCUMENT_ANALYSIS),
            model_id: model_id.into(),
        }
    }

    /// Run the full pipeline for one request.
    pub async fn analyze(
        &self,
        caller: &Caller,
        request: AnalyzeRequest,
    ) -> Result<Analysis, AnalysisError> {
        let started = Instant::now();
        let created_at = Utc::now();

        let decision = self.throttle.admit(&caller.user_id).await;
        if !decision.success {
            return Err(AnalysisError::Throttled {
                reset_at: decision.reset_at,
            });
        }

        self.check_quota(caller).await?;

        let name = request.document_name.trim().to_string();
        if name.is_empty() {
            return Err(AnalysisError::Validation("Document name is required".into()));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(AnalysisError::Validation(format!(
                "Document name is too long ({MAX_NAME_CHARS} characters max)"
            )));
        }

        let (text, source_kind) = self.resolve_source(caller, request.source)?;
        let text = truncate_for_analysis(text);

        let sanitized = prompt_guard::sanitize(&text);
        if sanitized.risk_level >= RiskLevel::Medium {
            tracing::warn!(
                user = %truncated_id(&caller.user_id),
                pattern_count = sanitized.suspicious_patterns.len(),
                text_len = text.chars().count(),
                risk = ?sanitized.risk_level,
                "suspicious input detected in document analysis"
            );
        }

        let user_message = build_document_message(&name, &prompt_guard::wrap(&sanitized.sanitized_text));
        let raw_output = self
            .inference
            .invoke(
                DOCUMENT_SYSTEM_PROMPT,
                &user_message,
                DOCUMENT_MAX_OUTPUT_TOKENS,
                &self.model_id,
            )
            .await
            .map_err(AnalysisError::Inference)?;

        let raw: RawAnalysis = parse_payload(&raw_output).map_err(AnalysisError::Parse)?;

        let completed_at = Utc::now();
        let document = Document {
            id: Uuid::new_v4().to_string(),
            owner_id: caller.user_id.clone(),
            name,
            source_kind,
            text,
            stored_file: None,
            created_at,
        };
        let analysis = Analysis {
            id: Uuid::new_v4().to_string(),
            owner_id: caller.user_id.clone(),
            document_id: document.id.clone(),
            is_compliant: raw.is_compliant,
            compliance_score: clamp_score(raw.compliance_score),
            detected_language: coerce_language(&raw.detected_language),
            french_percentage: clamp_score(raw.french_percentage),
            issues: coerce_issues(raw.issues),
            suggestions: coerce_suggestions(raw.suggestions),
            corrected_text: raw.corrected_text,
            model_id: self.model_id.clone(),
            processing_ms: started.elapsed().as_millis() as u64,
            created_at,
            completed_at,
        };

        self.store
            .create_document_and_analysis(&document, &analysis)
            .await
            .map_err(AnalysisError::Storage)?;

        self.meter_usage(caller).await;

        Ok(analysis)
    }

    /// Quota precondition. Paid tiers with an entitled subscription are
    /// unlimited; metered callers must have headroom this calendar month.
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

    /// Best-effort usage increment after a persisted analysis. A metering
    /// failure must not fail an analysis the caller already paid the
    /// latency for; quota drift is tolerated.
    async fn meter_usage(&self, caller: &Caller) {
        if caller.is_unlimited() {
            return;
        }
        if let Err(e) = self.quota.increment_usage(&caller.user_id).await {
            tracing::warn!(
                user = %truncated_id(&caller.user_id),
                error = %e,
                "usage increment failed after successful analysis"
            );
        }
    }

    /// Validate the submitted source and normalize it to text.
    fn resolve_source(
        &self,
        caller: &Caller,
        source: AnalyzeSource,
    ) -> Result<(String, SourceKind), AnalysisError> {
        match source {
            AnalyzeSource::Text(text) => {
                if text.chars().count() > MAX_TEXT_CHARS {
                    return Err(AnalysisError::Validation(format!(
                        "Text is too long ({MAX_TEXT_CHARS} characters max)"
                    )));
                }
                if text.trim().chars().count() < MIN_TEXT_CHARS {
                    return Err(AnalysisError::Validation(format!(
                        "Text is too short (minimum {MIN_TEXT_CHARS} characters)"
                    )));
                }
                Ok((text, SourceKind::PastedText))
            }
            AnalyzeSource::File {
                bytes,
                declared_mime,
            } => {
                // Size first: no signature check is attempted on an
                // oversized upload.
                if bytes.len() > MAX_FILE_BYTES {
                    return Err(AnalysisError::Validation(
                        "File is too large (10 MiB max)".into(),
                    ));
                }

                let check = verify_content(&bytes, &declared_mime);
                if !check.valid {
                    let detail = check
                        .error
                        .unwrap_or_else(|| "content verification failed".into());
                    if check.dangerous {
                        tracing::warn!(
                            user = %truncated_id(&caller.user_id),
                            detail = %detail,
                            "dangerous file upload rejected"
                        );
                    } else {
                        tracing::info!(
                            user = %truncated_id(&caller.user_id),
                            declared = declared_mime,
                            detected = ?check.detected_type,
                            "file content mismatch rejected"
                        );
                    }
                    return Err(AnalysisError::Security { detail });
                }

                let source_kind = match declared_mime.as_str() {
                    MIME_PDF => SourceKind::UploadedPdf,
                    MIME_DOCX | MIME_DOC => SourceKind::UploadedWord,
                    _ => SourceKind::UploadedTextFile,
                };
                let text = extract_text(&bytes, &declared_mime)?;
                if text.trim().chars().count() < MIN_TEXT_CHARS {
                    return Err(AnalysisError::Validation(
                        "Document contains no analyzable text".into(),
                    ));
                }
                Ok((text, source_kind))
            }
        }
    }
}

/// Truncate over-length extracted text to the analysis limit. Recorded
/// as a warning; not surfaced to the end user.
fn truncate_for_analysis(text: String) -> String {
    if text.chars().count() <= MAX_TEXT_CHARS {
        return text;
    }
    tracing::warn!(
        original_len = text.chars().count(),
        limit = MAX_TEXT_CHARS,
        "extracted text truncated for analysis"
    );
    text.chars().take(MAX_TEXT_CHARS).collect()
}
