//! Compliance analysis orchestration
//!
//! Runs the full document pipeline: admission control, quota check,
//! input validation, byte-signature verification, text extraction,
//! prompt-injection sanitization, prompt construction, a single
//! inference call, strict response parsing, and persistence. The
//! narrower signage pipeline shares the sanitize → wrap → invoke →
//! parse → clamp path without document persistence.
//!
//! This crate owns no I/O of its own; the inference engine and the
//! stores are collaborator traits implemented by the application.

pub mod analyzer;
pub mod error;
pub mod parse;
pub mod prompt;
pub mod signage;
#[cfg(test)]
pub(crate) mod testing;
pub mod traits;

pub use analyzer::{AnalyzeRequest, AnalyzeSource, DocumentAnalyzer};
pub use error::AnalysisError;
pub use signage::{SignageAnalyzer, SignageRequest};
pub use traits::{AnalysisStore, Caller, InferenceEngine, QuotaStore};

/// Maximum accepted upload size.
pub const MAX_FILE_BYTES: usize = 10 * 1024 * 1024;

/// Maximum text length submitted to the model; longer extracted text is
/// truncated, longer pasted text is rejected.
pub const MAX_TEXT_CHARS: usize = 500_000;

/// Minimum meaningful text length after trimming.
pub const MIN_TEXT_CHARS: usize = 10;

/// Maximum document display-name length.
pub const MAX_NAME_CHARS: usize = 200;

/// Signage descriptions are short free text.
pub const MAX_SIGNAGE_CHARS: usize = 5_000;

/// Truncate a user id for telemetry; full ids never reach the logs.
pub(crate) fn truncated_id(user_id: &str) -> String {
    user_id.chars().take(8).collect()
}
