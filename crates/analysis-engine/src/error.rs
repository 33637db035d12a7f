use doc_ingest::ExtractError;
use thiserror::Error;

/// Pipeline failure taxonomy.
///
/// Display strings are the caller-facing messages. Security and
/// inference variants keep their detail out of Display; the detail is
/// logged server-side only.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Malformed or out-of-bound caller input. The message is specific
    /// and safe to surface.
    #[error("{0}")]
    Validation(String),

    /// Dangerous file signature or declared/actual type mismatch.
    /// Callers get a generic rejection; `detail` is for server logs.
    #[error("Invalid file")]
    Security { detail: String },

    /// Admission control denied the request. Expected under normal load.
    #[error("Too many requests. Please try again in a moment.")]
    Throttled { reset_at: i64 },

    /// Monthly allowance exhausted. A normal terminal state, not a fault.
    #[error("Monthly analysis limit reached. Upgrade your plan for unlimited analyses.")]
    QuotaExceeded,

    /// File parsing failed; the variant's message is component-specific.
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    /// The inference call itself failed. Never retried automatically.
    #[error("Analysis failed. Please try again.")]
    Inference(#[source] anyhow::Error),

    /// The inference output was not valid or recoverable JSON. Same
    /// caller message as Inference, distinguished in logs.
    #[error("Analysis failed. Please try again.")]
    Parse(String),

    /// A durable write failed.
    #[error("Analysis could not be saved. Please try again.")]
    Storage(#[source] anyhow::Error),
}
