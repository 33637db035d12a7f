//! Document ingestion: byte-signature verification and text extraction
//!
//! Uploaded files are never trusted on their declared MIME type. The
//! verifier confirms the true format from magic bytes and rejects
//! executables outright; the extractor then converts a verified buffer
//! into plain text for analysis.

pub mod extract;
pub mod verify;

pub use extract::{extract_text, ExtractError};
pub use verify::{verify_content, FileCheck, MIME_DOC, MIME_DOCX, MIME_PDF, MIME_TEXT};
