//! File content verification from byte signatures
//!
//! Matches a buffer's leading bytes against a fixed magic-byte table,
//! independent of the client-declared MIME type. Pure function over
//! bytes; never panics on malformed input.

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_DOC: &str = "application/msword";
pub const MIME_TEXT: &str = "text/plain";

/// PDF magic: `%PDF-`.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// ZIP local-file-header signatures (DOCX is a ZIP container).
const ZIP_MAGICS: &[&[u8]] = &[b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];

/// OLE compound-document signature (legacy .doc).
const OLE_MAGIC: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Executable signatures rejected unconditionally.
const PE_MAGIC: &[u8] = b"MZ";
const ELF_MAGIC: &[u8] = b"\x7fELF";
const SHEBANG: &[u8] = b"#!";

/// Minimum printable-character ratio for a buffer to pass as plain text.
const TEXT_PRINTABLE_RATIO: f64 = 0.8;

/// Result of verifying a buffer against its declared MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCheck {
    pub valid: bool,
    /// The format actually detected from magic bytes, when recognizable.
    pub detected_type: Option<&'static str>,
    /// Caller-facing reason when `valid` is false.
    pub error: Option<String>,
    /// Set when the buffer matched an executable signature. Callers must
    /// log the detail server-side and return only a generic rejection.
    pub dangerous: bool,
}

impl FileCheck {
    fn ok(detected: &'static str) -> Self {
        Self {
            valid: true,
            detected_type: Some(detected),
            error: None,
            dangerous: false,
        }
    }

    fn invalid(detected: Option<&'static str>, error: impl Into<String>) -> Self {
        Self {
            valid: false,
            detected_type: detected,
            error: Some(error.into()),
            dangerous: false,
        }
    }

    fn dangerous(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            detected_type: None,
            error: Some(error.into()),
            dangerous: true,
        }
    }
}

/// Verify that `buffer` really is what `declared_mime` claims.
///
/// Dangerous signatures are checked first and rejected regardless of the
/// declared type. On a mismatch where the actual format is recognizable,
/// `detected_type` names it for user feedback.
pub fn verify_content(buffer: &[u8], declared_mime: &str) -> FileCheck {
    if buffer.is_empty() {
        return FileCheck::invalid(None, "Empty file");
    }

    if let Some(kind) = dangerous_kind(buffer) {
        return FileCheck::dangerous(format!("Executable content detected ({kind})"));
    }

    match declared_mime {
        MIME_PDF => check_magic(buffer, is_pdf, MIME_PDF),
        MIME_DOCX => check_magic(buffer, is_zip, MIME_DOCX),
        MIME_DOC => check_magic(buffer, is_ole, MIME_DOC),
        MIME_TEXT => check_plain_text(buffer),
        other => FileCheck::invalid(
            detect_known_type(buffer),
            format!("Unsupported file type: {other}"),
        ),
    }
}

fn check_magic(buffer: &[u8], matches: fn(&[u8]) -> bool, declared: &'static str) -> FileCheck {
    if matches(buffer) {
        return FileCheck::ok(declared);
    }
    match detect_known_type(buffer) {
        Some(detected) => FileCheck::invalid(
            Some(detected),
            format!("File content does not match declared type (detected {detected})"),
        ),
        None => FileCheck::invalid(None, "File content does not match declared type"),
    }
}

/// Plain text has no signature; validate the bytes decode as UTF-8, contain
/// no NUL, and are mostly printable.
fn check_plain_text(buffer: &[u8]) -> FileCheck {
    // A recognizable binary format declared as text is a mismatch even if
    // its bytes happen to decode.
    if let Some(detected) = detect_known_type(buffer) {
        return FileCheck::invalid(
            Some(detected),
            format!("File content does not match declared type (detected {detected})"),
        );
    }

    let text = match std::str::from_utf8(buffer) {
        Ok(text) => text,
        Err(_) => {
            return FileCheck::invalid(
                detect_known_type(buffer),
                "File is not valid UTF-8 text",
            )
        }
    };

    if text.contains('\0') {
        return FileCheck::invalid(None, "Text file contains binary data");
    }

    let total = text.chars().count();
    let printable = text.chars().filter(|&c| is_printable(c)).count();
    if total > 0 && (printable as f64) / (total as f64) < TEXT_PRINTABLE_RATIO {
        return FileCheck::invalid(None, "File does not look like readable text");
    }

    FileCheck::ok(MIME_TEXT)
}

fn is_printable(c: char) -> bool {
    matches!(c, '\x20'..='\x7e' | '\u{a0}'..='\u{ff}' | '\t' | '\r' | '\n')
        || (c as u32) >= 0x100
}

fn is_pdf(buffer: &[u8]) -> bool {
    buffer.starts_with(PDF_MAGIC)
}

fn is_zip(buffer: &[u8]) -> bool {
    ZIP_MAGICS.iter().any(|magic| buffer.starts_with(magic))
}

fn is_ole(buffer: &[u8]) -> bool {
    buffer.starts_with(OLE_MAGIC)
}

fn dangerous_kind(buffer: &[u8]) -> Option<&'static str> {
    if buffer.starts_with(PE_MAGIC) {
        Some("Windows executable")
    } else if buffer.starts_with(ELF_MAGIC) {
        Some("ELF executable")
    } else if buffer.starts_with(SHEBANG) {
        Some("script with shebang")
    } else {
        None
    }
}

/// Best-effort identification of the buffer's actual format, used to name
/// the detected type on declared/actual mismatches.
fn detect_known_type(buffer: &[u8]) -> Option<&'static str> {
    if is_pdf(buffer) {
        Some(MIME_PDF)
    } else if is_zip(buffer) {
        Some(MIME_DOCX)
    } else if is_ole(buffer) {
        Some(MIME_DOC)
    } else {
        None
    }
}
