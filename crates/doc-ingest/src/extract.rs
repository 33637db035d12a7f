//! Text extraction for verified document buffers
//!
//! Each format fails with its own error variant so callers can tell a
//! corrupt PDF from a corrupt Word document in user messaging. There is
//! no retry logic; extraction failures are terminal for the request.

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::verify::{MIME_DOC, MIME_DOCX, MIME_PDF, MIME_TEXT};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("PDF text extraction failed: {0}")]
    InvalidPdf(String),

    #[error("Word document extraction failed: {0}")]
    InvalidWord(String),

    #[error("Legacy .doc files are not supported; convert to .docx")]
    LegacyWordUnsupported,

    #[error("File is not valid UTF-8 text")]
    InvalidEncoding,

    #[error("No extractor for file type: {0}")]
    UnsupportedType(String),
}

/// Extract plain text from a buffer whose type has already been confirmed
/// by [`crate::verify::verify_content`].
pub fn extract_text(buffer: &[u8], mime: &str) -> Result<String, ExtractError> {
    match mime {
        MIME_PDF => extract_pdf(buffer),
        MIME_DOCX => extract_docx(buffer),
        MIME_DOC => Err(ExtractError::LegacyWordUnsupported),
        MIME_TEXT => std::str::from_utf8(buffer)
            .map(str::to_owned)
            .map_err(|_| ExtractError::InvalidEncoding),
        other => Err(ExtractError::UnsupportedType(other.to_string())),
    }
}

fn extract_pdf(buffer: &[u8]) -> Result<String, ExtractError> {
    pdf_extract::extract_text_from_mem(buffer)
        .map_err(|e| ExtractError::InvalidPdf(e.to_string()))
}

/// DOCX is a ZIP container; the document body lives in `word/document.xml`.
/// Text runs are concatenated, with a newline per closed paragraph.
fn extract_docx(buffer: &[u8]) -> Result<String, ExtractError> {
    let cursor = std::io::Cursor::new(buffer);
    let mut archive =
        zip::ZipArchive::new(cursor).map_err(|e| ExtractError::InvalidWord(e.to_string()))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::InvalidWord(e.to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| ExtractError::InvalidWord(e.to_string()))?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    loop {
        match reader.read_event() {
            Ok(Event::Text(t)) => {
                let chunk = t
                    .unescape()
                    .map_err(|e| ExtractError::InvalidWord(e.to_string()))?;
                text.push_str(&chunk);
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"w:p" => text.push('\n'),
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:tab" => text.push('\t'),
            Ok(Event::Empty(e)) if e.name().as_ref() == b"w:br" => text.push('\n'),
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ExtractError::InvalidWord(e.to_string())),
        }
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn docx_fixture(body_xml: &str) -> Vec<u8> {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("word/document.xml", options).unwrap();
            writer.write_all(body_xml.as_bytes()).unwrap();
            writer.finish().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_plain_text_decodes_directly() {
        let text = extract_text("Contrat de service\n".as_bytes(), MIME_TEXT).unwrap();
        assert_eq!(text, "Contrat de service\n");
    }

    #[test]
    fn test_invalid_utf8_text_fails_with_encoding_error() {
        let err = extract_text(&[0xff, 0xfe, 0x00], MIME_TEXT).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidEncoding));
    }

    #[test]
    fn test_docx_paragraphs_become_lines() {
        let bytes = docx_fixture(
            "<w:document><w:body>\
             <w:p><w:r><w:t>Entente de services</w:t></w:r></w:p>\
             <w:p><w:r><w:t>Article 1</w:t></w:r></w:p>\
             </w:body></w:document>",
        );
        let text = extract_text(&bytes, MIME_DOCX).unwrap();
        assert_eq!(text, "Entente de services\nArticle 1\n");
    }

    #[test]
    fn test_corrupt_docx_fails_with_word_error() {
        let err = extract_text(b"PK\x03\x04 not actually a zip", MIME_DOCX).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidWord(_)));
    }

    #[test]
    fn test_docx_missing_document_xml_fails_with_word_error() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut cursor);
            let options = zip::write::SimpleFileOptions::default();
            writer.start_file("unrelated.txt", options).unwrap();
            writer.write_all(b"nothing here").unwrap();
            writer.finish().unwrap();
        }
        let err = extract_text(&cursor.into_inner(), MIME_DOCX).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidWord(_)));
    }

    #[test]
    fn test_corrupt_pdf_fails_with_pdf_error() {
        let err = extract_text(b"%PDF-1.7 truncated garbage", MIME_PDF).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidPdf(_)));
    }

    #[test]
    fn test_legacy_doc_is_refused() {
        let err = extract_text(&[0xD0, 0xCF, 0x11, 0xE0], MIME_DOC).unwrap_err();
        assert!(matches!(err, ExtractError::LegacyWordUnsupported));
    }
}
