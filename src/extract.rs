//! Plain-text extraction for context documents.
//!
//! Only Word documents (`.docx`, OOXML) are accepted. Callers check the
//! content type with [`ensure_supported`] before doing anything else, so an
//! unsupported upload never reaches the classification service.

use std::io::Read;
use std::path::Path;

use thiserror::Error;

pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("unsupported document type: {0} (only .docx is supported)")]
    UnsupportedContentType(String),
    #[error("document is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
    #[error("DOCX extraction failed: {0}")]
    Ooxml(String),
}

/// Strip parameters and case from a `Content-Type` value.
fn normalize_content_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Reject anything that is not a `.docx` content type.
pub fn ensure_supported(content_type: &str) -> Result<(), ExtractError> {
    if normalize_content_type(content_type) == MIME_DOCX {
        Ok(())
    } else {
        Err(ExtractError::UnsupportedContentType(content_type.to_string()))
    }
}

/// Content type implied by a file name, if it is one we know.
pub fn content_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "docx" => Some(MIME_DOCX),
        _ => None,
    }
}

/// Extract plain text from `bytes`, one line per paragraph.
pub fn extract_text(
    bytes: &[u8],
    content_type: &str,
    max_bytes: usize,
) -> Result<String, ExtractError> {
    ensure_supported(content_type)?;
    if bytes.len() > max_bytes {
        return Err(ExtractError::TooLarge {
            size: bytes.len(),
            limit: max_bytes,
        });
    }
    extract_docx(bytes)
}

fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|_| ExtractError::Ooxml("word/document.xml not found".to_string()))?;

    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }

    paragraphs_from_document_xml(&doc_xml)
}

/// Collect `<w:t>` runs, breaking lines at `<w:p>` ends and `<w:br/>`.
fn paragraphs_from_document_xml(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(te)) if in_text => {
                let text = te
                    .unescape()
                    .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
                out.push_str(&text);
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.local_name().as_ref() {
                b"br" => out.push('\n'),
                b"tab" => out.push('\t'),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}
