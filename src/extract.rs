//! PDF text extraction.
//!
//! Produces the page-joined plain text of a document, or a typed error when
//! nothing extractable is found. Extraction failures are non-fatal at the
//! batch level: the ingest loop logs them and skips the document.

use std::path::Path;

/// Page separator emitted by pdf-extract between pages.
const PAGE_SEPARATOR: char = '\x0c';

/// Maximum characters returned by [`preview`].
pub const PREVIEW_MAX_CHARS: usize = 500;

/// Extraction error. A document that fails here is skipped, not fatal.
#[derive(Debug)]
pub enum ExtractError {
    /// The file could not be read from disk.
    Unreadable(String),
    /// The PDF could not be parsed.
    Pdf(String),
    /// The document parsed but yielded no text on any page.
    NoText,
}

impl std::fmt::Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractError::Unreadable(e) => write!(f, "failed to read document: {}", e),
            ExtractError::Pdf(e) => write!(f, "PDF extraction failed: {}", e),
            ExtractError::NoText => write!(f, "no text extracted from any page"),
        }
    }
}

impl std::error::Error for ExtractError {}

/// Extract the text of all pages of a PDF, joined by a single line break.
///
/// Pages that contribute no text are dropped rather than treated as
/// failures; only total absence of text across the document is an error
/// ([`ExtractError::NoText`]).
pub fn extract_document(path: &Path) -> Result<String, ExtractError> {
    let bytes = std::fs::read(path).map_err(|e| ExtractError::Unreadable(e.to_string()))?;

    let raw = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let text = join_pages(&raw);
    if text.is_empty() {
        return Err(ExtractError::NoText);
    }

    Ok(text)
}

/// Join the per-page texts of a raw extraction, skipping empty pages.
///
/// pdf-extract separates pages with form feeds; pages whose text is empty
/// after trimming contribute nothing. The result is trimmed so the corpus
/// never starts or ends with an empty chunk.
fn join_pages(raw: &str) -> String {
    let joined: Vec<&str> = raw
        .split(PAGE_SEPARATOR)
        .filter(|page| !page.trim().is_empty())
        .collect();

    joined.join("\n").trim().to_string()
}

/// Extract a short snippet of a document for immediate feedback.
///
/// Returns the first [`PREVIEW_MAX_CHARS`] characters of the extracted
/// text, truncated on a character boundary.
pub fn preview(path: &Path) -> Result<String, ExtractError> {
    let text = extract_document(path)?;
    Ok(text.chars().take(PREVIEW_MAX_CHARS).collect())
}
