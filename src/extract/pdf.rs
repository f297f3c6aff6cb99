//! PDF text extraction

use super::{normalize_text, Extracted, CHARS_PER_PAGE};
use crate::error::{Error, Result};
use tracing::debug;

/// Scanned PDFs extract to (near) nothing; below this we assume OCR is needed
const OCR_THRESHOLD_CHARS: usize = 10;

/// Extract text from PDF bytes.
///
/// A structurally valid PDF that yields fewer than 10 characters of text is
/// reported as needing OCR rather than as a generic extraction failure.
pub fn extract_pdf(bytes: &[u8]) -> Result<Extracted> {
    let raw = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| Error::Extraction(format!("PDF extraction failed: {}", e)))?;

    let text = normalize_text(&raw);
    debug!("Extracted {} chars from PDF", text.len());

    if text.chars().count() < OCR_THRESHOLD_CHARS {
        return Err(Error::OcrRequired(
            "PDF contains no extractable text layer (likely scanned)".to_string(),
        ));
    }

    let page_count = text.chars().count().div_ceil(CHARS_PER_PAGE).max(1);
    Ok(Extracted { text, page_count })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pdf_is_extraction_error() {
        let err = extract_pdf(b"not a pdf at all").unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
