//! Document text extraction
//!
//! This module handles:
//! - Format detection from file extension
//! - PDF, DOCX and plain-text extraction
//! - Whitespace normalization
//! - Page count estimation for formats without native pages

mod docx;
mod pdf;

pub use docx::extract_docx;
pub use pdf::extract_pdf;

use crate::error::{Error, Result};
use std::path::Path;

/// Words assumed per page when estimating DOCX page counts
pub const WORDS_PER_PAGE: usize = 500;

/// Characters assumed per page when estimating plain-text page counts
const CHARS_PER_PAGE: usize = 3000;

/// Document formats we can extract text from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Detect format from a file extension
    pub fn from_extension(path: &Path) -> Result<Self> {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref()
        {
            Some("pdf") => Ok(DocumentFormat::Pdf),
            Some("docx") | Some("doc") => Ok(DocumentFormat::Docx),
            Some("txt") | Some("md") | Some("markdown") | Some("csv") => {
                Ok(DocumentFormat::PlainText)
            }
            Some(other) => Err(Error::UnsupportedFormat(format!(
                "'.{}' is not supported (expected pdf, docx, txt, md or csv)",
                other
            ))),
            None => Err(Error::UnsupportedFormat(
                "file has no extension (expected pdf, docx, txt, md or csv)".to_string(),
            )),
        }
    }
}

/// Extracted text plus a page count (native or estimated)
#[derive(Debug, Clone)]
pub struct Extracted {
    pub text: String,
    pub page_count: usize,
}

/// Extract normalized text from raw file bytes
pub fn extract_text(bytes: &[u8], format: DocumentFormat) -> Result<Extracted> {
    match format {
        DocumentFormat::Pdf => extract_pdf(bytes),
        DocumentFormat::Docx => extract_docx(bytes),
        DocumentFormat::PlainText => extract_plain_text(bytes),
    }
}

/// Extract from UTF-8 plain text (txt, md, csv)
pub fn extract_plain_text(bytes: &[u8]) -> Result<Extracted> {
    let raw = std::str::from_utf8(bytes)
        .map_err(|_| Error::Extraction("file is not valid UTF-8 text".to_string()))?;

    let text = normalize_text(raw);
    if text.is_empty() {
        return Err(Error::Extraction("file contains no text".to_string()));
    }

    let page_count = text.chars().count().div_ceil(CHARS_PER_PAGE).max(1);
    Ok(Extracted { text, page_count })
}

/// Estimate pages from a word count (DOCX has no native page markers)
pub(crate) fn pages_from_words(word_count: usize) -> usize {
    word_count.div_ceil(WORDS_PER_PAGE).max(1)
}

/// Normalize extracted text for chunking and storage.
///
/// CRLF becomes LF, runs of 3+ newlines collapse to a paragraph break,
/// tabs become spaces, repeated spaces collapse, and each line is trimmed.
pub fn normalize_text(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n").replace('\t', " ");

    let mut lines: Vec<String> = Vec::new();
    for line in unified.lines() {
        let mut collapsed = String::with_capacity(line.len());
        let mut last_space = false;
        for c in line.chars() {
            if c == ' ' {
                if !last_space {
                    collapsed.push(' ');
                }
                last_space = true;
            } else {
                collapsed.push(c);
                last_space = false;
            }
        }
        lines.push(collapsed.trim().to_string());
    }

    // Collapse 3+ consecutive blank-line breaks down to one blank line
    let mut result = String::new();
    let mut blank_run = 0usize;
    for line in lines {
        if line.is_empty() {
            blank_run += 1;
            continue;
        }
        if !result.is_empty() {
            if blank_run >= 1 {
                result.push_str("\n\n");
            } else {
                result.push('\n');
            }
        }
        result.push_str(&line);
        blank_run = 0;
    }

    result.trim().to_string()
}
