//! DOCX text extraction
//!
//! DOCX files are zip archives; the document body lives in
//! word/document.xml. We pull the text runs (w:t) and treat each
//! paragraph (w:p) as a line break.

use super::{normalize_text, pages_from_words, Extracted};
use crate::error::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use tracing::debug;

/// Extract text from DOCX bytes
pub fn extract_docx(bytes: &[u8]) -> Result<Extracted> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| Error::Extraction(format!("DOCX is not a valid archive: {}", e)))?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .map_err(|_| Error::Extraction("DOCX archive has no word/document.xml".to_string()))?
        .read_to_string(&mut xml)
        .map_err(|e| Error::Extraction(format!("Failed to read DOCX body: {}", e)))?;

    let text = normalize_text(&document_xml_to_text(&xml)?);
    if text.is_empty() {
        return Err(Error::Extraction("DOCX contains no text".to_string()));
    }

    let word_count = text.split_whitespace().count();
    debug!("Extracted {} words from DOCX", word_count);

    Ok(Extracted {
        page_count: pages_from_words(word_count),
        text,
    })
}

/// Walk the WordprocessingML body collecting w:t runs
fn document_xml_to_text(xml: &str) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut out = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"w:t" => {
                in_text_run = true;
            }
            Ok(Event::End(ref e)) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => out.push('\n'),
                _ => {}
            },
            Ok(Event::Text(ref t)) if in_text_run => {
                let fragment = t
                    .unescape()
                    .map_err(|e| Error::Extraction(format!("Malformed DOCX XML: {}", e)))?;
                out.push_str(&fragment);
            }
            Ok(Event::Empty(ref e)) if e.name().as_ref() == b"w:br" => {
                out.push('\n');
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(Error::Extraction(format!("Malformed DOCX XML: {}", e)));
            }
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_xml_to_text() {
        let xml = r#"<w:document><w:body>
            <w:p><w:r><w:t>Breakfast options</w:t></w:r></w:p>
            <w:p><w:r><w:t>Oats with</w:t></w:r><w:r><w:t> milk</w:t></w:r></w:p>
        </w:body></w:document>"#;

        let text = document_xml_to_text(xml).unwrap();
        assert!(text.contains("Breakfast options"));
        assert!(text.contains("Oats with milk"));
    }

    #[test]
    fn test_invalid_archive_is_extraction_error() {
        let err = extract_docx(b"plainly not a zip").unwrap_err();
        assert!(matches!(err, Error::Extraction(_)));
    }
}
