//! Word-window chunking
//!
//! Documents are split into overlapping windows of whitespace-delimited
//! words. Chunking is deterministic: the same text and parameters always
//! produce the same chunks in the same order.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Validated chunking parameters
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkParams {
    size_words: usize,
    overlap_words: usize,
}

impl ChunkParams {
    /// Build parameters, rejecting degenerate combinations up front
    pub fn new(size_words: usize, overlap_words: usize) -> Result<Self> {
        if size_words == 0 {
            return Err(Error::Validation(
                "chunk size must be at least 1 word".to_string(),
            ));
        }
        if overlap_words >= size_words {
            return Err(Error::Validation(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap_words, size_words
            )));
        }
        Ok(Self {
            size_words,
            overlap_words,
        })
    }

    pub fn size_words(&self) -> usize {
        self.size_words
    }

    pub fn overlap_words(&self) -> usize {
        self.overlap_words
    }

    /// Words the window advances between chunks
    pub fn stride(&self) -> usize {
        self.size_words - self.overlap_words
    }
}

/// A chunk of document text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Position within the document, starting at 0
    pub index: usize,

    /// Chunk text (trimmed, non-empty)
    pub text: String,
}

/// Stable chunk identifier: `{document_id}_chunk_{index}`
pub fn chunk_point_id(document_id: &str, index: usize) -> String {
    format!("{}_chunk_{}", document_id, index)
}

/// Split text into overlapping word windows
pub fn chunk_text(text: &str, params: &ChunkParams) -> Vec<Chunk> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < words.len() {
        let end = (start + params.size_words()).min(words.len());
        let body = words[start..end].join(" ");
        let trimmed = body.trim();
        if !trimmed.is_empty() {
            chunks.push(Chunk {
                index: chunks.len(),
                text: trimmed.to_string(),
            });
        }

        if end == words.len() {
            break;
        }
        start += params.stride();
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(size: usize, overlap: usize) -> ChunkParams {
        ChunkParams::new(size, overlap).unwrap()
    }

    #[test]
    fn test_rejects_overlap_not_less_than_size() {
        assert!(ChunkParams::new(100, 100).is_err());
        assert!(ChunkParams::new(100, 150).is_err());
        assert!(ChunkParams::new(0, 0).is_err());
        assert!(ChunkParams::new(100, 99).is_ok());
    }

    #[test]
    fn test_short_text_single_chunk() {
        let chunks = chunk_text("only a few words here", &params(350, 80));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].text, "only a few words here");
    }

    #[test]
    fn test_empty_text_no_chunks() {
        assert!(chunk_text("", &params(10, 2)).is_empty());
        assert!(chunk_text("   \n\t  ", &params(10, 2)).is_empty());
    }

    #[test]
    fn test_overlap_between_consecutive_chunks() {
        let words: Vec<String> = (0..25).map(|i| format!("w{}", i)).collect();
        let text = words.join(" ");
        let chunks = chunk_text(&text, &params(10, 3));

        // Stride is 7: chunks start at word 0, 7, 14, 21
        assert_eq!(chunks.len(), 4);
        let first: Vec<&str> = chunks[0].text.split_whitespace().collect();
        let second: Vec<&str> = chunks[1].text.split_whitespace().collect();
        assert_eq!(&first[7..], &second[..3]);
    }

    #[test]
    fn test_overlap_removal_reconstructs_original_words() {
        // Every chunk except the last is full-size, so dropping the first
        // `overlap` words of each non-first chunk recovers the word stream
        for (total, size, overlap) in [(1000usize, 350usize, 80usize), (25, 10, 3), (7, 10, 3)] {
            let words: Vec<String> = (0..total).map(|i| format!("w{}", i)).collect();
            let text = words.join(" ");
            let p = params(size, overlap);
            let chunks = chunk_text(&text, &p);

            let mut rebuilt: Vec<&str> = Vec::new();
            for (i, chunk) in chunks.iter().enumerate() {
                let chunk_words: Vec<&str> = chunk.text.split_whitespace().collect();
                let skip = if i == 0 { 0 } else { p.overlap_words() };
                rebuilt.extend(&chunk_words[skip..]);
            }

            let original: Vec<&str> = words.iter().map(String::as_str).collect();
            assert_eq!(rebuilt, original, "W={} S={} O={}", total, size, overlap);
        }
    }

    #[test]
    fn test_chunk_count_formula() {
        // For W words, size S and overlap O with W > S:
        // count = ceil((W - O) / (S - O))
        let cases = [(100usize, 10usize, 3usize), (350, 350, 80), (1000, 350, 80)];
        for (w, s, o) in cases {
            let text = (0..w).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
            let chunks = chunk_text(&text, &params(s, o));
            let expected = if w <= s { 1 } else { (w - o).div_ceil(s - o) };
            assert_eq!(chunks.len(), expected, "W={} S={} O={}", w, s, o);
        }
    }

    #[test]
    fn test_determinism_and_indices() {
        let text = (0..500).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ");
        let a = chunk_text(&text, &params(350, 80));
        let b = chunk_text(&text, &params(350, 80));
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert_eq!(x.index, i);
            assert_eq!(x.text, y.text);
        }
    }

    #[test]
    fn test_chunk_point_id() {
        assert_eq!(chunk_point_id("doc-1", 4), "doc-1_chunk_4");
    }
}
