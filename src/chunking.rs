//! Chunking utilities for splitting documents into overlapping segments.
//!
//! Each document is split into windows of at most `chunk_size` characters.
//! Consecutive windows share `overlap` characters so that a sentence cut at
//! a window edge is still embedded whole in one of the two neighbours.
//! Windows prefer to end at a paragraph break, then a line break, then a
//! sentence end, then any whitespace; text without any of those (common in
//! Chinese) is cut at exactly `chunk_size` characters.

use serde::Serialize;

use crate::ingestion::CategorizedDocument;

/// Default chunk size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 300;

/// Default overlap between chunks in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 50;

/// Preferred break points, strongest first.
const SEPARATORS: &[&str] = &["\n\n", "\n", "。", ". "];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between adjacent chunks in characters.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

/// A window of text within a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextSpan {
    pub text: String,
    /// Zero-based span index within the document.
    pub index: usize,
    /// Byte offset where this span starts in the original document.
    pub start_offset: usize,
}

/// A chunk of a categorized document: the unit that gets embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    pub text: String,
    /// Source path of the parent document.
    pub source: String,
    /// Category inherited from the parent document.
    pub category: String,
    pub index: usize,
    pub start_offset: usize,
}

/// Split text into overlapping spans.
///
/// Whitespace at span edges is trimmed and blank spans are dropped.
/// Handles UTF-8 multi-byte characters; sizes are counted in characters.
///
/// # Examples
///
/// ```
/// use infostream::chunking::chunk_text;
///
/// let chunks = chunk_text("Hello, world!", 300, 50);
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].text, "Hello, world!");
///
/// let text = "word ".repeat(200);
/// let chunks = chunk_text(&text, 300, 50);
/// assert!(chunks.len() >= 3);
/// ```
pub fn chunk_text(
    text: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<TextSpan> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);

    // char index -> byte index, with a sentinel for the end of the text
    let char_to_byte: Vec<usize> = text
        .char_indices()
        .map(|(byte_idx, _)| byte_idx)
        .chain(std::iter::once(text.len()))
        .collect();
    let char_count = char_to_byte.len() - 1;

    let mut spans = Vec::new();
    let mut start_char = 0;

    while start_char < char_count {
        let end_char = (start_char + chunk_size).min(char_count);
        let cut_char = if end_char < char_count {
            find_break(text, &char_to_byte, start_char, end_char, chunk_size)
        } else {
            end_char
        };

        push_span(
            text,
            char_to_byte[start_char],
            char_to_byte[cut_char],
            &mut spans,
        );

        if cut_char >= char_count {
            break;
        }
        start_char = cut_char.saturating_sub(overlap).max(start_char + 1);
    }

    spans
}

fn push_span(
    text: &str,
    start_byte: usize,
    end_byte: usize,
    spans: &mut Vec<TextSpan>,
) {
    let raw = &text[start_byte..end_byte];
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    let leading = raw.len() - raw.trim_start().len();
    spans.push(TextSpan {
        text: trimmed.to_string(),
        index: spans.len(),
        start_offset: start_byte + leading,
    });
}

/// Find the char index at which to end a window spanning
/// `[start_char, end_char)`. Never returns a position in the first half of
/// the window, so chunks stay reasonably full.
fn find_break(
    text: &str,
    char_to_byte: &[usize],
    start_char: usize,
    end_char: usize,
    chunk_size: usize,
) -> usize {
    let min_char = (start_char + chunk_size / 2).max(start_char + 1);
    if min_char >= end_char {
        return end_char;
    }

    let region_start = char_to_byte[min_char];
    let region = &text[region_start..char_to_byte[end_char]];

    let after_byte = SEPARATORS
        .iter()
        .find_map(|sep| region.rfind(sep).map(|i| i + sep.len()))
        .or_else(|| {
            region
                .char_indices()
                .rev()
                .find(|(_, c)| c.is_whitespace())
                .map(|(i, c)| i + c.len_utf8())
        });

    match after_byte {
        Some(offset) => {
            let byte = region_start + offset;
            char_to_byte.partition_point(|&b| b < byte)
        }
        None => end_char,
    }
}

/// Split categorized documents into chunks carrying their parent's source
/// and category.
pub fn split_documents(
    documents: &[CategorizedDocument],
    config: ChunkingConfig,
) -> Vec<Chunk> {
    documents
        .iter()
        .flat_map(|doc| {
            chunk_text(&doc.content, config.chunk_size, config.overlap)
                .into_iter()
                .map(|span| Chunk {
                    text: span.text,
                    source: doc.source.clone(),
                    category: doc.category.clone(),
                    index: span.index,
                    start_offset: span.start_offset,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_single_chunk() {
        let chunks = chunk_text(
            "Hello, world!",
            DEFAULT_CHUNK_SIZE,
            DEFAULT_CHUNK_OVERLAP,
        );
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].start_offset, 0);
    }

    #[test]
    fn empty_and_blank_text_produce_nothing() {
        assert!(chunk_text("", 300, 50).is_empty());
        assert!(chunk_text("   \n\n  ", 300, 50).is_empty());
    }

    #[test]
    fn long_text_multiple_overlapping_chunks() {
        let text = "word ".repeat(500); // 2500 chars
        let chunks = chunk_text(&text, 300, 50);

        assert!(chunks.len() >= 8);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert!(chunk.text.chars().count() <= 300);
        }

        let first_end = chunks[0].start_offset + chunks[0].text.len();
        assert!(chunks[1].start_offset < first_end, "chunks should overlap");
    }

    #[test]
    fn chunks_cover_full_text() {
        let text = "a".repeat(1000);
        let chunks = chunk_text(&text, 300, 50);

        assert_eq!(chunks[0].start_offset, 0);
        let last = chunks.last().unwrap();
        assert_eq!(last.start_offset + last.text.len(), text.len());
    }

    #[test]
    fn prefers_paragraph_breaks() {
        let first = "alpha ".repeat(30); // 180 chars
        let second = "beta ".repeat(40); // 200 chars
        let text = format!("{}\n\n{}", first.trim(), second.trim());
        let chunks = chunk_text(&text, 300, 0);

        assert_eq!(chunks[0].text, first.trim());
        assert!(chunks[1].text.starts_with("beta"));
    }

    #[test]
    fn cuts_text_without_separators_at_chunk_size() {
        let text = "数".repeat(700);
        let chunks = chunk_text(&text, 300, 50);

        assert_eq!(chunks[0].text.chars().count(), 300);
        // 0..300, 250..550, 500..700
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].start_offset, "数".len() * 250);
    }

    #[test]
    fn handles_mixed_length_unicode() {
        let text = "café ☕ naïve 日本語 🎉 ".repeat(50);
        let chunks = chunk_text(&text, 100, 20);

        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.text.chars().count() > 0);
            assert!(chunk.text.chars().count() <= 100);
            assert_eq!(
                &text[chunk.start_offset..chunk.start_offset + chunk.text.len()],
                chunk.text
            );
        }
    }

    #[test]
    fn overlap_larger_than_chunk_still_terminates() {
        let text = "x".repeat(50);
        let chunks = chunk_text(&text, 10, 100);
        assert!(!chunks.is_empty());
        assert!(chunks.len() <= 50);
    }

    #[test]
    fn chunks_inherit_document_category() {
        let docs = vec![
            CategorizedDocument {
                source: "docs/a.txt".into(),
                content: "neural ".repeat(100),
                category: "AI & Technology".into(),
            },
            CategorizedDocument {
                source: "docs/b.txt".into(),
                content: "history ".repeat(100),
                category: "Humanities & History".into(),
            },
        ];

        let chunks = split_documents(&docs, ChunkingConfig::default());
        assert!(chunks.len() > 2);
        for chunk in &chunks {
            let parent = docs.iter().find(|d| d.source == chunk.source).unwrap();
            assert_eq!(chunk.category, parent.category);
        }
    }
}
