use rayon::prelude::*;
use serde::Serialize;

use crate::{category::Taxonomy, walker::DiscoveredFile};

/// A document as read from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDocument {
    /// Archive root joined with the relative path, e.g. `docs/ai_notes.txt`.
    pub source: String,
    /// Path below the archive root with `/` separators, e.g. `ai_notes.txt`.
    pub relative_path: String,
    pub content: String,
}

/// A document with its category. The category is assigned once at load
/// time and never recomputed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorizedDocument {
    pub source: String,
    pub content: String,
    pub category: String,
}

/// Read every discovered file as UTF-8.
///
/// Files are read in parallel; the output keeps the order of `files`.
/// Unreadable or non-UTF-8 files are skipped with a warning.
pub fn load_documents(files: &[DiscoveredFile]) -> Vec<RawDocument> {
    files
        .par_iter()
        .filter_map(|file| match std::fs::read_to_string(&file.source) {
            Ok(content) => Some(RawDocument {
                source: file.source.to_string_lossy().to_string(),
                relative_path: file
                    .relative_path
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/"),
                content,
            }),
            Err(e) => {
                tracing::warn!(
                    path = %file.source.display(),
                    "skipping unreadable document: {e}"
                );
                None
            }
        })
        .collect()
}

/// Attach a category to each document, matching keywords against the
/// root-relative path and the content.
pub fn categorize_documents(
    taxonomy: &Taxonomy,
    documents: Vec<RawDocument>,
) -> Vec<CategorizedDocument> {
    documents
        .into_iter()
        .map(|doc| {
            let category =
                taxonomy.categorize(&doc.relative_path, &doc.content).to_string();
            CategorizedDocument {
                source: doc.source,
                content: doc.content,
                category,
            }
        })
        .collect()
}

/// Count documents per category label.
pub fn count_in_category(
    documents: &[CategorizedDocument],
    category: &str,
) -> usize {
    documents.iter().filter(|d| d.category == category).count()
}
