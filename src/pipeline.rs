//! Archive construction: load, categorize, chunk, embed, index.
//!
//! [`build_archive`] never fails. Every problem it runs into (missing
//! directory, empty archive, model download failure, embedding failure)
//! turns into a [`BuildStatus`] and an [`Archive`] with whatever could be
//! loaded, so the UI can still show document counts.

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::{
    chunking,
    embedding::Embedder,
    error::Result,
    ingestion::{self, CategorizedDocument},
    settings::Settings,
    vector_index::EmbeddingIndex,
    walker,
};

/// Placeholder shown when a chunk's parent document cannot be found.
pub const FULL_TEXT_NOT_FOUND: &str = "Full text not found";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    /// Index built; search is available.
    Ready,
    /// The docs directory did not exist and has been created empty.
    Created,
    /// The docs directory contains no matching documents.
    Empty,
    /// Documents may be loaded, but search is unavailable.
    Degraded(String),
}

/// The result of one build: immutable and shared for the process lifetime.
#[derive(Debug)]
pub struct Archive {
    pub index: Option<EmbeddingIndex>,
    pub documents: Vec<CategorizedDocument>,
    /// Categories offered as filters.
    pub categories: Vec<String>,
    pub status: BuildStatus,
}

impl Archive {
    fn without_documents(status: BuildStatus) -> Self {
        Self {
            index: None,
            documents: Vec::new(),
            categories: Vec::new(),
            status,
        }
    }

    pub fn total_documents(&self) -> usize {
        self.documents.len()
    }

    pub fn count_in_category(&self, category: &str) -> usize {
        ingestion::count_in_category(&self.documents, category)
    }

    pub fn is_searchable(&self) -> bool {
        self.index.is_some()
    }

    /// Full text of the document with exactly this source path.
    pub fn full_text(&self, source: &str) -> Option<&str> {
        self.documents
            .iter()
            .find(|d| d.source == source)
            .map(|d| d.content.as_str())
    }
}

/// Discover, read and categorize every document under `settings.docs_dir`.
pub fn scan_documents(settings: &Settings) -> Result<Vec<CategorizedDocument>> {
    let glob = walker::compile_glob(&settings.glob)?;
    let files = walker::discover_files(&settings.docs_dir, &glob)?;
    let raw = ingestion::load_documents(&files);
    Ok(ingestion::categorize_documents(&settings.taxonomy, raw))
}

/// Build the archive from `settings.docs_dir`.
///
/// `load_embedder` is only called when there is something to embed.
pub fn build_archive<F>(settings: &Settings, load_embedder: F) -> Archive
where
    F: FnOnce() -> Result<Box<dyn Embedder>>,
{
    let root = &settings.docs_dir;

    if !root.exists() {
        return match std::fs::create_dir_all(root) {
            Ok(()) => {
                tracing::warn!(
                    path = %root.display(),
                    "created missing docs directory; add documents and restart"
                );
                Archive::without_documents(BuildStatus::Created)
            }
            Err(e) => {
                tracing::error!(path = %root.display(), "cannot create docs directory: {e}");
                Archive::without_documents(BuildStatus::Degraded(format!(
                    "cannot create {}: {e}",
                    root.display()
                )))
            }
        };
    }

    let documents = match scan_documents(settings) {
        Ok(documents) => documents,
        Err(e) => {
            tracing::error!(path = %root.display(), "document discovery failed: {e}");
            return Archive::without_documents(BuildStatus::Degraded(
                e.to_string(),
            ));
        }
    };
    if documents.is_empty() {
        tracing::warn!(path = %root.display(), "no documents found");
        return Archive::without_documents(BuildStatus::Empty);
    }

    let categories = settings.display_categories();
    for label in settings.taxonomy.labels() {
        tracing::debug!(
            category = %label,
            count = ingestion::count_in_category(&documents, &label),
            "categorized"
        );
    }

    let chunks = chunking::split_documents(&documents, settings.chunking);
    tracing::info!(
        documents = documents.len(),
        chunks = chunks.len(),
        "archive loaded"
    );

    let index = load_embedder().and_then(|embedder| {
        EmbeddingIndex::from_chunks(chunks, embedder, settings.show_progress)
    });

    match index {
        Ok(index) => {
            tracing::info!(model = index.model_id(), entries = index.len(), "index built");
            Archive {
                index: Some(index),
                documents,
                categories,
                status: BuildStatus::Ready,
            }
        }
        Err(e) => {
            tracing::error!("index build failed, search disabled: {e}");
            Archive {
                index: None,
                documents,
                categories,
                status: BuildStatus::Degraded(e.to_string()),
            }
        }
    }
}

/// Process-wide, lazily built archive.
///
/// The first caller of [`get_or_build`](Self::get_or_build) runs the build
/// on the blocking thread pool; concurrent callers wait for it and every
/// later caller gets the cached value.
#[derive(Debug, Default)]
pub struct ArchiveCell {
    cell: OnceCell<Arc<Archive>>,
}

impl ArchiveCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already built archive.
    pub fn ready(archive: Archive) -> Self {
        Self {
            cell: OnceCell::new_with(Some(Arc::new(archive))),
        }
    }

    pub fn get(&self) -> Option<Arc<Archive>> {
        self.cell.get().cloned()
    }

    pub async fn get_or_build<F>(&self, build: F) -> Arc<Archive>
    where
        F: FnOnce() -> Archive + Send + 'static,
    {
        self.cell
            .get_or_init(|| async move {
                match tokio::task::spawn_blocking(build).await {
                    Ok(archive) => Arc::new(archive),
                    Err(e) => {
                        tracing::error!("archive build task failed: {e}");
                        Arc::new(Archive::without_documents(
                            BuildStatus::Degraded(e.to_string()),
                        ))
                    }
                }
            })
            .await
            .clone()
    }
}
