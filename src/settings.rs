use std::path::PathBuf;

use crate::{
    category::Taxonomy,
    chunking::ChunkingConfig,
    walker::DEFAULT_GLOB,
};

pub const DOCS_DIR_ENV_VAR: &str = "INFOSTREAM_DOCS_DIR";
pub const DEFAULT_DOCS_DIR: &str = "docs";

/// Nearest neighbors requested per query before category filtering.
pub const DEFAULT_FETCH_K: usize = 20;

/// Results shown per query after filtering.
pub const DEFAULT_DISPLAY_COUNT: usize = 5;

/// Everything the build pipeline and the query handler need to know,
/// resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Archive root. Created on first build if missing.
    pub docs_dir: PathBuf,
    /// Pattern, relative to `docs_dir`, selecting archive documents.
    pub glob: String,
    pub taxonomy: Taxonomy,
    pub chunking: ChunkingConfig,
    pub fetch_k: usize,
    pub display_count: usize,
    /// Offer the default category as a sidebar filter.
    pub show_default_category: bool,
    /// Draw a progress bar on stderr while embedding.
    pub show_progress: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            docs_dir: PathBuf::from(DEFAULT_DOCS_DIR),
            glob: DEFAULT_GLOB.to_string(),
            taxonomy: Taxonomy::default(),
            chunking: ChunkingConfig::default(),
            fetch_k: DEFAULT_FETCH_K,
            display_count: DEFAULT_DISPLAY_COUNT,
            show_default_category: false,
            show_progress: false,
        }
    }
}

impl Settings {
    pub fn with_docs_dir(docs_dir: impl Into<PathBuf>) -> Self {
        Self {
            docs_dir: docs_dir.into(),
            ..Self::default()
        }
    }

    /// Category labels offered as filters.
    pub fn display_categories(&self) -> Vec<String> {
        self.taxonomy.display_labels(self.show_default_category)
    }
}
