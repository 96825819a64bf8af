//! infostream - semantic search over a categorized archive of text documents.
//!
//! infostream loads the `.txt` files under a directory, tags each one with a
//! category by keyword matching, splits them into overlapping chunks and
//! indexes the chunks with a sentence-embedding model. Queries return the
//! closest chunks, optionally restricted to one category, each with the full
//! text of the document it came from.
//!
//! # Quick start
//!
//! ```no_run
//! use infostream::{ModelManager, Settings};
//! use infostream::pipeline::build_archive;
//! use infostream::search::{self, CategoryFilter, SearchOutcome, SearchRequest};
//!
//! let settings = Settings::with_docs_dir("docs");
//! let models = ModelManager::new();
//! let archive = build_archive(&settings, || models.load());
//!
//! let request = SearchRequest::new("neural networks", CategoryFilter::All, &settings)
//!     .triggered(true);
//! if let SearchOutcome::Found { hits, .. } =
//!     search::execute_search(&archive, &request).unwrap()
//! {
//!     for h in &hits {
//!         println!("{} [{}] (score: {:.3})", h.file_name, h.category, h.score);
//!     }
//! }
//! ```

pub mod category;
pub mod chunking;
pub mod cli;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod model_manager;
pub mod pipeline;
pub mod render;
pub mod search;
pub mod settings;
pub mod text_util;
pub mod vector_index;
pub mod walker;
pub mod web;

pub use category::Taxonomy;
pub use error::{Error, Result};
pub use model_manager::ModelManager;
pub use pipeline::{Archive, BuildStatus};
pub use settings::Settings;
