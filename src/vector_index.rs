//! In-memory nearest-neighbor index over chunk embeddings.
//!
//! The store is a flat list of normalized vectors searched exhaustively by
//! cosine similarity. At archive scale (thousands of chunks) an exact scan
//! is fast and has no recall loss.

use std::cmp::Ordering;

use crate::{
    chunking::Chunk,
    embedding::{self, Embedder},
    error::{Error, Result},
};

/// One indexed chunk and its embedding.
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// A search hit: a borrowed entry plus its similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct Neighbor<'a> {
    pub score: f32,
    pub chunk: &'a Chunk,
}

/// Exact cosine-similarity store.
#[derive(Debug, Default)]
pub struct VectorStore {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Add a chunk. The vector must match the store's dimension.
    pub fn insert(&mut self, chunk: Chunk, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::Config(format!(
                "embedding dimension mismatch: expected {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        self.entries.push(IndexEntry { chunk, vector });
        Ok(())
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Ties keep insertion order.
    pub fn nearest(&self, query: &[f32], k: usize) -> Vec<Neighbor<'_>> {
        let mut scored: Vec<Neighbor<'_>> = self
            .entries
            .iter()
            .map(|e| Neighbor {
                score: cosine_similarity(query, &e.vector),
                chunk: &e.chunk,
            })
            .collect();

        // Stable sort keeps insertion order for equal scores.
        scored.sort_by(|a, b| {
            b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal)
        });
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity between two vectors. Mismatched lengths and zero
/// vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// A vector store bundled with the embedder that filled it, so queries are
/// embedded exactly like the stored chunks.
pub struct EmbeddingIndex {
    embedder: Box<dyn Embedder>,
    store: VectorStore,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("model", &self.embedder.model_id())
            .field("entries", &self.store.len())
            .finish()
    }
}

impl EmbeddingIndex {
    /// Embed every chunk and build the index.
    pub fn from_chunks(
        chunks: Vec<Chunk>,
        embedder: Box<dyn Embedder>,
        show_progress: bool,
    ) -> Result<Self> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedding::embed_all(embedder.as_ref(), &texts, show_progress)?;

        if vectors.len() != chunks.len() {
            return Err(Error::Config(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let mut store = VectorStore::new(embedder.dimension());
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            store.insert(chunk, vector)?;
        }

        Ok(Self { embedder, store })
    }

    pub fn model_id(&self) -> &str {
        self.embedder.model_id()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn store(&self) -> &VectorStore {
        &self.store
    }

    /// Embed `query` and return the `k` nearest chunks, best first.
    pub fn similarity_search(
        &self,
        query: &str,
        k: usize,
    ) -> Result<Vec<Neighbor<'_>>> {
        let vector = self.embedder.embed_query(query)?;
        Ok(self.store.nearest(&vector, k))
    }
}
