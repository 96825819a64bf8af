use std::{
    collections::hash_map::DefaultHasher,
    hash::{Hash, Hasher},
};

use kdam::{BarExt, tqdm};

use crate::error::Result;

/// Number of chunks sent to the model per forward pass.
pub const EMBED_BATCH_SIZE: usize = 32;

/// Turns text into fixed-dimension, L2-normalized vectors.
///
/// Implementations must be deterministic: the same text always yields the
/// same vector for a given model.
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model, for logs and status output.
    fn model_id(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed a batch of document texts.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a query. Defaults to embedding it like a document.
    fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed_batch(&[query.to_string()])?;
        Ok(vectors.pop().unwrap_or_else(|| vec![0.0; self.dimension()]))
    }
}

/// Embed many texts in batches, optionally drawing a progress bar on
/// stderr.
pub fn embed_all(
    embedder: &dyn Embedder,
    texts: &[String],
    show_progress: bool,
) -> Result<Vec<Vec<f32>>> {
    let mut bar = (show_progress && !texts.is_empty())
        .then(|| tqdm!(total = texts.len(), desc = "Embedding chunks"));

    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(EMBED_BATCH_SIZE) {
        vectors.extend(embedder.embed_batch(batch)?);
        if let Some(bar) = bar.as_mut() {
            let _ = bar.update(batch.len());
        }
    }

    if bar.is_some() {
        eprintln!();
    }

    Ok(vectors)
}

/// Scale a vector to unit length in place. Zero vectors are left as is.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}

/// Model id that selects [`HashEmbedder`].
pub const HASH_MODEL_ID: &str = "hash";

/// Default vector length for [`HashEmbedder`].
pub const HASH_DIMENSION: usize = 512;

/// A deterministic, model-free embedder based on feature hashing.
///
/// Each ASCII word and each non-ASCII character becomes a token; tokens are
/// hashed into signed buckets and the result is L2-normalized. Texts that
/// share vocabulary end up close together, which is enough for offline use
/// and tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self::new(HASH_DIMENSION)
    }
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dimension];
        for token in tokens(text) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dimension as u64) as usize;
            let sign = if (h >> 63) == 0 { 1.0 } else { -1.0 };
            v[idx] += sign;
        }
        l2_normalize(&mut v);
        v
    }
}

fn tokens(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        if word.is_ascii() {
            out.push(word.to_ascii_lowercase());
        } else {
            out.extend(word.chars().flat_map(char::to_lowercase).map(String::from));
        }
    }
    out
}

impl Embedder for HashEmbedder {
    fn model_id(&self) -> &str {
        HASH_MODEL_ID
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
