//! In-memory vector index over the chunks of one document.

use std::cmp::Ordering;

use tracing::{debug, info};

use crate::config::RagConfig;
use crate::document::DocumentInfo;
use crate::embed::EmbeddingsProvider;
use crate::embed_pool::{check_vector, embed_all};
use crate::errors::RagError;
use crate::record::{Chunk, RagHit};

/// Immutable set of (chunk, vector) pairs. Built once, then only read.
#[derive(Debug, Clone)]
pub struct DocumentIndex {
    generation: u64,
    info: DocumentInfo,
    dim: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl DocumentIndex {
    /// Embeds `chunks` and builds an index (generation 0 until published).
    ///
    /// # Errors
    /// Any embedding failure; nothing is kept on error.
    pub async fn build(
        info: DocumentInfo,
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingsProvider,
        cfg: &RagConfig,
    ) -> Result<Self, RagError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embed_all(
            &texts,
            embedder,
            cfg.embed_batch,
            cfg.embed_concurrency,
            cfg.expected_dim,
        )
        .await?;
        let dim = vectors.first().map_or(0, Vec::len);

        info!(
            document = %info.name,
            chunk_count = chunks.len(),
            dim,
            "index built"
        );
        Ok(Self {
            generation: 0,
            info,
            dim,
            chunks,
            vectors,
        })
    }

    pub(crate) fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    /// Embeds `query` and returns the `k` most similar chunks.
    ///
    /// # Errors
    /// Embedding failures, or a query vector of the wrong dimension.
    pub async fn query(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn EmbeddingsProvider,
    ) -> Result<Vec<RagHit>, RagError> {
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        let qv = embedder.embed(query).await?;
        self.search_by_vector(&qv, k)
    }

    /// Top-`k` chunks by cosine similarity, best first; equal scores keep
    /// chunk order.
    pub fn search_by_vector(&self, query: &[f32], k: usize) -> Result<Vec<RagHit>, RagError> {
        if k == 0 || self.chunks.is_empty() {
            return Ok(Vec::new());
        }
        check_vector(query, self.dim)?;

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query, v)))
            .collect();
        // stable: ties stay in ordinal order
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(k);

        debug!(k, hits = scored.len(), generation = self.generation, "index searched");
        Ok(scored
            .into_iter()
            .map(|(i, score)| RagHit {
                score,
                chunk: self.chunks[i].clone(),
            })
            .collect())
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}

/// Cosine similarity; 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
