//! In-memory RAG store: one document at a time.
//!
//! This crate provides:
//! - PDF extraction into per-page [`Document`]s
//! - A recursive character splitter ([`RecursiveSplitter`])
//! - An embedded, cosine-ranked [`DocumentIndex`]
//! - [`RagStore`], which owns the *current* index and swaps it atomically
//!   when a new document is ingested

pub mod chunker;
mod config;
mod document;
pub mod embed;
mod embed_pool;
mod errors;
pub mod extract;
mod index;
pub mod record;
mod retrieve;

pub use chunker::RecursiveSplitter;
pub use config::RagConfig;
pub use document::{Document, DocumentInfo, Page};
pub use embed::{EmbedFuture, EmbeddingsProvider};
pub use embed_pool::embed_all;
pub use errors::RagError;
pub use index::{DocumentIndex, cosine_similarity};
pub use record::{Chunk, RagHit};
pub use retrieve::{IndexRetriever, Retriever};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, trace};

/// Outcome of a successful ingestion.
#[derive(Clone, Debug, Serialize)]
pub struct IngestReport {
    pub document: DocumentInfo,
    pub generation: u64,
    pub chunks: usize,
    pub dim: usize,
}

/// Owner of the current document index.
///
/// The index is published as an `Arc` snapshot: readers clone the `Arc` and
/// never hold the lock while searching. A new ingestion builds its index
/// off to the side and replaces the old one in a single write.
pub struct RagStore {
    cfg: RagConfig,
    splitter: RecursiveSplitter,
    embedder: Arc<dyn EmbeddingsProvider>,
    current: RwLock<Option<Arc<DocumentIndex>>>,
    last_generation: AtomicU64,
}

impl RagStore {
    /// # Errors
    /// Returns `RagError::Config` if `cfg` is invalid.
    pub fn new(cfg: RagConfig, embedder: Arc<dyn EmbeddingsProvider>) -> Result<Self, RagError> {
        cfg.validate()?;
        let splitter = RecursiveSplitter::from_config(&cfg)?;
        trace!(
            chunk_size = cfg.chunk_size,
            chunk_overlap = cfg.chunk_overlap,
            "RagStore::new"
        );
        Ok(Self {
            cfg,
            splitter,
            embedder,
            current: RwLock::new(None),
            last_generation: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    pub fn embedder(&self) -> Arc<dyn EmbeddingsProvider> {
        self.embedder.clone()
    }

    /// Chunks and embeds `doc` without touching the current index.
    ///
    /// # Errors
    /// - [`RagError::EmptyDocument`] if the document yields no chunks
    /// - embedding errors from the provider
    pub async fn build_index(&self, doc: &Document) -> Result<DocumentIndex, RagError> {
        let chunks = self.splitter.split_document(doc);
        if chunks.is_empty() {
            return Err(RagError::EmptyDocument);
        }
        DocumentIndex::build(doc.summary(), chunks, self.embedder.as_ref(), &self.cfg).await
    }

    /// Replaces the current index; returns the generation assigned to it.
    pub async fn publish(&self, index: DocumentIndex) -> u64 {
        let mut current = self.current.write().await;
        // bumped under the write lock, so generations follow publish order
        let generation = self.last_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let index = Arc::new(index.with_generation(generation));
        debug!(
            generation,
            document = %index.info().name,
            replaced = current.is_some(),
            "index published"
        );
        *current = Some(index);
        generation
    }

    /// Chunk → embed → publish. On error the previous index stays current.
    pub async fn ingest(&self, doc: &Document) -> Result<IngestReport, RagError> {
        let index = self.build_index(doc).await?;
        let chunks = index.len();
        let dim = index.dim();
        let generation = self.publish(index).await;

        info!(
            document = %doc.name,
            generation,
            chunk_count = chunks,
            dim,
            "document ingested"
        );
        Ok(IngestReport {
            document: doc.summary(),
            generation,
            chunks,
            dim,
        })
    }

    /// Snapshot of the current index, if any.
    pub async fn current(&self) -> Option<Arc<DocumentIndex>> {
        self.current.read().await.clone()
    }

    /// Retriever bound to the current snapshot, if any.
    pub async fn retriever(&self) -> Option<IndexRetriever> {
        self.current()
            .await
            .map(|index| IndexRetriever::new(index, self.embedder.clone()))
    }

    /// Drops the current index.
    pub async fn clear(&self) {
        self.current.write().await.take();
    }
}
