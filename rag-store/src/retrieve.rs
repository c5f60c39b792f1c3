//! Uniform "fetch relevant chunks for a query" contract.

use std::sync::Arc;

use tracing::trace;

use crate::embed::{EmbedFuture, EmbeddingsProvider};
use crate::index::DocumentIndex;
use crate::record::RagHit;

/// Anything that can return ranked chunks for a text query.
pub trait Retriever: Send + Sync {
    fn retrieve<'a>(&'a self, query: &'a str, k: usize) -> EmbedFuture<'a, Vec<RagHit>>;
}

/// Retriever over one fixed index snapshot.
///
/// Holding the `Arc` keeps the snapshot alive even if a newer document is
/// published while a request is in flight.
#[derive(Clone)]
pub struct IndexRetriever {
    index: Arc<DocumentIndex>,
    embedder: Arc<dyn EmbeddingsProvider>,
}

impl IndexRetriever {
    pub fn new(index: Arc<DocumentIndex>, embedder: Arc<dyn EmbeddingsProvider>) -> Self {
        Self { index, embedder }
    }

    pub fn index(&self) -> &Arc<DocumentIndex> {
        &self.index
    }
}

impl Retriever for IndexRetriever {
    fn retrieve<'a>(&'a self, query: &'a str, k: usize) -> EmbedFuture<'a, Vec<RagHit>> {
        Box::pin(async move {
            trace!(
                k,
                generation = self.index.generation(),
                "IndexRetriever::retrieve"
            );
            self.index.query(query, k, self.embedder.as_ref()).await
        })
    }
}
