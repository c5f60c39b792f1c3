//! Retriever that first rewrites the question against the chat history.

use std::sync::Arc;

use rag_store::{RagHit, Retriever};
use tracing::debug;

use crate::error::ContextorError;
use crate::rewrite::QueryRewriter;
use crate::session::ChatTurn;

/// Result of a history-aware lookup.
#[derive(Clone, Debug)]
pub struct Retrieval {
    /// The question actually sent to the index.
    pub standalone: String,
    pub hits: Vec<RagHit>,
}

#[derive(Clone)]
pub struct HistoryAwareRetriever {
    rewriter: QueryRewriter,
    retriever: Arc<dyn Retriever>,
}

impl HistoryAwareRetriever {
    pub fn new(rewriter: QueryRewriter, retriever: Arc<dyn Retriever>) -> Self {
        Self {
            rewriter,
            retriever,
        }
    }

    /// `retriever.retrieve(rewrite(history, question), k)`.
    pub async fn retrieve(
        &self,
        history: &[ChatTurn],
        question: &str,
        k: usize,
    ) -> Result<Retrieval, ContextorError> {
        let standalone = self.rewriter.rewrite(history, question).await?;
        let hits = self
            .retriever
            .retrieve(&standalone, k)
            .await
            .map_err(ContextorError::from_retrieval)?;
        debug!(k, hits = hits.len(), "context retrieved");
        Ok(Retrieval { standalone, hits })
    }
}
