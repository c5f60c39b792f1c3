//! Embedding provider backed by the shared LLM service profiles.

use std::sync::Arc;

use ai_llm_service::service_profiles::LlmServiceProfiles;
use tracing::trace;

use crate::embed::{EmbedFuture, EmbeddingsProvider};

/// Uses the `embedding` profile of [`LlmServiceProfiles`] (Ollama or OpenAI).
#[derive(Clone)]
pub struct LlmEmbedder {
    svc: Arc<LlmServiceProfiles>,
}

impl LlmEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl EmbeddingsProvider for LlmEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a, Vec<f32>> {
        Box::pin(async move {
            trace!(len = text.len(), "LlmEmbedder::embed");
            Ok(self.svc.embed(text).await?)
        })
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> EmbedFuture<'a, Vec<Vec<f32>>> {
        Box::pin(async move {
            trace!(batch = texts.len(), "LlmEmbedder::embed_batch");
            Ok(self.svc.embed_batch(texts).await?)
        })
    }
}
