//! Grounded answer generation, streamed fragment by fragment.

use std::pin::Pin;
use std::sync::Arc;

use ai_llm_service::LlmProfile;
use async_stream::try_stream;
use futures::{Stream, StreamExt};
use rag_store::RagHit;
use tracing::debug;

use crate::error::ContextorError;
use crate::llm::ChatModel;
use crate::prompt::{qa_system, to_messages};
use crate::session::ChatTurn;

/// Answer fragments in arrival order.
pub type AnswerStream = Pin<Box<dyn Stream<Item = Result<String, ContextorError>> + Send>>;

#[derive(Clone)]
pub struct AnswerGenerator {
    chat: Arc<dyn ChatModel>,
    max_ctx_chars: usize,
}

impl AnswerGenerator {
    pub fn new(chat: Arc<dyn ChatModel>, max_ctx_chars: usize) -> Self {
        Self {
            chat,
            max_ctx_chars,
        }
    }

    /// Starts the answer stream.
    ///
    /// The stream ends with [`ContextorError::Generation`] if the model
    /// stops without any non-empty fragment. Empty fragments are skipped.
    ///
    /// # Errors
    /// Failure to open the model stream.
    pub async fn generate_streaming(
        &self,
        question: &str,
        hits: &[RagHit],
        history: &[ChatTurn],
    ) -> Result<AnswerStream, ContextorError> {
        let system = qa_system(hits, self.max_ctx_chars);
        let messages = to_messages(&system, history, question);
        debug!(
            context_chunks = hits.len(),
            system_chars = system.len(),
            "opening answer stream"
        );

        let mut upstream = self
            .chat
            .stream(LlmProfile::Chat, &messages)
            .await
            .map_err(ContextorError::from_llm)?;

        Ok(Box::pin(try_stream! {
            let mut produced = false;
            while let Some(item) = upstream.next().await {
                let fragment = item.map_err(ContextorError::from_llm)?;
                if fragment.is_empty() {
                    continue;
                }
                produced = true;
                yield fragment;
            }
            if !produced {
                Err::<(), _>(ContextorError::Generation(
                    "the model returned an empty answer".into(),
                ))?;
            }
        }))
    }
}
