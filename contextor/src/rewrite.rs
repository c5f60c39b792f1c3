//! Follow-up question → standalone question.

use std::sync::Arc;

use ai_llm_service::error_handler::{ProviderError, ProviderErrorKind};
use ai_llm_service::{AiLlmError, LlmProfile};
use tracing::debug;

use crate::error::ContextorError;
use crate::llm::ChatModel;
use crate::prompt::{CONTEXTUALIZE_SYSTEM, to_messages};
use crate::session::ChatTurn;

#[derive(Clone)]
pub struct QueryRewriter {
    chat: Arc<dyn ChatModel>,
}

impl QueryRewriter {
    pub fn new(chat: Arc<dyn ChatModel>) -> Self {
        Self { chat }
    }

    /// Reformulates `question` so it can be understood without `history`.
    ///
    /// With an empty history the question is returned unchanged and the
    /// model is not called. A blank reply also yields the question.
    ///
    /// # Errors
    /// [`ContextorError::Generation`] or [`ContextorError::Configuration`]
    /// if the model call fails.
    pub async fn rewrite(
        &self,
        history: &[ChatTurn],
        question: &str,
    ) -> Result<String, ContextorError> {
        if history.is_empty() {
            return Ok(question.to_string());
        }

        let messages = to_messages(CONTEXTUALIZE_SYSTEM, history, question);
        let reply = match self.chat.complete(LlmProfile::Rewrite, &messages).await {
            Ok(reply) => reply,
            // providers report a whitespace-only completion as an error
            Err(AiLlmError::Provider(ProviderError {
                kind: ProviderErrorKind::EmptyChoices,
                ..
            })) => String::new(),
            Err(e) => return Err(ContextorError::from_llm(e)),
        };

        let reply = reply.trim();
        if reply.is_empty() {
            debug!("rewrite reply was blank; keeping the question");
            return Ok(question.to_string());
        }
        debug!(standalone = %reply, turns = history.len(), "question rewritten");
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatFuture;
    use ai_llm_service::error_handler::{HttpError, Provider, StatusCode};
    use ai_llm_service::{ChatMessage, TextStream};

    struct Replies(fn() -> Result<String, AiLlmError>);

    impl ChatModel for Replies {
        fn complete<'a>(
            &'a self,
            _profile: LlmProfile,
            _messages: &'a [ChatMessage],
        ) -> ChatFuture<'a, String> {
            let reply = (self.0)();
            Box::pin(async move { reply })
        }

        fn stream<'a>(
            &'a self,
            _profile: LlmProfile,
            _messages: &'a [ChatMessage],
        ) -> ChatFuture<'a, TextStream> {
            Box::pin(async {
                Err(ProviderError::new(Provider::OpenAI, ProviderErrorKind::InvalidProvider).into())
            })
        }
    }

    fn history() -> Vec<ChatTurn> {
        vec![
            ChatTurn::user("Tell me about the sky"),
            ChatTurn::assistant("The sky is blue."),
        ]
    }

    fn rewriter(reply: fn() -> Result<String, AiLlmError>) -> QueryRewriter {
        QueryRewriter::new(Arc::new(Replies(reply)))
    }

    #[tokio::test]
    async fn empty_completion_keeps_the_question() {
        let r = rewriter(|| {
            Err(ProviderError::new(Provider::OpenAI, ProviderErrorKind::EmptyChoices).into())
        });
        assert_eq!(r.rewrite(&history(), "And its color?").await.unwrap(), "And its color?");
    }

    #[tokio::test]
    async fn blank_reply_keeps_the_question() {
        let r = rewriter(|| Ok("  \n".into()));
        assert_eq!(r.rewrite(&history(), "And its color?").await.unwrap(), "And its color?");
    }

    #[tokio::test]
    async fn reply_is_trimmed() {
        let r = rewriter(|| Ok(" What color is the sky?\n".into()));
        assert_eq!(
            r.rewrite(&history(), "And its color?").await.unwrap(),
            "What color is the sky?"
        );
    }

    #[tokio::test]
    async fn other_provider_failures_propagate() {
        let r = rewriter(|| {
            Err(ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::HttpStatus(HttpError {
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    url: "http://llm/v1/chat/completions".into(),
                    snippet: "overloaded".into(),
                }),
            )
            .into())
        });
        let err = r.rewrite(&history(), "And its color?").await.unwrap_err();
        assert!(matches!(err, ContextorError::Generation(_)));
    }
}
