//! Chat model capability used by the rewriter and the answer generator.

use std::{future::Future, pin::Pin, sync::Arc};

use ai_llm_service::{AiLlmError, ChatMessage, LlmProfile, LlmServiceProfiles, TextStream};
use tracing::{Instrument, debug_span};

/// Boxed future returned by [`ChatModel`] methods.
pub type ChatFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AiLlmError>> + Send + 'a>>;

/// Anything that can complete a chat, either at once or as a stream.
pub trait ChatModel: Send + Sync {
    fn complete<'a>(
        &'a self,
        profile: LlmProfile,
        messages: &'a [ChatMessage],
    ) -> ChatFuture<'a, String>;

    /// The returned stream is lazy, finite and not restartable.
    fn stream<'a>(
        &'a self,
        profile: LlmProfile,
        messages: &'a [ChatMessage],
    ) -> ChatFuture<'a, TextStream>;
}

/// [`ChatModel`] backed by the configured LLM service profiles.
#[derive(Clone)]
pub struct ProfileChat {
    svc: Arc<LlmServiceProfiles>,
}

impl ProfileChat {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl ChatModel for ProfileChat {
    fn complete<'a>(
        &'a self,
        profile: LlmProfile,
        messages: &'a [ChatMessage],
    ) -> ChatFuture<'a, String> {
        let span = debug_span!("llm.complete", ?profile, messages = messages.len());
        Box::pin(self.svc.complete(profile, messages).instrument(span))
    }

    fn stream<'a>(
        &'a self,
        profile: LlmProfile,
        messages: &'a [ChatMessage],
    ) -> ChatFuture<'a, TextStream> {
        let span = debug_span!("llm.stream", ?profile, messages = messages.len());
        Box::pin(self.svc.stream(profile, messages).instrument(span))
    }
}
