//! Conversational RAG over the current document.
//!
//! Public API: [`RagChat`]. Per turn it loads the session history, rewrites
//! the question into a standalone one, retrieves the top-K chunks from the
//! current [`rag_store::DocumentIndex`] snapshot, and streams a grounded
//! answer as [`ChatFrame`]s through a bounded channel.

pub mod cfg;
mod error;
pub mod frame;
pub mod generate;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod rewrite;
pub mod session;

mod api_types;

pub use api_types::{AskOutcome, UsedChunk};
pub use cfg::ContextorConfig;
pub use error::ContextorError;
pub use frame::{ChatFrame, END_OF_STREAM, ERROR_PREFIX};
pub use generate::{AnswerGenerator, AnswerStream};
pub use llm::{ChatFuture, ChatModel, ProfileChat};
pub use pipeline::RagChat;
pub use retriever::{HistoryAwareRetriever, Retrieval};
pub use rewrite::QueryRewriter;
pub use session::{ChatHistory, ChatTurn, SessionStore, Speaker, new_session_id};
