//! Unified error types for the crate.

use ai_llm_service::AiLlmError;
use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or unsupported configuration.
    #[error("config error: {0}")]
    Config(String),

    /// The uploaded file could not be turned into text.
    #[error("extraction failed: {0}")]
    Extraction(String),

    /// The document has no extractable text.
    #[error("document contains no extractable text")]
    EmptyDocument,

    /// Embedding backend call failed.
    #[error("embedding provider failed: {0}")]
    Provider(#[from] AiLlmError),

    /// Embedding backend answered, but with unusable output.
    #[error("malformed embedding output: {0}")]
    MalformedEmbedding(String),

    /// Mismatch in vector dimensionality.
    #[error("vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// A blocking task panicked or was cancelled.
    #[error("background task failed: {0}")]
    Join(String),
}

impl RagError {
    /// `true` for failures of the embedding step (transport or output shape).
    pub fn is_embedding(&self) -> bool {
        matches!(
            self,
            RagError::Provider(_) | RagError::MalformedEmbedding(_) | RagError::VectorSizeMismatch { .. }
        )
    }
}
