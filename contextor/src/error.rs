//! Typed error for the contextor crate.

use ai_llm_service::AiLlmError;
use rag_store::RagError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextorError {
    /// Chat was requested before any document was ingested.
    #[error("No document has been processed. Please upload a PDF first.")]
    NoDocument,

    /// The upload could not be turned into an index.
    #[error("{0}")]
    Ingestion(#[source] RagError),

    /// The embedding backend failed or answered with unusable vectors.
    #[error("embedding failed: {0}")]
    Embedding(#[source] RagError),

    /// Rewriting or answer generation failed.
    #[error("An error occurred while generating the response: {0}")]
    Generation(String),

    /// Missing credential, unsupported provider or invalid setting.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ContextorError {
    /// Stable machine-readable code.
    pub fn kind(&self) -> &'static str {
        match self {
            ContextorError::NoDocument => "no_document",
            ContextorError::Ingestion(_) => "ingestion",
            ContextorError::Embedding(_) => "embedding",
            ContextorError::Generation(_) => "generation",
            ContextorError::Configuration(_) => "configuration",
        }
    }

    /// Classifies a failure of the upload path.
    pub fn from_ingest(e: RagError) -> Self {
        match e {
            RagError::Config(msg) => ContextorError::Configuration(msg),
            RagError::Provider(p) if p.is_configuration() => {
                ContextorError::Configuration(p.to_string())
            }
            other => ContextorError::Ingestion(other),
        }
    }

    /// Classifies a failure of query embedding or similarity search.
    pub fn from_retrieval(e: RagError) -> Self {
        match e {
            RagError::Config(msg) => ContextorError::Configuration(msg),
            RagError::Provider(p) if p.is_configuration() => {
                ContextorError::Configuration(p.to_string())
            }
            other => ContextorError::Embedding(other),
        }
    }

    /// Classifies a failure of a chat model call.
    pub fn from_llm(e: AiLlmError) -> Self {
        if e.is_configuration() {
            ContextorError::Configuration(e.to_string())
        } else {
            ContextorError::Generation(e.to_string())
        }
    }

    /// `true` when an ingestion failed because the embedding backend did.
    pub fn is_upstream(&self) -> bool {
        match self {
            ContextorError::Ingestion(e) | ContextorError::Embedding(e) => e.is_embedding(),
            ContextorError::Generation(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::error_handler::{Provider, ProviderError, ProviderErrorKind};

    #[test]
    fn missing_key_is_a_configuration_error() {
        let llm = AiLlmError::Provider(ProviderError::new(
            Provider::OpenAI,
            ProviderErrorKind::MissingApiKey,
        ));
        let err = ContextorError::from_llm(llm);
        assert_eq!(err.kind(), "configuration");

        let llm = AiLlmError::Provider(ProviderError::new(
            Provider::OpenAI,
            ProviderErrorKind::MissingApiKey,
        ));
        let err = ContextorError::from_retrieval(RagError::Provider(llm));
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn remote_failures_are_generation_or_embedding() {
        let llm = AiLlmError::Provider(ProviderError::new(
            Provider::Ollama,
            ProviderErrorKind::EmptyChoices,
        ));
        assert_eq!(ContextorError::from_llm(llm).kind(), "generation");

        let err = ContextorError::from_retrieval(RagError::VectorSizeMismatch { got: 3, want: 4 });
        assert_eq!(err.kind(), "embedding");
        assert!(err.is_upstream());
    }

    #[test]
    fn empty_upload_is_not_upstream() {
        let err = ContextorError::from_ingest(RagError::EmptyDocument);
        assert_eq!(err.kind(), "ingestion");
        assert!(!err.is_upstream());
        assert_eq!(err.to_string(), "document contains no extractable text");
    }

    #[test]
    fn no_document_message_is_user_facing() {
        assert_eq!(
            ContextorError::NoDocument.to_string(),
            "No document has been processed. Please upload a PDF first."
        );
    }
}
