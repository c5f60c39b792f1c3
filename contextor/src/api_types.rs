//! Public API types re-used by external crates (e.g., the HTTP API layer).

use rag_store::RagHit;
use rag_store::record::clamp_snippet;
use serde::Serialize;

/// A compact record of a context chunk that was fed to the model.
///
/// # Example
/// ```
/// use contextor::UsedChunk;
/// let c = UsedChunk { score: 0.92, page: 3, ordinal: 7, text: "The sky is blue.".into() };
/// assert!(c.score > 0.0);
/// ```
#[derive(Clone, Debug, Serialize)]
pub struct UsedChunk {
    pub score: f32,
    pub page: u32,
    pub ordinal: usize,
    pub text: String,
}

impl UsedChunk {
    pub(crate) fn from_hit(h: &RagHit) -> Self {
        Self {
            score: h.score,
            page: h.chunk.page,
            ordinal: h.chunk.ordinal,
            text: clamp_snippet(&h.chunk.text, 800),
        }
    }
}

/// Collected result of one non-streaming chat turn.
#[derive(Clone, Debug, Serialize)]
pub struct AskOutcome {
    pub session_id: String,
    /// Concatenated fragments; may be partial when `error` is set.
    pub answer: String,
    /// Error frame payload, if the turn failed.
    pub error: Option<String>,
    /// Stable code of the error (see `ContextorError::kind`).
    pub error_kind: Option<&'static str>,
    /// Question sent to the index; `None` if retrieval never ran.
    pub standalone_question: Option<String>,
    pub context: Vec<UsedChunk>,
}
