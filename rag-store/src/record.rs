//! Core data models used by the library.

use serde::Serialize;

/// A contiguous slice of one page's text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position in document order, across pages.
    pub ordinal: usize,
    pub page: u32,
    /// Byte offsets into the page text.
    pub byte_start: usize,
    pub byte_end: usize,
    pub text: String,
}

/// A single retrieval hit.
#[derive(Clone, Debug, Serialize)]
pub struct RagHit {
    pub score: f32,
    pub chunk: Chunk,
}

/// Clamp long text for transport/UI, keeping char boundaries.
pub fn clamp_snippet(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(max_chars).collect();
    out.push('…');
    out
}
