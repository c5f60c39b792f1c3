//! Recursive character splitter.
//!
//! Text is first broken into *atoms*: contiguous pieces no longer than
//! `chunk_size` characters, cut at the coarsest separator that makes them fit
//! (`"\n\n"`, then `"\n"`, then `" "`, then single characters). Separators stay
//! attached to the piece before them, so atoms tile the text exactly.
//! Atoms are then merged greedily into chunks; each new chunk starts with the
//! longest run of trailing atoms of the previous one that fits in
//! `chunk_overlap` characters.
//!
//! Lengths are counted in `char`s; spans are byte ranges into the input.

use std::collections::VecDeque;
use std::ops::Range;

use tracing::debug;

use crate::config::RagConfig;
use crate::document::Document;
use crate::errors::RagError;
use crate::record::Chunk;

/// Paragraph, line, word.
pub const DEFAULT_SEPARATORS: &[&str] = &["\n\n", "\n", " "];

#[derive(Clone, Debug)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<&'static str>,
}

#[derive(Clone, Copy, Debug)]
struct Atom {
    start: usize,
    end: usize,
    chars: usize,
}

impl RecursiveSplitter {
    /// # Errors
    /// `RagError::Config` unless `0 <= chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, RagError> {
        if chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be > 0".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.to_vec(),
        })
    }

    pub fn from_config(cfg: &RagConfig) -> Result<Self, RagError> {
        Self::new(cfg.chunk_size, cfg.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Byte ranges of the chunks of `text`, in order.
    ///
    /// Consecutive ranges either touch or overlap; the first starts at 0 and
    /// the last ends at `text.len()`. Empty text yields no ranges.
    pub fn spans(&self, text: &str) -> Vec<Range<usize>> {
        if text.is_empty() {
            return Vec::new();
        }
        let mut atoms = Vec::new();
        self.atomize(text, 0..text.len(), 0, &mut atoms);
        self.merge(&atoms)
    }

    /// Chunk texts of `text`, in order.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.spans(text)
            .into_iter()
            .map(|r| text[r].to_string())
            .collect()
    }

    /// Splits every non-blank page; ordinals run across the whole document.
    pub fn split_document(&self, doc: &Document) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        for page in doc.pages.iter().filter(|p| !p.text.trim().is_empty()) {
            for span in self.spans(&page.text) {
                chunks.push(Chunk {
                    ordinal: chunks.len(),
                    page: page.number,
                    text: page.text[span.clone()].to_string(),
                    byte_start: span.start,
                    byte_end: span.end,
                });
            }
        }
        debug!(
            document = %doc.name,
            pages = doc.pages.len(),
            chunks = chunks.len(),
            "document split"
        );
        chunks
    }

    fn atomize(&self, text: &str, range: Range<usize>, level: usize, out: &mut Vec<Atom>) {
        let piece = &text[range.clone()];
        let chars = piece.chars().count();
        if chars <= self.chunk_size {
            out.push(Atom {
                start: range.start,
                end: range.end,
                chars,
            });
            return;
        }

        match self.separators.get(level) {
            Some(sep) => {
                for part in split_keeping_separator(piece, sep) {
                    let abs = range.start + part.start..range.start + part.end;
                    self.atomize(text, abs, level + 1, out);
                }
            }
            None => {
                for (i, c) in piece.char_indices() {
                    out.push(Atom {
                        start: range.start + i,
                        end: range.start + i + c.len_utf8(),
                        chars: 1,
                    });
                }
            }
        }
    }

    fn merge(&self, atoms: &[Atom]) -> Vec<Range<usize>> {
        let mut out = Vec::new();
        let mut window: VecDeque<Atom> = VecDeque::new();
        let mut total = 0usize;

        for &atom in atoms {
            if total + atom.chars > self.chunk_size {
                if let (Some(first), Some(last)) = (window.front(), window.back()) {
                    out.push(first.start..last.end);
                }
                while let Some(front) = window.front() {
                    if total <= self.chunk_overlap && total + atom.chars <= self.chunk_size {
                        break;
                    }
                    total -= front.chars;
                    window.pop_front();
                }
            }
            window.push_back(atom);
            total += atom.chars;
        }

        if let (Some(first), Some(last)) = (window.front(), window.back()) {
            out.push(first.start..last.end);
        }
        out
    }
}

/// Relative ranges of `text` cut after each occurrence of `separator`.
fn split_keeping_separator(text: &str, separator: &str) -> Vec<Range<usize>> {
    let mut result = Vec::new();
    let mut start = 0;

    while let Some(pos) = text[start..].find(separator) {
        let end = start + pos + separator.len();
        result.push(start..end);
        start = end;
    }

    if start < text.len() {
        result.push(start..text.len());
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(RecursiveSplitter::new(10, 10).is_err());
        assert!(RecursiveSplitter::new(0, 0).is_err());
        assert!(RecursiveSplitter::new(10, 9).is_ok());
    }

    #[test]
    fn empty_text_has_no_chunks() {
        let s = RecursiveSplitter::new(10, 2).unwrap();
        assert!(s.spans("").is_empty());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let s = RecursiveSplitter::new(1000, 200).unwrap();
        assert_eq!(s.split_text("The sky is blue."), vec!["The sky is blue."]);
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let s = RecursiveSplitter::new(12, 0).unwrap();
        let text = "aaaa bbbb\n\ncccc dddd\n\n";
        assert_eq!(s.split_text(text), vec!["aaaa bbbb\n\n", "cccc dddd\n\n"]);
    }

    #[test]
    fn words_carry_into_the_next_chunk_as_overlap() {
        let s = RecursiveSplitter::new(10, 4).unwrap();
        let chunks = s.split_text("one two three four");
        assert_eq!(chunks, vec!["one two ", "two three ", "four"]);
    }

    #[test]
    fn unbreakable_runs_are_hard_split_by_chars() {
        let s = RecursiveSplitter::new(4, 1).unwrap();
        let chunks = s.split_text("ééééééé");
        assert_eq!(chunks, vec!["éééé", "éééé"]);
    }

    #[test]
    fn split_keeping_separator_tiles_input() {
        let parts = split_keeping_separator("a\n\nb\n\n", "\n\n");
        assert_eq!(parts, vec![0..3, 3..6]);
        let parts = split_keeping_separator("abc", " ");
        assert_eq!(parts, vec![0..3]);
    }

    #[test]
    fn document_chunks_keep_page_and_global_ordinal() {
        let doc = Document::from_pages(
            "d.pdf",
            b"d",
            vec!["alpha beta".into(), "   ".into(), "gamma delta".into()],
        );
        let s = RecursiveSplitter::new(6, 0).unwrap();
        let chunks = s.split_document(&doc);
        let pages: Vec<u32> = chunks.iter().map(|c| c.page).collect();
        assert_eq!(pages, vec![1, 1, 3, 3]);
        let ordinals: Vec<usize> = chunks.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3]);
        assert_eq!(chunks[2].text, "gamma ");
        assert_eq!(&doc.pages[2].text[chunks[3].byte_start..chunks[3].byte_end], "delta");
    }
}
