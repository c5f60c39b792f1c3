//! Uploaded documents, as plain text per page.

use serde::Serialize;

/// Text of one page (1-based page number).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub text: String,
}

/// An extracted document. Lives only for the duration of an ingestion.
#[derive(Clone, Debug)]
pub struct Document {
    pub name: String,
    /// blake3 hex digest of the source bytes.
    pub fingerprint: String,
    pub pages: Vec<Page>,
}

impl Document {
    /// Builds a document from raw page texts; pages are numbered from 1.
    pub fn from_pages(name: impl Into<String>, source: &[u8], pages: Vec<String>) -> Self {
        Self {
            name: name.into(),
            fingerprint: blake3::hash(source).to_hex().to_string(),
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(i, text)| Page {
                    number: i as u32 + 1,
                    text,
                })
                .collect(),
        }
    }

    /// `true` if no page has any non-whitespace character.
    pub fn is_blank(&self) -> bool {
        self.pages.iter().all(|p| p.text.trim().is_empty())
    }

    pub fn summary(&self) -> DocumentInfo {
        DocumentInfo {
            name: self.name.clone(),
            fingerprint: self.fingerprint.clone(),
            pages: self.pages.len(),
        }
    }
}

/// What the index remembers about its source document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DocumentInfo {
    pub name: String,
    pub fingerprint: String,
    pub pages: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_are_numbered_from_one() {
        let doc = Document::from_pages("a.pdf", b"bytes", vec!["one".into(), "two".into()]);
        assert_eq!(doc.pages[0].number, 1);
        assert_eq!(doc.pages[1].number, 2);
        assert_eq!(doc.fingerprint.len(), 64);
        assert_eq!(doc.summary().pages, 2);
    }

    #[test]
    fn whitespace_only_document_is_blank() {
        let doc = Document::from_pages("a.pdf", b"x", vec![" \n".into(), "\t".into()]);
        assert!(doc.is_blank());
        let doc = Document::from_pages("a.pdf", b"x", vec![" \n".into(), "hi".into()]);
        assert!(!doc.is_blank());
    }
}
