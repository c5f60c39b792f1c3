//! PDF bytes → per-page text.
//!
//! `pdf-extract` is synchronous and can panic on malformed fonts or
//! streams, so extraction runs inside `catch_unwind`. Callers on an async
//! runtime should use [`pdf_to_document_blocking`].

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{info, warn};

use crate::document::Document;
use crate::errors::RagError;

/// Extracts every page of an in-memory PDF.
///
/// # Errors
/// - [`RagError::Extraction`] if the bytes are not a readable PDF
/// - [`RagError::EmptyDocument`] if no page has extractable text
pub fn pdf_to_document(bytes: &[u8], name: &str) -> Result<Document, RagError> {
    if !has_pdf_header(bytes) {
        return Err(RagError::Extraction(format!("{name} is not a PDF file")));
    }

    let pages = match catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    })) {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => {
            warn!(document = %name, error = %e, "pdf extraction failed");
            return Err(RagError::Extraction(format!("could not read {name}: {e}")));
        }
        Err(_) => {
            warn!(document = %name, "pdf extractor panicked");
            return Err(RagError::Extraction(format!(
                "could not read {name}: the PDF structure is not supported"
            )));
        }
    };

    let doc = Document::from_pages(name, bytes, pages);
    if doc.is_blank() {
        return Err(RagError::EmptyDocument);
    }

    info!(
        document = %name,
        pages = doc.pages.len(),
        bytes = bytes.len(),
        "pdf extracted"
    );
    Ok(doc)
}

/// Readers accept the `%PDF-` marker anywhere in the first 1024 bytes.
fn has_pdf_header(bytes: &[u8]) -> bool {
    const WINDOW: usize = 1024;
    const MARKER: &[u8] = b"%PDF-";
    bytes[..bytes.len().min(WINDOW + MARKER.len() - 1)]
        .windows(MARKER.len())
        .any(|w| w == MARKER)
}

/// [`pdf_to_document`] on tokio's blocking pool.
pub async fn pdf_to_document_blocking(bytes: Vec<u8>, name: String) -> Result<Document, RagError> {
    tokio::task::spawn_blocking(move || pdf_to_document(&bytes, &name))
        .await
        .map_err(|e| RagError::Join(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_pdf_bytes_are_rejected() {
        let err = pdf_to_document(b"hello world", "notes.pdf").unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));
    }

    #[test]
    fn header_may_follow_leading_bytes() {
        assert!(has_pdf_header(b"%PDF-1.4\n"));
        assert!(has_pdf_header(b"\xEF\xBB\xBF junk\r\n%PDF-1.7\n"));

        let mut late = vec![b' '; 1023];
        late.extend_from_slice(b"%PDF-1.4");
        assert!(has_pdf_header(&late));
        late.insert(0, b' ');
        assert!(!has_pdf_header(&late));

        assert!(!has_pdf_header(b"%PD"));
        assert!(!has_pdf_header(b""));
    }

    #[test]
    fn truncated_pdf_is_an_error_not_a_panic() {
        let err = pdf_to_document(b"%PDF-1.4\n%garbage", "broken.pdf").unwrap_err();
        assert!(matches!(err, RagError::Extraction(_)));
    }
}
