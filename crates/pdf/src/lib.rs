//! Text and font extraction from PDF documents.
//!
//! [`extract_pages`] turns PDF bytes into one [`PageText`] per page: the
//! cleaned page text in reading order plus the spans that produced it, in
//! content order, each carrying its rendered font size and bold flag.

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use parser::backend::{LopdfBackend, PdfBackend};

pub mod cleanup;
pub mod parser;

pub use parser::text::TextSpan;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF parsing error: {0}")]
    Parse(String),
    #[error("Document is encrypted")]
    Encrypted,
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extracted content of a single page.
#[derive(Debug, Clone, Serialize)]
pub struct PageText {
    /// 1-based page number.
    pub number: usize,
    /// Page text, one line per baseline.
    pub text: String,
    /// Spans in content-stream order. Spans that clean to nothing are kept
    /// with empty text; they still count towards font statistics.
    pub spans: Vec<TextSpan>,
}

/// Extract every page of an in-memory PDF.
///
/// Document-level failures (unparsable, encrypted) are errors. A page whose
/// content stream cannot be decoded is logged and yields an empty page.
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<PageText>, PdfError> {
    let backend = LopdfBackend::load_bytes(bytes)?;
    extract_with(&backend)
}

/// Read and extract a PDF from disk.
pub fn extract_file(path: impl AsRef<Path>) -> Result<Vec<PageText>, PdfError> {
    let bytes = std::fs::read(path)?;
    extract_pages(&bytes)
}

/// Extract pages through any [`PdfBackend`].
pub fn extract_with(backend: &dyn PdfBackend) -> Result<Vec<PageText>, PdfError> {
    let pages = backend.pages();
    let mut result = Vec::with_capacity(pages.len());

    for (&number, &page_id) in &pages {
        let raw = match parser::text::extract_page_spans(backend, page_id) {
            Ok(spans) => spans,
            Err(e) => {
                log::warn!("skipping content of page {}: {}", number, e);
                Vec::new()
            }
        };

        let spans: Vec<TextSpan> = raw
            .into_iter()
            .map(|mut span| {
                span.text = cleanup::clean_span_text(&span.text);
                span
            })
            .collect();

        let text = cleanup::clean_page_text(&parser::text::page_text(&spans));
        log::debug!("page {}: {} spans", number, spans.len());

        result.push(PageText {
            number: number as usize,
            text,
            spans,
        });
    }

    Ok(result)
}
