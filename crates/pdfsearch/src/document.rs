use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use pdfsearch_core::{PageContent, Span};

use crate::prelude::*;

/// A PDF read from disk and reduced to per-page text and spans.
#[derive(Debug)]
pub struct Document {
    /// Absolute path when it can be resolved, otherwise as given.
    pub path: PathBuf,
    pub sha256: String,
    pub pages: Vec<PageContent>,
}

impl Document {
    pub fn span_count(&self) -> usize {
        self.pages.iter().map(|p| p.spans.len()).sum()
    }

    /// All spans in document order.
    pub fn spans(&self) -> Vec<Span> {
        self.pages.iter().flat_map(|p| p.spans.clone()).collect()
    }
}

/// Read and extract `path`. Any failure is [`Error::DocumentUnreadable`].
pub fn load(path: &Path) -> Result<Document> {
    let unreadable = |reason: String| Error::DocumentUnreadable {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = std::fs::read(path).map_err(|e| unreadable(e.to_string()))?;
    let extracted = pdf::extract_pages(&bytes).map_err(|e| unreadable(e.to_string()))?;
    log::info!("extracted {} pages from {}", extracted.len(), path.display());

    Ok(Document {
        path: absolute(path),
        sha256: sha256_hex(&bytes),
        pages: extracted.into_iter().map(to_page_content).collect(),
    })
}

fn to_page_content(page: pdf::PageText) -> PageContent {
    let spans = page
        .spans
        .into_iter()
        .map(|span| Span::new(span.text, span.font_size, span.is_bold, page.number))
        .collect();

    PageContent {
        page_number: page.number,
        full_text: page.text,
        spans,
    }
}

pub fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
