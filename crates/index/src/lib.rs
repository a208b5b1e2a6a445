//! Persistent page index backed by SQLite FTS5.
//!
//! [`IndexBuilder`] writes one row per [`PageRecord`] into a fresh database
//! and atomically swaps it into place. [`IndexHandle`] opens that database
//! read-only and answers searches in every [`Mode`], delegating ordering to
//! `pdfsearch_core::search`.
//!
//! ```rust,ignore
//! let handle = IndexBuilder::new("indexdir").build(&records, &info)?;
//! let hits = handle.search("introduction", Mode::Weighted)?;
//! handle.close()?;
//! ```
//!
//! [`PageRecord`]: pdfsearch_core::PageRecord
//! [`Mode`]: pdfsearch_core::Mode

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use pdfsearch_core::query::QueryError;
use pdfsearch_core::Strategy;

mod builder;
mod handle;
pub mod schema;
pub mod scoring;

pub use builder::IndexBuilder;
pub use handle::IndexHandle;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index not found at {}", .0.display())]
    NotFound(PathBuf),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("index schema version {found} is not supported (expected {expected})")]
    SchemaVersion { found: String, expected: u32 },
    #[error("corrupt index: {0}")]
    Corrupt(String),
}

impl IndexError {
    /// Map an error raised while running a MATCH query. FTS5 syntax errors
    /// are the user's query, not a storage failure.
    pub(crate) fn from_match(err: rusqlite::Error) -> Self {
        let message = err.to_string();
        let rejected = ["fts5", "no such column", "unterminated", "malformed MATCH"]
            .iter()
            .any(|needle| message.contains(needle));

        if rejected {
            IndexError::Query(QueryError::Rejected(message))
        } else {
            IndexError::Sqlite(err)
        }
    }
}

/// Provenance recorded alongside the pages of a build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildInfo {
    pub source_path: String,
    /// Hex SHA-256 of the source document bytes.
    pub source_sha256: String,
    pub strategy: Strategy,
    pub built_at: DateTime<Utc>,
}

/// Metadata read back from an existing index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexMeta {
    pub schema_version: u32,
    pub source_path: String,
    pub source_sha256: String,
    pub strategy: Strategy,
    pub page_count: usize,
    /// RFC 3339 build timestamp.
    pub built_at: String,
}
