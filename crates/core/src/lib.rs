//! Core library for pdfsearch
//!
//! This crate implements the **Functional Core** of the pdfsearch
//! application, following the Functional Core - Imperative Shell pattern.
//!
//! # Architecture Overview
//!
//! - **`pdfsearch_core`** (this crate): pure classification, aggregation,
//!   query parsing and ranking. No I/O.
//! - **`pdf`**: text and font extraction from PDF bytes.
//! - **`pdfsearch_index`**: the SQLite/FTS5 page index.
//! - **`pdfsearch`**: the command-line shell that wires them together.
//!
//! # Pipeline
//!
//! ```text
//! spans -> classify -> aggregate (per page) -> PageRecord -> index
//! query + mode -> parse -> engine scores -> rank_* -> group_by_page -> report
//! ```
//!
//! # Module Organization
//!
//! - [`role`]: the closed set of text roles and their fixed weights
//! - [`classify`]: the `relative` and `fixed` classification strategies
//! - [`page`]: per-page aggregation into [`page::PageRecord`]s
//! - [`query`]: user query syntax to FTS5 match expressions
//! - [`search`]: per-mode ranking, topic multipliers and page grouping
//! - [`report`]: the printable, page-grouped result report
//! - [`analysis`]: role histogram, samples and the advisory prompt
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use pdfsearch_core::classify::{Span, Strategy};
//! use pdfsearch_core::page::{build_page_records, PageContent};
//!
//! let pages = vec![PageContent {
//!     page_number: 1,
//!     full_text: "Introduction".to_string(),
//!     spans: vec![Span::new("Introduction", 18.0, false, 1)],
//! }];
//!
//! let records = build_page_records(&pages, &Strategy::Fixed);
//! assert_eq!(records[0].text_types(), "heading1");
//! ```

pub mod analysis;
pub mod classify;
pub mod page;
pub mod query;
pub mod report;
pub mod role;
pub mod search;

pub use classify::{Classifier, Span, Strategy};
pub use page::{PageContent, PageRecord};
pub use role::Role;
pub use search::{Hit, Mode, PageGroup};
