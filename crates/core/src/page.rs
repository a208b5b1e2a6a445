use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::classify::{ClassifiedSpan, Classifier, Span};
use crate::role::{join_roles, Role};

/// The persisted, per-page unit of the search index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-based page number, unique within the index.
    pub page_number: usize,
    /// Raw page text, independent of classification.
    pub full_text: String,
    /// Role -> span texts of that role joined by a single space.
    pub role_text: BTreeMap<Role, String>,
    pub roles_present: BTreeSet<Role>,
}

impl PageRecord {
    /// Human-readable page label, stored in the index `title` field.
    pub fn label(&self) -> String {
        page_label(self.page_number)
    }

    /// Comma-joined role list, stored in the index `text_types` field.
    pub fn text_types(&self) -> String {
        join_roles(&self.roles_present)
    }

    /// Text for one role, empty when the role is absent from the page.
    pub fn text_for(&self, role: Role) -> &str {
        self.role_text.get(&role).map(String::as_str).unwrap_or("")
    }

    /// Fixed weight table applied to every record.
    pub fn role_weights() -> BTreeMap<Role, u32> {
        Role::WEIGHTED
            .iter()
            .filter_map(|role| role.weight().map(|w| (*role, w)))
            .collect()
    }
}

pub fn page_label(page_number: usize) -> String {
    format!("Page {page_number}")
}

/// Extracted content of one page: raw text plus its formatted spans.
#[derive(Debug, Clone, PartialEq)]
pub struct PageContent {
    pub page_number: usize,
    pub full_text: String,
    pub spans: Vec<Span>,
}

/// Collapse one page's classified spans into a [`PageRecord`].
///
/// Spans are expected in reading order; order is preserved within each role.
pub fn aggregate(
    page_number: usize,
    full_text: impl Into<String>,
    spans: &[ClassifiedSpan],
) -> PageRecord {
    let mut role_text: BTreeMap<Role, String> = BTreeMap::new();

    for span in spans {
        if span.text.is_empty() {
            continue;
        }
        role_text
            .entry(span.role)
            .and_modify(|buf| {
                buf.push(' ');
                buf.push_str(&span.text);
            })
            .or_insert_with(|| span.text.clone());
    }

    let roles_present = role_text.keys().copied().collect();

    PageRecord {
        page_number,
        full_text: full_text.into(),
        role_text,
        roles_present,
    }
}

/// Classify every span of a document and aggregate the result per page.
///
/// Classification runs over the whole document at once, since the relative
/// strategy needs document-wide font statistics. Pages are returned in
/// ascending page order, one record per input page, empty pages included.
pub fn build_page_records(pages: &[PageContent], classifier: &dyn Classifier) -> Vec<PageRecord> {
    let all_spans: Vec<Span> = pages
        .iter()
        .flat_map(|page| {
            page.spans.iter().map(|span| Span {
                page: page.page_number,
                ..span.clone()
            })
        })
        .collect();

    let classified = classifier.classify(&all_spans);

    let mut by_page: BTreeMap<usize, Vec<ClassifiedSpan>> = BTreeMap::new();
    for span in classified {
        by_page.entry(span.page).or_default().push(span);
    }

    let mut records: Vec<PageRecord> = pages
        .iter()
        .map(|page| {
            let spans = by_page.remove(&page.page_number).unwrap_or_default();
            aggregate(page.page_number, page.full_text.clone(), &spans)
        })
        .collect();
    records.sort_by_key(|r| r.page_number);
    records
}
