//! Okapi BM25 relevance of single FTS5 columns.
//!
//! FTS5 decides which pages match. Scores are computed here with an idf that
//! stays positive for terms found on most pages, where the built-in `bm25()`
//! collapses to almost zero.

use std::collections::BTreeMap;

use rusqlite::Connection;

use pdfsearch_core::query::restrict;

use crate::schema::FTS_COLUMNS;
use crate::IndexError;

pub const K1: f64 = 1.2;
pub const B: f64 = 0.75;

/// Opening marker passed to `highlight()`; one per matched phrase instance.
const MATCH_OPEN: char = '\u{1}';

/// `ln(1 + (N - n + 0.5) / (n + 0.5))` for `n` matching pages out of `N`.
pub fn idf(pages: usize, matching: usize) -> f64 {
    let n = matching.min(pages) as f64;
    (1.0 + (pages as f64 - n + 0.5) / (n + 0.5)).ln()
}

/// Saturated term frequency, normalised by column length.
pub fn term_weight(tf: usize, len: usize, avg_len: f64) -> f64 {
    if tf == 0 {
        return 0.0;
    }
    let tf = tf as f64;
    let norm = if avg_len > 0.0 {
        len as f64 / avg_len
    } else {
        1.0
    };
    tf * (K1 + 1.0) / (tf + K1 * (1.0 - B + B * norm))
}

/// Word count as the `unicode61` tokenizer splits text.
pub fn token_count(text: &str) -> usize {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .count()
}

/// Scores pages on one column of `page_text`.
pub struct ColumnScorer<'a> {
    conn: &'a Connection,
    column: &'a str,
    index: usize,
    pages: usize,
    avg_len: f64,
}

impl<'a> ColumnScorer<'a> {
    /// Collect the column's length statistics over every page.
    pub fn new(conn: &'a Connection, column: &'a str) -> Result<Self, IndexError> {
        let index = FTS_COLUMNS
            .iter()
            .position(|c| *c == column)
            .ok_or_else(|| IndexError::Corrupt(format!("unknown column '{column}'")))?;

        let mut stmt = conn.prepare(&format!("SELECT {column} FROM page_text"))?;
        let lengths = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .map(|text| text.map(|t| token_count(&t)))
            .collect::<Result<Vec<_>, _>>()?;

        let pages = lengths.len();
        let avg_len = if pages == 0 {
            0.0
        } else {
            lengths.iter().sum::<usize>() as f64 / pages as f64
        };

        Ok(Self {
            conn,
            column,
            index,
            pages,
            avg_len,
        })
    }

    /// Summed BM25 of `terms` for every page where at least one occurs in
    /// this column. Each term is a rendered match operand.
    pub fn scores(&self, terms: &[String]) -> Result<BTreeMap<usize, f64>, IndexError> {
        let sql = format!(
            "SELECT rowid, highlight(page_text, {}, char(1), char(2)) \
             FROM page_text WHERE page_text MATCH ?1",
            self.index
        );
        let mut stmt = self.conn.prepare(&sql).map_err(IndexError::from_match)?;

        let mut totals: BTreeMap<usize, f64> = BTreeMap::new();
        for term in terms {
            let rows = stmt
                .query_map([restrict(&[self.column], term)], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })
                .map_err(IndexError::from_match)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(IndexError::from_match)?;

            let matched = rows.len();
            let idf = idf(self.pages, matched);
            for (page, marked) in rows {
                let tf = marked.matches(MATCH_OPEN).count();
                let len = token_count(&marked);
                *totals.entry(page as usize).or_insert(0.0) +=
                    idf * term_weight(tf, len, self.avg_len);
            }
            log::trace!("{} {}: {} pages, idf {:.3}", self.column, term, matched, idf);
        }

        Ok(totals)
    }
}
