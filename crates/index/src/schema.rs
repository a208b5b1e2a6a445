//! On-disk layout of the page index.
//!
//! Field names and weight columns are a stable contract: reports, `info` and
//! any external reader of `index.sqlite3` rely on them.

use pdfsearch_core::Role;

/// Bumped whenever the table layout changes.
pub const SCHEMA_VERSION: u32 = 1;

pub const INDEX_FILE: &str = "index.sqlite3";

/// Suffix of the file a build writes before it is swapped in.
pub const BUILDING_SUFFIX: &str = ".building";

/// Full-text column holding the unclassified page text.
pub const CONTENT_COLUMN: &str = "content";

/// Columns of the `page_text` FTS5 table, in declaration order.
pub const FTS_COLUMNS: [&str; 11] = [
    CONTENT_COLUMN,
    "title_content",
    "heading1_content",
    "heading2_content",
    "heading3_content",
    "body_content",
    "bold_content",
    "bullet_content",
    "numbered_list_content",
    "caption_content",
    "footnote_content",
];

pub const CREATE_TABLES: &str = "
    CREATE VIRTUAL TABLE page_text USING fts5(
        content,
        title_content,
        heading1_content,
        heading2_content,
        heading3_content,
        body_content,
        bold_content,
        bullet_content,
        numbered_list_content,
        caption_content,
        footnote_content,
        tokenize = 'porter unicode61'
    );

    CREATE TABLE pages (
        page_number     INTEGER PRIMARY KEY,
        title           TEXT NOT NULL,
        text_types      TEXT NOT NULL,
        title_weight    INTEGER NOT NULL,
        heading1_weight INTEGER NOT NULL,
        heading2_weight INTEGER NOT NULL,
        heading3_weight INTEGER NOT NULL,
        body_weight     INTEGER NOT NULL,
        bold_weight     INTEGER NOT NULL
    );

    CREATE TABLE index_meta (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );
";

// index_meta keys
pub const META_SCHEMA_VERSION: &str = "schema_version";
pub const META_SOURCE_PATH: &str = "source_path";
pub const META_SOURCE_SHA256: &str = "source_sha256";
pub const META_STRATEGY: &str = "strategy";
pub const META_PAGE_COUNT: &str = "page_count";
pub const META_BUILT_AT: &str = "built_at";

/// FTS column names of the roles that carry a weight.
pub fn weighted_columns() -> Vec<String> {
    Role::WEIGHTED.iter().map(Role::field_name).collect()
}
