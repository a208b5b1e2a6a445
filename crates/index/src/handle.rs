use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OpenFlags, OptionalExtension};

use pdfsearch_core::query::{self, MatchExpression};
use pdfsearch_core::role::split_roles;
use pdfsearch_core::search::{self, FieldScores, Hit, Mode};
use pdfsearch_core::{PageRecord, Role, Strategy};

use crate::schema::{self, CONTENT_COLUMN, FTS_COLUMNS, INDEX_FILE};
use crate::scoring::ColumnScorer;
use crate::{IndexError, IndexMeta};

/// A read-only view of a built index.
///
/// Dropping the handle closes the connection; [`IndexHandle::close`] does the
/// same but reports errors.
#[derive(Debug)]
pub struct IndexHandle {
    conn: Connection,
    path: PathBuf,
}

impl IndexHandle {
    /// Open the index stored in `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, IndexError> {
        let path = dir.as_ref().join(INDEX_FILE);
        if !path.is_file() {
            return Err(IndexError::NotFound(path));
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        let handle = Self { conn, path };
        handle.check_schema_version()?;
        log::debug!("opened index {}", handle.path.display());
        Ok(handle)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn close(self) -> Result<(), IndexError> {
        self.conn.close().map_err(|(_, e)| IndexError::Sqlite(e))
    }

    fn meta_value(&self, key: &str) -> Result<Option<String>, IndexError> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn required_meta(&self, key: &str) -> Result<String, IndexError> {
        self.meta_value(key)?
            .ok_or_else(|| IndexError::Corrupt(format!("missing metadata key '{key}'")))
    }

    fn check_schema_version(&self) -> Result<(), IndexError> {
        let found = self
            .meta_value(schema::META_SCHEMA_VERSION)
            .map_err(|_| IndexError::Corrupt(format!("{} has no index metadata", self.path.display())))?
            .unwrap_or_default();

        if found != schema::SCHEMA_VERSION.to_string() {
            return Err(IndexError::SchemaVersion {
                found,
                expected: schema::SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    /// Provenance of the indexed document.
    pub fn metadata(&self) -> Result<IndexMeta, IndexError> {
        let strategy = self
            .required_meta(schema::META_STRATEGY)?
            .parse::<Strategy>()
            .map_err(|e| IndexError::Corrupt(e.to_string()))?;
        let page_count = self
            .required_meta(schema::META_PAGE_COUNT)?
            .parse::<usize>()
            .map_err(|e| IndexError::Corrupt(format!("page_count: {e}")))?;

        Ok(IndexMeta {
            schema_version: schema::SCHEMA_VERSION,
            source_path: self.required_meta(schema::META_SOURCE_PATH)?,
            source_sha256: self.required_meta(schema::META_SOURCE_SHA256)?,
            strategy,
            page_count,
            built_at: self.required_meta(schema::META_BUILT_AT)?,
        })
    }

    /// Roles present per page, from the `text_types` column.
    fn page_roles(&self) -> Result<BTreeMap<usize, BTreeSet<Role>>, IndexError> {
        let mut stmt = self
            .conn
            .prepare("SELECT page_number, text_types FROM pages")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut roles = BTreeMap::new();
        for row in rows {
            let (page, text_types) = row?;
            let set = split_roles(&text_types)
                .map_err(|e| IndexError::Corrupt(format!("page {page}: {e}")))?
                .into_iter()
                .collect();
            roles.insert(page as usize, set);
        }
        Ok(roles)
    }

    /// Every stored page, ordered by page number.
    pub fn records(&self) -> Result<Vec<PageRecord>, IndexError> {
        let roles = self.page_roles()?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT rowid, {} FROM page_text ORDER BY rowid",
            FTS_COLUMNS.join(", ")
        ))?;

        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let page_number = row.get::<_, i64>(0)? as usize;
            let full_text: String = row.get(1)?;

            let mut role_text = BTreeMap::new();
            for (i, role) in Role::ALL.iter().enumerate() {
                let text: String = row.get(i + 2)?;
                if !text.is_empty() {
                    role_text.insert(*role, text);
                }
            }

            records.push(PageRecord {
                page_number,
                full_text,
                role_text,
                roles_present: roles.get(&page_number).cloned().unwrap_or_default(),
            });
        }
        Ok(records)
    }

    /// Run `query` in the given mode and return ranked hits.
    ///
    /// An empty index, or a query nothing matches, yields `Ok(vec![])`.
    pub fn search(&self, query: &str, mode: Mode) -> Result<Vec<Hit>, IndexError> {
        let expression = query::parse(query)?;
        log::debug!("{} search: {}", mode, expression.as_str());

        let hits = match mode {
            Mode::General => search::rank_general(self.content_hits(&expression)?),
            Mode::Headings => search::rank_headings(self.content_hits(&expression)?),
            Mode::Topics => search::rank_topics(self.content_hits(&expression)?),
            Mode::Weighted => search::rank_weighted(self.field_scores(&expression)?),
        };

        log::info!("{} search for {:?}: {} hits", mode, query, hits.len());
        Ok(hits)
    }

    /// Pages matching a column-restricted expression, by page number.
    fn matching_pages(&self, filter: &str) -> Result<Vec<usize>, IndexError> {
        let mut stmt = self
            .conn
            .prepare("SELECT rowid FROM page_text WHERE page_text MATCH ?1 ORDER BY rowid")
            .map_err(IndexError::from_match)?;
        let pages = stmt
            .query_map([filter], |row| row.get::<_, i64>(0))
            .map_err(IndexError::from_match)?
            .map(|page| page.map(|p| p as usize))
            .collect::<Result<Vec<_>, _>>()
            .map_err(IndexError::from_match)?;
        Ok(pages)
    }

    /// All pages whose full text matches, scored on the content column and
    /// best first.
    fn content_hits(&self, expression: &MatchExpression) -> Result<Vec<Hit>, IndexError> {
        let pages = self.matching_pages(&expression.restrict_to(&[CONTENT_COLUMN]))?;
        if pages.is_empty() {
            return Ok(Vec::new());
        }

        let roles = self.page_roles()?;
        let scores = ColumnScorer::new(&self.conn, CONTENT_COLUMN)?.scores(expression.terms())?;

        let mut hits: Vec<Hit> = pages
            .into_iter()
            .map(|page| {
                Hit::new(
                    page,
                    scores.get(&page).copied().unwrap_or(0.0),
                    roles.get(&page).cloned().unwrap_or_default(),
                )
            })
            .collect();
        search::sort_hits(&mut hits);
        Ok(hits)
    }

    /// Per-role relevance of every page matching in a weighted field.
    fn field_scores(&self, expression: &MatchExpression) -> Result<Vec<FieldScores>, IndexError> {
        let columns = schema::weighted_columns();
        let pages = self.matching_pages(&expression.restrict_to(&columns))?;
        if pages.is_empty() {
            return Ok(Vec::new());
        }

        let roles = self.page_roles()?;
        let mut per_role = Vec::with_capacity(columns.len());
        for (role, column) in Role::WEIGHTED.iter().zip(&columns) {
            let scores = ColumnScorer::new(&self.conn, column)?.scores(expression.terms())?;
            per_role.push((*role, scores));
        }

        Ok(pages
            .into_iter()
            .map(|page_number| FieldScores {
                page_number,
                roles_present: roles.get(&page_number).cloned().unwrap_or_default(),
                scores: per_role
                    .iter()
                    .map(|(role, scores)| (*role, scores.get(&page_number).copied().unwrap_or(0.0)))
                    .collect(),
            })
            .collect())
    }
}
