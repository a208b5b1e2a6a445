use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{params, Connection};

use pdfsearch_core::{PageRecord, Role};

use crate::handle::IndexHandle;
use crate::schema::{self, BUILDING_SUFFIX, INDEX_FILE};
use crate::{BuildInfo, IndexError};

/// Writes a complete index for one document.
///
/// A build never touches the live index file until every page is committed:
/// rows go into `index.sqlite3.building`, which is renamed over
/// `index.sqlite3` only after the connection is closed.
#[derive(Debug, Clone)]
pub struct IndexBuilder {
    dir: PathBuf,
}

impl IndexBuilder {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn index_path(&self) -> PathBuf {
        self.dir.join(INDEX_FILE)
    }

    fn building_path(&self) -> PathBuf {
        self.dir.join(format!("{INDEX_FILE}{BUILDING_SUFFIX}"))
    }

    /// Build the index from `records` and open it for querying.
    ///
    /// On failure the temporary file is removed and any previous index is
    /// left exactly as it was.
    pub fn build(&self, records: &[PageRecord], info: &BuildInfo) -> Result<IndexHandle, IndexError> {
        fs::create_dir_all(&self.dir)?;

        let building = self.building_path();
        if building.exists() {
            log::warn!("removing stale partial build at {}", building.display());
            fs::remove_file(&building)?;
        }

        if let Err(e) = write_index(&building, records, info) {
            if let Err(cleanup) = fs::remove_file(&building) {
                log::debug!("could not remove {}: {}", building.display(), cleanup);
            }
            return Err(e);
        }

        fs::rename(&building, self.index_path())?;
        log::info!(
            "indexed {} pages into {}",
            records.len(),
            self.index_path().display()
        );

        IndexHandle::open(&self.dir)
    }
}

fn write_index(path: &Path, records: &[PageRecord], info: &BuildInfo) -> Result<(), IndexError> {
    let conn = Connection::open(path)?;
    conn.execute_batch(schema::CREATE_TABLES)?;

    let tx = conn.unchecked_transaction()?;
    {
        let fts_sql = format!(
            "INSERT INTO page_text (rowid, {}) VALUES (?1, {})",
            schema::FTS_COLUMNS.join(", "),
            (2..=schema::FTS_COLUMNS.len() + 1)
                .map(|i| format!("?{i}"))
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut insert_text = tx.prepare(&fts_sql)?;
        let mut insert_page = tx.prepare(
            "INSERT INTO pages (page_number, title, text_types, title_weight, heading1_weight,
                                heading2_weight, heading3_weight, body_weight, bold_weight)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;

        let weights = PageRecord::role_weights();
        let weight = |role: Role| weights.get(&role).copied().unwrap_or(0);

        for record in records {
            let page_number = record.page_number as i64;

            insert_page.execute(params![
                page_number,
                record.label(),
                record.text_types(),
                weight(Role::Title),
                weight(Role::Heading1),
                weight(Role::Heading2),
                weight(Role::Heading3),
                weight(Role::Body),
                weight(Role::Bold),
            ])?;

            let mut values: Vec<&str> = vec![record.full_text.as_str()];
            values.extend(Role::ALL.iter().map(|role| record.text_for(*role)));

            let mut bound: Vec<&dyn rusqlite::ToSql> = vec![&page_number];
            bound.extend(values.iter().map(|v| v as &dyn rusqlite::ToSql));
            insert_text.execute(bound.as_slice())?;
        }

        let mut insert_meta = tx.prepare("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")?;
        for (key, value) in [
            (schema::META_SCHEMA_VERSION, schema::SCHEMA_VERSION.to_string()),
            (schema::META_SOURCE_PATH, info.source_path.clone()),
            (schema::META_SOURCE_SHA256, info.source_sha256.clone()),
            (schema::META_STRATEGY, info.strategy.to_string()),
            (schema::META_PAGE_COUNT, records.len().to_string()),
            (schema::META_BUILT_AT, info.built_at.to_rfc3339()),
        ] {
            insert_meta.execute(params![key, value])?;
        }
    }
    tx.commit()?;

    conn.close().map_err(|(_, e)| IndexError::Sqlite(e))?;
    Ok(())
}
