//! SQLite storage implementation
//!
//! This module provides the relational page store. All access goes through
//! one connection behind a mutex, which doubles as the write lock that
//! serializes upserts from concurrent workers.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PageRecord, PageSink, StorageError, StorageResult};
use crate::storage::{PageStats, PageSummary, StoredPage};
use async_trait::async_trait;
use chrono::SecondsFormat;
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite storage backend
///
/// Cloning is cheap and every clone shares the same connection.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Opens or creates the database file and initializes the schema
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        register_functions(&conn)?;
        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        register_functions(&conn)?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    ) -> StorageResult<T> {
        let conn = self.conn.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(f(&conn)?)
    }

    /// Inserts a page, or overwrites the stored fields of an existing URL
    ///
    /// The row id assigned on first insert is never changed.
    pub fn upsert(&self, record: &PageRecord) -> StorageResult<()> {
        let crawled_at = record
            .fetched_at
            .to_rfc3339_opts(SecondsFormat::Micros, true);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO crawled_pages
                 (url, html_content, content_hash, status_code, title, links_count, crawled_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(url) DO UPDATE SET
                     html_content = excluded.html_content,
                     content_hash = excluded.content_hash,
                     status_code = excluded.status_code,
                     title = excluded.title,
                     links_count = excluded.links_count,
                     crawled_at = excluded.crawled_at",
                params![
                    record.url,
                    record.content,
                    record.content_digest,
                    record.status_code,
                    record.title,
                    record.links_count,
                    crawled_at,
                ],
            )
        })?;

        Ok(())
    }

    /// Gets a stored page by its exact URL
    pub fn get_page_by_url(&self, url: &str) -> StorageResult<Option<StoredPage>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, url, html_content, content_hash, status_code, title, links_count, crawled_at
                 FROM crawled_pages WHERE url = ?1",
                params![url],
                |row| {
                    Ok(StoredPage {
                        id: row.get(0)?,
                        url: row.get(1)?,
                        content: row.get(2)?,
                        content_hash: row.get(3)?,
                        status_code: row.get(4)?,
                        title: row.get(5)?,
                        links_count: row.get(6)?,
                        crawled_at: row.get(7)?,
                    })
                },
            )
            .optional()
        })
    }

    /// Lists every stored page, most recently crawled first
    pub fn list_pages(&self) -> StorageResult<Vec<PageSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, url, title, links_count, crawled_at
                 FROM crawled_pages ORDER BY crawled_at DESC, id DESC",
            )?;

            let pages = stmt
                .query_map([], summary_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(pages)
        })
    }

    /// Lists pages whose URL or title contains `term`, ignoring case
    ///
    /// Both sides are lowercased with full Unicode folding, and the term is
    /// matched literally.
    pub fn search_pages(&self, term: &str) -> StorageResult<Vec<PageSummary>> {
        let needle = term.to_lowercase();

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, url, title, links_count, crawled_at
                 FROM crawled_pages
                 WHERE instr(fold_case(url), ?1) > 0 OR instr(fold_case(title), ?1) > 0
                 ORDER BY crawled_at DESC, id DESC",
            )?;

            let pages = stmt
                .query_map(params![needle], summary_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(pages)
        })
    }

    /// Aggregate page and link counts
    pub fn page_stats(&self) -> StorageResult<PageStats> {
        let (total_pages, total_links): (i64, i64) = self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*), COALESCE(SUM(links_count), 0) FROM crawled_pages",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
        })?;

        Ok(PageStats::new(total_pages as u64, total_links as u64))
    }

    /// Page counts per HTTP status code, ascending by code
    pub fn status_counts(&self) -> StorageResult<Vec<(u16, u64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT status_code, COUNT(*) FROM crawled_pages
                 GROUP BY status_code ORDER BY status_code",
            )?;

            let counts = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? as u64)))?
                .collect::<Result<Vec<_>, _>>()?;

            Ok(counts)
        })
    }
}

fn summary_from_row(row: &Row<'_>) -> Result<PageSummary, rusqlite::Error> {
    Ok(PageSummary {
        id: row.get(0)?,
        url: row.get(1)?,
        title: row.get(2)?,
        links_count: row.get(3)?,
        crawled_at: row.get(4)?,
    })
}

/// Registers `fold_case(text)`, the Unicode lowercase used by search
fn register_functions(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.create_scalar_function(
        "fold_case",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let text = ctx.get::<Option<String>>(0)?;
            Ok(text.map(|t| t.to_lowercase()))
        },
    )
}

#[async_trait]
impl PageSink for SqliteStorage {
    async fn put(&self, record: &PageRecord) -> StorageResult<()> {
        let storage = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || storage.upsert(&record)).await?
    }

    async fn get_content(&self, url: &str) -> StorageResult<Option<Vec<u8>>> {
        let storage = self.clone();
        let url = url.to_string();
        let page = tokio::task::spawn_blocking(move || storage.get_page_by_url(&url)).await??;
        Ok(page.map(|p| p.content))
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
