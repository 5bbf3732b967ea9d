//! Database schema definitions
//!
//! This module contains the SQL schema for the relational page store.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per canonical URL; the id is assigned on first insert and kept
CREATE TABLE IF NOT EXISTS crawled_pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    html_content BLOB NOT NULL,
    content_hash TEXT NOT NULL,
    status_code INTEGER NOT NULL,
    title TEXT,
    links_count INTEGER NOT NULL DEFAULT 0,
    crawled_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_crawled_pages_url ON crawled_pages(url);
CREATE INDEX IF NOT EXISTS idx_crawled_pages_hash ON crawled_pages(content_hash);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
