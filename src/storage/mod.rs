//! Storage module for persisting fetched pages
//!
//! This module handles everything the crawler writes, including:
//! - The `PageSink` capability the worker pool writes through
//! - The relational SQLite backend and its read queries
//! - The content-addressed redb backend with gzip-compressed values

mod compress;
mod kv;
mod schema;
mod sqlite;
mod traits;

pub use compress::{compress, decompress};
pub use kv::KvStorage;
pub use sqlite::SqliteStorage;
pub use traits::{PageRecord, PageSink, StorageError, StorageResult};

use crate::config::{StorageBackend, StorageConfig};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Opens the backend selected by configuration
///
/// # Returns
///
/// * `Ok(Arc<dyn PageSink>)` - The opened backend
/// * `Err(StorageError)` - The database file could not be opened
pub fn open_sink(config: &StorageConfig) -> StorageResult<Arc<dyn PageSink>> {
    let sink: Arc<dyn PageSink> = match config.backend {
        StorageBackend::Sqlite => Arc::new(SqliteStorage::open(Path::new(&config.database_path))?),
        StorageBackend::Kv => Arc::new(KvStorage::open(Path::new(&config.kv_path))?),
    };
    Ok(sink)
}

/// A row of the relational store
#[derive(Debug, Clone)]
pub struct StoredPage {
    pub id: i64,
    pub url: String,
    pub content: Vec<u8>,
    pub content_hash: String,
    pub status_code: u16,
    pub title: Option<String>,
    pub links_count: u32,
    pub crawled_at: String,
}

/// A page listing entry, as returned by the read API
#[derive(Debug, Clone, Serialize)]
pub struct PageSummary {
    pub id: i64,
    pub url: String,
    pub title: Option<String>,
    pub links_count: u32,
    pub crawled_at: String,
}

/// Aggregate counts over the relational store
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageStats {
    pub total_pages: u64,
    pub total_links: u64,
    pub avg_links: f64,
}

impl PageStats {
    pub fn new(total_pages: u64, total_links: u64) -> Self {
        let avg_links = if total_pages == 0 {
            0.0
        } else {
            total_links as f64 / total_pages as f64
        };

        Self {
            total_pages,
            total_links,
            avg_links,
        }
    }
}
