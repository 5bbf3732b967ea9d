//! Storage traits and error types
//!
//! This module defines the capability every storage backend provides to the
//! crawl pipeline, along with the record it persists and the associated
//! error types.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("KV store error: {0}")]
    Kv(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage write lock poisoned")]
    LockPoisoned,

    #[error("Blocking storage task failed: {0}")]
    Task(String),
}

impl From<redb::DatabaseError> for StorageError {
    fn from(e: redb::DatabaseError) -> Self {
        Self::Kv(e.to_string())
    }
}

impl From<redb::TransactionError> for StorageError {
    fn from(e: redb::TransactionError) -> Self {
        Self::Kv(e.to_string())
    }
}

impl From<redb::TableError> for StorageError {
    fn from(e: redb::TableError) -> Self {
        Self::Kv(e.to_string())
    }
}

impl From<redb::CommitError> for StorageError {
    fn from(e: redb::CommitError) -> Self {
        Self::Kv(e.to_string())
    }
}

impl From<redb::StorageError> for StorageError {
    fn from(e: redb::StorageError) -> Self {
        Self::Kv(e.to_string())
    }
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A fetched page, ready to be persisted
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub url: String,
    pub content: Vec<u8>,
    /// SHA-256 hex of `content`
    pub content_digest: String,
    pub status_code: u16,
    pub title: Option<String>,
    pub links_count: u32,
    pub fetched_at: DateTime<Utc>,
}

impl PageRecord {
    /// Builds a record stamped with the current time
    pub fn new(
        url: impl Into<String>,
        content: Vec<u8>,
        status_code: u16,
        title: Option<String>,
        links_count: u32,
    ) -> Self {
        let content_digest = hex::encode(Sha256::digest(&content));
        Self {
            url: url.into(),
            content,
            content_digest,
            status_code,
            title,
            links_count,
            fetched_at: Utc::now(),
        }
    }
}

/// The storage capability used by the crawl pipeline
///
/// Implementations must be safe to share between workers. Callers treat any
/// error from `put` as non-fatal: the page is lost, the crawl continues.
#[async_trait]
pub trait PageSink: Send + Sync {
    /// Persists a page; the last write for a URL wins
    async fn put(&self, record: &PageRecord) -> StorageResult<()>;

    /// Returns the raw content stored for a canonical URL, if any
    async fn get_content(&self, url: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Short backend name for log output
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_digest_is_of_content() {
        let record = PageRecord::new("https://example.org/", b"hello".to_vec(), 200, None, 0);
        assert_eq!(
            record.content_digest,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::Kv("table missing".to_string());
        assert_eq!(err.to_string(), "KV store error: table missing");
    }
}
