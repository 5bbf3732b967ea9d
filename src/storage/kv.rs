//! Content-addressed page store backed by redb
//!
//! Keys are the hex SHA-256 of the canonical URL; values are the gzip
//! compressed page bytes. There is no history: the last put for a key wins.

use crate::storage::compress::{compress, decompress};
use crate::storage::traits::{PageRecord, PageSink, StorageResult};
use crate::url::url_digest;
use async_trait::async_trait;
use redb::{Database, ReadableTable, ReadableTableMetadata, TableDefinition};
use std::path::Path;
use std::sync::Arc;

const PAGES: TableDefinition<&str, &[u8]> = TableDefinition::new("pages");

#[derive(Clone)]
pub struct KvStorage {
    db: Arc<Database>,
}

impl KvStorage {
    /// Opens or creates the store, making sure the pages table exists
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _pages = write_txn.open_table(PAGES)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Stores the compressed content under the URL's digest
    pub fn put_blocking(&self, url: &str, content: &[u8]) -> StorageResult<()> {
        let key = url_digest(url);
        let value = compress(content)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(PAGES)?;
            table.insert(key.as_str(), value.as_slice())?;
        }
        write_txn.commit()?;

        Ok(())
    }

    /// Reads and decompresses the content stored for a URL
    pub fn get_blocking(&self, url: &str) -> StorageResult<Option<Vec<u8>>> {
        self.get_by_key(&url_digest(url))
    }

    /// Reads and decompresses the value under a raw hex key
    pub fn get_by_key(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAGES)?;

        let packed = match table.get(key)? {
            Some(guard) => guard.value().to_vec(),
            None => return Ok(None),
        };

        Ok(Some(decompress(&packed)?))
    }

    /// Visits every entry as `(hex key, decompressed content)` in key order
    ///
    /// Returns the number of entries visited.
    pub fn for_each_page(
        &self,
        mut visit: impl FnMut(&str, Vec<u8>) -> StorageResult<()>,
    ) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAGES)?;
        let mut visited = 0;

        for entry in table.iter()? {
            let (key, value) = entry?;
            visit(key.value(), decompress(value.value())?)?;
            visited += 1;
        }

        Ok(visited)
    }

    pub fn len(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(PAGES)?;
        Ok(table.len()?)
    }

    pub fn is_empty(&self) -> StorageResult<bool> {
        Ok(self.len()? == 0)
    }
}

#[async_trait]
impl PageSink for KvStorage {
    async fn put(&self, record: &PageRecord) -> StorageResult<()> {
        let store = self.clone();
        let url = record.url.clone();
        let content = record.content.clone();
        tokio::task::spawn_blocking(move || store.put_blocking(&url, &content)).await?
    }

    async fn get_content(&self, url: &str) -> StorageResult<Option<Vec<u8>>> {
        let store = self.clone();
        let url = url.to_string();
        tokio::task::spawn_blocking(move || store.get_blocking(&url)).await?
    }

    fn backend_name(&self) -> &'static str {
        "kv"
    }
}
