//! Offline export of the content-addressed page store
//!
//! Writes every stored page to its own file so the crawl can be inspected
//! without redb. Files are named after the entry key, which is the hex
//! SHA-256 of the page's canonical URL.

use crate::storage::{KvStorage, StorageResult};
use std::fs;
use std::path::Path;

/// Writes each KV entry to `<dir>/<key>.html`, decompressed
///
/// # Arguments
///
/// * `store` - The KV store to read
/// * `dir` - Output directory, created if missing
///
/// # Returns
///
/// * `Ok(u64)` - Number of files written
/// * `Err(StorageError)` - A read, decompression or write failed
pub fn export_pages(store: &KvStorage, dir: &Path) -> StorageResult<u64> {
    fs::create_dir_all(dir)?;

    store.for_each_page(|key, content| {
        fs::write(dir.join(format!("{}.html", key)), content)?;
        Ok(())
    })
}
