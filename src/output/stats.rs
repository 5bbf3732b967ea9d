//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! aggregate statistics from the relational page store.

use crate::storage::{SqliteStorage, StorageResult};

/// Crawl statistics summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// Total number of stored pages
    pub total_pages: u64,

    /// Sum of outbound link counts over all pages
    pub total_links: u64,

    /// Mean outbound links per page, 0.0 for an empty store
    pub avg_links: f64,

    /// Page counts per HTTP status code
    pub pages_by_status: Vec<(u16, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The relational store to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(storage: &SqliteStorage) -> StorageResult<CrawlStatistics> {
    let totals = storage.page_stats()?;
    let pages_by_status = storage.status_counts()?;

    Ok(CrawlStatistics {
        total_pages: totals.total_pages,
        total_links: totals.total_links,
        avg_links: totals.avg_links,
        pages_by_status,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Overview:");
    println!("  total_pages: {}", stats.total_pages);
    println!("  total_links: {}", stats.total_links);
    println!("  avg_links: {:.2}", stats.avg_links);
    println!();

    if !stats.pages_by_status.is_empty() {
        println!("Pages by Status:");
        for (status, count) in &stats.pages_by_status {
            let percentage = (*count as f64 / stats.total_pages.max(1) as f64) * 100.0;
            println!("  {}: {} ({:.1}%)", status, count, percentage);
        }
    }
}
