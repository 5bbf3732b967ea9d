//! Output module for reporting on stored crawl results
//!
//! The crawl pipeline never reads the stores; everything here is for the CLI.

pub mod export;
pub mod stats;

pub use export::export_pages;
pub use stats::{load_statistics, print_statistics, CrawlStatistics};
