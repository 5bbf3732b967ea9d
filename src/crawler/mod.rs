//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching bounded by a per-request timeout
//! - HTML parsing, link extraction and page analysis
//! - The bounded frontier and the worker loop that drains it
//! - Run-wide cancellation and overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod shutdown;
mod worker;

pub use coordinator::{Coordinator, CrawlReport};
pub use fetcher::{build_http_client, fetch_page, FetchError, FetchedPage};
pub use frontier::{CrawlTask, Frontier, FrontierError};
pub use parser::{parse_html, ParsedPage};
pub use shutdown::{until_cancelled, ShutdownController};
pub use worker::{run_worker, CrawlContext, CrawlStats};

use crate::config::Config;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Connect to the dedup filter and open the page sink
/// 2. Install the Ctrl+C handler
/// 3. Seed the frontier and run the worker pool until it drains or is stopped
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Whether to discard the existing dedup filter first
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Every worker has returned
/// * `Err(CrawlError)` - A backend was unreachable or a seed was invalid
pub async fn crawl(config: &Config, fresh: bool) -> crate::Result<CrawlReport> {
    let coordinator = Coordinator::new(config, fresh).await?;
    let shutdown = coordinator.shutdown_controller();
    let listener = shutdown.listen_for_interrupt();

    let report = coordinator.run().await;
    listener.abort();

    report
}
