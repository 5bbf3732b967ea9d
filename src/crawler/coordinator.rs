//! Crawler coordinator - main crawl orchestration logic
//!
//! This module owns one crawl run from start to finish:
//! - Opening the dedup filter and page sink (fatal if unreachable)
//! - Building the run-scoped context shared by every worker
//! - Seeding the frontier through the dedup filter
//! - Spawning the worker pool and joining every worker
//! - Reporting the run exactly once

use crate::config::Config;
use crate::crawler::fetcher::build_http_client;
use crate::crawler::frontier::{CrawlTask, Frontier};
use crate::crawler::shutdown::{until_cancelled, ShutdownController};
use crate::crawler::worker::{run_worker, CrawlContext, CrawlStats};
use crate::dedup::{open_filter, DedupFilter};
use crate::storage::{open_sink, PageSink};
use crate::url::{normalize, Scope};
use crate::{CrawlError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Summary of one finished run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlReport {
    pub seeds_enqueued: usize,
    pub pages_fetched: u64,
    pub fetch_failures: u64,
    pub store_failures: u64,
    pub duplicates: u64,
    pub dedup_errors: u64,
    pub links_enqueued: u64,
    pub links_dropped: u64,
    pub elapsed: Duration,
    /// True when the run ended on a shutdown signal rather than by draining
    pub cancelled: bool,
}

impl CrawlReport {
    fn from_stats(stats: &CrawlStats, seeds_enqueued: usize, elapsed: Duration, cancelled: bool) -> Self {
        Self {
            seeds_enqueued,
            pages_fetched: stats.pages_fetched(),
            fetch_failures: stats.fetch_failures(),
            store_failures: stats.store_failures(),
            duplicates: stats.duplicates(),
            dedup_errors: stats.dedup_errors(),
            links_enqueued: stats.links_enqueued(),
            links_dropped: stats.links_dropped(),
            elapsed,
            cancelled,
        }
    }
}

impl fmt::Display for CrawlReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Crawl {} after {:.1}s",
            if self.cancelled { "cancelled" } else { "finished" },
            self.elapsed.as_secs_f64()
        )?;
        writeln!(f, "  Seeds enqueued:   {}", self.seeds_enqueued)?;
        writeln!(f, "  Pages fetched:    {}", self.pages_fetched)?;
        writeln!(f, "  Fetch failures:   {}", self.fetch_failures)?;
        writeln!(f, "  Store failures:   {}", self.store_failures)?;
        writeln!(f, "  Duplicate links:  {}", self.duplicates)?;
        writeln!(f, "  Dedup errors:     {}", self.dedup_errors)?;
        writeln!(f, "  Links enqueued:   {}", self.links_enqueued)?;
        write!(f, "  Links dropped:    {}", self.links_dropped)
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    ctx: Arc<CrawlContext>,
    seeds: Vec<String>,
    workers: usize,
    shutdown: ShutdownController,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Connects to the configured dedup filter and opens the page sink. A
    /// backend that cannot be reached is a connectivity error and the crawl
    /// does not start.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fresh` - Whether to discard the existing dedup filter
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - Failed to initialize
    pub async fn new(config: &Config, fresh: bool) -> Result<Self> {
        let dedup = open_filter(&config.dedup, fresh)
            .await
            .map_err(|e| CrawlError::Connectivity {
                service: "dedup filter",
                message: e.to_string(),
            })?;

        let sink = open_sink(&config.storage).map_err(|e| CrawlError::Connectivity {
            service: "page store",
            message: e.to_string(),
        })?;

        tracing::info!(
            "Using {} dedup filter and {} page store",
            dedup.backend_name(),
            sink.backend_name()
        );

        Self::with_backends(config, dedup, sink)
    }

    /// Creates a coordinator over already-opened backends
    pub fn with_backends(
        config: &Config,
        dedup: Arc<dyn DedupFilter>,
        sink: Arc<dyn PageSink>,
    ) -> Result<Self> {
        let client = build_http_client(&config.user_agent, config.crawler.timeout())?;
        let frontier = Arc::new(Frontier::new(config.crawler.frontier_capacity));
        let cancel = CancellationToken::new();
        let shutdown = ShutdownController::new(cancel.clone(), Arc::clone(&frontier));

        let ctx = Arc::new(CrawlContext {
            client,
            frontier,
            dedup,
            sink,
            scope: Scope::from_config(config),
            politeness: config.crawler.politeness(),
            cancel,
            stats: CrawlStats::default(),
        });

        Ok(Self {
            ctx,
            seeds: config.scope.seeds.clone(),
            workers: config.crawler.workers,
            shutdown,
        })
    }

    /// Handle for stopping this run from outside
    pub fn shutdown_controller(&self) -> ShutdownController {
        self.shutdown.clone()
    }

    /// Admits the seeds exactly like discovered links
    ///
    /// Seeds the filter has already seen are skipped, so a restart against a
    /// reused filter does not refetch them. A shutdown while the filter is
    /// answering stops seeding. Returns the number enqueued.
    async fn seed(&self) -> Result<usize> {
        let mut enqueued = 0;

        for seed in &self.seeds {
            let base = Url::parse(seed)
                .map_err(|e| CrawlError::InvalidSeed(format!("{}: {}", seed, e)))?;
            let canonical = normalize(seed, &base, &self.ctx.scope)
                .ok_or_else(|| CrawlError::InvalidSeed(seed.clone()))?;

            let key = canonical.digest();
            match until_cancelled(&self.ctx.cancel, self.ctx.dedup.add_if_absent(&key)).await {
                None => {
                    tracing::info!("Shutdown requested while seeding");
                    break;
                }
                Some(Ok(true)) => {}
                Some(Ok(false)) => {
                    tracing::info!("Seed {} was already crawled, skipping", canonical);
                    continue;
                }
                Some(Err(e)) => {
                    tracing::warn!("Dedup check failed for seed {}, skipping: {}", canonical, e);
                    continue;
                }
            }

            match self.ctx.frontier.try_enqueue(CrawlTask::new(canonical)) {
                Ok(()) => enqueued += 1,
                Err(e) => tracing::warn!("Could not enqueue seed {}: {}", seed, e),
            }
        }

        Ok(enqueued)
    }

    /// Runs the crawl until the frontier drains or shutdown is triggered
    ///
    /// Waits for every worker to return before reporting.
    pub async fn run(self) -> Result<CrawlReport> {
        let started = Instant::now();
        let seeds_enqueued = self.seed().await?;

        if self.shutdown.is_triggered() {
            tracing::info!("Shutdown requested before any worker started");
        } else if self.ctx.frontier.close_if_idle() {
            tracing::info!("Nothing to crawl: every seed has been seen before");
        } else {
            tracing::info!(
                "Starting {} workers with {} seeds",
                self.workers,
                seeds_enqueued
            );
        }

        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            workers.spawn(run_worker(id, Arc::clone(&self.ctx)));
        }

        while let Some(joined) = workers.join_next().await {
            if let Err(e) = joined {
                // A lost worker leaves its task in flight forever
                tracing::error!("Worker failed: {}", e);
                self.shutdown.trigger();
            }
        }

        let report = CrawlReport::from_stats(
            &self.ctx.stats,
            seeds_enqueued,
            started.elapsed(),
            self.shutdown.is_triggered(),
        );

        tracing::info!(
            pages = report.pages_fetched,
            failures = report.fetch_failures,
            duplicates = report.duplicates,
            cancelled = report.cancelled,
            "Crawl complete in {:.1}s",
            report.elapsed.as_secs_f64()
        );

        Ok(report)
    }
}
