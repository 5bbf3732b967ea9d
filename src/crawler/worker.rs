//! Worker loop and the run-scoped context it shares
//!
//! Each worker repeats: dequeue, wait the politeness delay, fetch, extract,
//! store, then admit newly seen links to the frontier. Workers keep no state
//! between tasks; everything shared lives in [`CrawlContext`].

use crate::crawler::fetcher::{fetch_page, FetchError};
use crate::crawler::frontier::{CrawlTask, Frontier, FrontierError};
use crate::crawler::parser::parse_html;
use crate::crawler::shutdown::until_cancelled;
use crate::dedup::DedupFilter;
use crate::storage::{PageRecord, PageSink};
use crate::url::{normalize, Scope};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Everything a worker needs, built once per run by the coordinator
pub struct CrawlContext {
    pub client: Client,
    pub frontier: Arc<Frontier>,
    pub dedup: Arc<dyn DedupFilter>,
    pub sink: Arc<dyn PageSink>,
    pub scope: Scope,
    pub politeness: Duration,
    pub cancel: CancellationToken,
    pub stats: CrawlStats,
}

/// Run counters, updated by every worker
#[derive(Debug, Default)]
pub struct CrawlStats {
    pages_fetched: AtomicU64,
    fetch_failures: AtomicU64,
    store_failures: AtomicU64,
    duplicates: AtomicU64,
    dedup_errors: AtomicU64,
    links_enqueued: AtomicU64,
    links_dropped: AtomicU64,
}

impl CrawlStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pages_fetched(&self) -> u64 {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    pub fn fetch_failures(&self) -> u64 {
        self.fetch_failures.load(Ordering::Relaxed)
    }

    pub fn store_failures(&self) -> u64 {
        self.store_failures.load(Ordering::Relaxed)
    }

    /// Links skipped because the filter had already seen them
    pub fn duplicates(&self) -> u64 {
        self.duplicates.load(Ordering::Relaxed)
    }

    /// Filter calls that failed and were treated as "already seen"
    pub fn dedup_errors(&self) -> u64 {
        self.dedup_errors.load(Ordering::Relaxed)
    }

    pub fn links_enqueued(&self) -> u64 {
        self.links_enqueued.load(Ordering::Relaxed)
    }

    /// Newly seen links lost to a full or closed frontier
    pub fn links_dropped(&self) -> u64 {
        self.links_dropped.load(Ordering::Relaxed)
    }
}

/// Pulls tasks until the frontier is closed and drained or the run is cancelled
pub async fn run_worker(id: usize, ctx: Arc<CrawlContext>) {
    debug!(worker = id, "Worker started");

    while let Some(task) = ctx.frontier.dequeue(&ctx.cancel).await {
        process_task(id, &ctx, &task).await;
        ctx.frontier.task_done();
    }

    debug!(worker = id, "Worker stopped");
}

async fn process_task(id: usize, ctx: &CrawlContext, task: &CrawlTask) {
    let url = task.url().as_str();

    if until_cancelled(&ctx.cancel, tokio::time::sleep(ctx.politeness))
        .await
        .is_none()
    {
        return;
    }

    let page = match fetch_page(&ctx.client, url, &ctx.cancel).await {
        Ok(page) => page,
        Err(FetchError::Cancelled) => return,
        Err(e) => {
            CrawlStats::bump(&ctx.stats.fetch_failures);
            warn!(worker = id, "Dropping {}: {}", url, e);
            return;
        }
    };
    CrawlStats::bump(&ctx.stats.pages_fetched);

    let parsed = parse_html(&page.body, &page.final_url);
    let record = PageRecord::new(
        url,
        page.body,
        page.status,
        parsed.title.clone(),
        parsed.link_count(),
    );

    match until_cancelled(&ctx.cancel, ctx.sink.put(&record)).await {
        None => return,
        Some(Ok(())) => debug!(worker = id, "Stored {} ({} links)", url, record.links_count),
        Some(Err(e)) => {
            CrawlStats::bump(&ctx.stats.store_failures);
            warn!(worker = id, "Failed to store {}: {}", url, e);
        }
    }

    for href in &parsed.links {
        if ctx.cancel.is_cancelled() {
            return;
        }
        admit_link(id, ctx, href, &page.final_url).await;
    }
}

/// Normalizes one href and enqueues it if the filter has not seen it
async fn admit_link(id: usize, ctx: &CrawlContext, href: &str, base: &Url) {
    let Some(canonical) = normalize(href, base, &ctx.scope) else {
        return;
    };

    let key = canonical.digest();
    let added = match until_cancelled(&ctx.cancel, ctx.dedup.add_if_absent(&key)).await {
        None => return,
        Some(Ok(added)) => added,
        Some(Err(e)) => {
            // An unanswered check counts as seen
            CrawlStats::bump(&ctx.stats.dedup_errors);
            warn!(worker = id, "Dedup check failed for {}, treating as seen: {}", canonical, e);
            return;
        }
    };

    if !added {
        CrawlStats::bump(&ctx.stats.duplicates);
        return;
    }

    match ctx.frontier.try_enqueue(CrawlTask::new(canonical)) {
        Ok(()) => CrawlStats::bump(&ctx.stats.links_enqueued),
        Err(e) => {
            CrawlStats::bump(&ctx.stats.links_dropped);
            let reason = match &e {
                FrontierError::QueueFull(_) => "full",
                FrontierError::Closed(_) => "closed",
            };
            let task = e.into_task();
            debug!(worker = id, "Frontier {}, dropping {}", reason, task.url());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserAgentConfig;
    use crate::crawler::fetcher::build_http_client;
    use crate::dedup::{DedupError, MemoryBloomFilter};
    use crate::storage::{SqliteStorage, StorageError, StorageResult};
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FailingDedup;

    #[async_trait]
    impl DedupFilter for FailingDedup {
        async fn exists(&self, _key: &str) -> Result<bool, DedupError> {
            Err(DedupError::LockPoisoned)
        }

        async fn add_if_absent(&self, _key: &str) -> Result<bool, DedupError> {
            Err(DedupError::LockPoisoned)
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    struct FailingSink;

    #[async_trait]
    impl PageSink for FailingSink {
        async fn put(&self, _record: &PageRecord) -> StorageResult<()> {
            Err(StorageError::Kv("disk full".to_string()))
        }

        async fn get_content(&self, _url: &str) -> StorageResult<Option<Vec<u8>>> {
            Ok(None)
        }

        fn backend_name(&self) -> &'static str {
            "failing"
        }
    }

    fn context(dedup: Arc<dyn DedupFilter>, sink: Arc<dyn PageSink>) -> Arc<CrawlContext> {
        let agent = UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        };

        Arc::new(CrawlContext {
            client: build_http_client(&agent, Duration::from_secs(5)).unwrap(),
            frontier: Arc::new(Frontier::new(100)),
            dedup,
            sink,
            scope: Scope::new(vec!["127.0.0.1".to_string()], vec![], true),
            politeness: Duration::ZERO,
            cancel: CancellationToken::new(),
            stats: CrawlStats::default(),
        })
    }

    fn seed(ctx: &CrawlContext, url: &str) -> CrawlTask {
        let base = Url::parse(url).unwrap();
        CrawlTask::new(normalize(url, &base, &ctx.scope).unwrap())
    }

    async fn mount_page(server: &MockServer, route: &str, body: &str) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(body),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_task_stores_page_and_enqueues_new_links() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            "/",
            r#"<html><head><title>Home</title></head><body>
                <a href="/a">a</a>
                <a href="/a#again">a again</a>
                <a href="/b/">b</a>
                <a href="https://elsewhere.org/">off-site</a>
            </body></html>"#,
        )
        .await;

        let storage = SqliteStorage::new_in_memory().unwrap();
        let ctx = context(
            Arc::new(MemoryBloomFilter::new(1_000, 0.001)),
            Arc::new(storage.clone()),
        );

        let root = format!("{}/", server.uri());
        process_task(0, &ctx, &seed(&ctx, &root)).await;

        let page = storage.get_page_by_url(&root).unwrap().unwrap();
        assert_eq!(page.title.as_deref(), Some("Home"));
        assert_eq!(page.links_count, 4);
        assert_eq!(page.status_code, 200);

        assert_eq!(ctx.stats.pages_fetched(), 1);
        assert_eq!(ctx.stats.links_enqueued(), 2);
        assert_eq!(ctx.stats.duplicates(), 1);
        assert_eq!(ctx.frontier.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_drops_task() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let storage = SqliteStorage::new_in_memory().unwrap();
        let ctx = context(
            Arc::new(MemoryBloomFilter::new(1_000, 0.001)),
            Arc::new(storage.clone()),
        );

        process_task(0, &ctx, &seed(&ctx, &format!("{}/broken", server.uri()))).await;

        assert_eq!(ctx.stats.fetch_failures(), 1);
        assert_eq!(ctx.stats.pages_fetched(), 0);
        assert_eq!(storage.page_stats().unwrap().total_pages, 0);
        assert!(ctx.frontier.is_empty());
    }

    #[tokio::test]
    async fn test_dedup_errors_count_as_seen() {
        let server = MockServer::start().await;
        mount_page(&server, "/", r#"<a href="/a">a</a><a href="/b">b</a>"#).await;

        let ctx = context(
            Arc::new(FailingDedup),
            Arc::new(SqliteStorage::new_in_memory().unwrap()),
        );

        process_task(0, &ctx, &seed(&ctx, &format!("{}/", server.uri()))).await;

        assert_eq!(ctx.stats.dedup_errors(), 2);
        assert_eq!(ctx.stats.links_enqueued(), 0);
        assert!(ctx.frontier.is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_is_not_fatal() {
        let server = MockServer::start().await;
        mount_page(&server, "/", r#"<a href="/next">next</a>"#).await;

        let ctx = context(
            Arc::new(MemoryBloomFilter::new(1_000, 0.001)),
            Arc::new(FailingSink),
        );

        process_task(0, &ctx, &seed(&ctx, &format!("{}/", server.uri()))).await;

        assert_eq!(ctx.stats.store_failures(), 1);
        assert_eq!(ctx.stats.links_enqueued(), 1);
    }

    #[tokio::test]
    async fn test_full_frontier_drops_links() {
        let server = MockServer::start().await;
        mount_page(&server, "/", r#"<a href="/1">1</a><a href="/2">2</a><a href="/3">3</a>"#)
            .await;

        let mut ctx = context(
            Arc::new(MemoryBloomFilter::new(1_000, 0.001)),
            Arc::new(SqliteStorage::new_in_memory().unwrap()),
        );
        Arc::get_mut(&mut ctx).unwrap().frontier = Arc::new(Frontier::new(1));

        process_task(0, &ctx, &seed(&ctx, &format!("{}/", server.uri()))).await;

        assert_eq!(ctx.stats.links_enqueued(), 1);
        assert_eq!(ctx.stats.links_dropped(), 2);
        assert_eq!(ctx.frontier.len(), 1);
    }

    #[tokio::test]
    async fn test_worker_exits_when_frontier_closes() {
        let ctx = context(
            Arc::new(MemoryBloomFilter::new(1_000, 0.001)),
            Arc::new(SqliteStorage::new_in_memory().unwrap()),
        );

        let handle = tokio::spawn(run_worker(0, Arc::clone(&ctx)));
        ctx.frontier.close();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
