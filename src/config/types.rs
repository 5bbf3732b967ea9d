use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Driftnet
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub scope: ScopeConfig,
    pub dedup: DedupConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// Worker pool and fetch behavior
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of parallel workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum number of pending URLs held by the frontier
    #[serde(rename = "frontier-capacity", default = "default_frontier_capacity")]
    pub frontier_capacity: usize,

    /// Pause before every outbound request (milliseconds)
    #[serde(rename = "politeness-delay", default = "default_politeness_delay")]
    pub politeness_delay: u64,

    /// Per-request timeout (seconds)
    #[serde(rename = "fetch-timeout", default = "default_fetch_timeout")]
    pub fetch_timeout: u64,

    /// Drop query strings during normalization
    #[serde(rename = "strip-query", default = "default_strip_query")]
    pub strip_query: bool,
}

impl CrawlerConfig {
    pub fn politeness(&self) -> Duration {
        Duration::from_millis(self.politeness_delay)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            frontier_capacity: default_frontier_capacity(),
            politeness_delay: default_politeness_delay(),
            fetch_timeout: default_fetch_timeout(),
            strip_query: default_strip_query(),
        }
    }
}

fn default_workers() -> usize {
    8
}

fn default_frontier_capacity() -> usize {
    10_000
}

fn default_politeness_delay() -> u64 {
    800
}

fn default_fetch_timeout() -> u64 {
    30
}

fn default_strip_query() -> bool {
    true
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL; ContactEmail)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{}; {})",
            self.crawler_name, self.crawler_version, self.contact_url, self.contact_email
        )
    }
}

/// Seeds and the set of hosts the crawl may enter
#[derive(Debug, Clone, Deserialize)]
pub struct ScopeConfig {
    /// Initial URLs; their hosts are always in scope
    pub seeds: Vec<String>,

    /// Registrable domains whose hosts and subdomains are in scope
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupBackend {
    /// RedisBloom filter shared across restarts
    Redis,
    /// Process-local Bloom filter
    Memory,
}

/// Seen-set configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DedupConfig {
    pub backend: DedupBackend,

    #[serde(rename = "redis-url", default = "default_redis_url")]
    pub redis_url: String,

    /// Key naming this crawl's filter; the crawl identity
    #[serde(rename = "filter-key", default = "default_filter_key")]
    pub filter_key: String,

    /// Expected number of distinct URLs
    #[serde(default = "default_capacity")]
    pub capacity: u64,

    /// Target false-positive rate
    #[serde(rename = "error-rate", default = "default_error_rate")]
    pub error_rate: f64,
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_filter_key() -> String {
    "driftnet:seen".to_string()
}

fn default_capacity() -> u64 {
    100_000
}

fn default_error_rate() -> f64 {
    0.001
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite table keyed by canonical URL
    Sqlite,
    /// redb table keyed by URL digest, gzip-compressed values
    Kv,
}

/// Page sink configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default)]
    pub database_path: String,

    /// Path to the redb database file
    #[serde(rename = "kv-path", default)]
    pub kv_path: String,
}

/// Read API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}
