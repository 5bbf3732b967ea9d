//! Driftnet: a concurrent, scoped web crawler
//!
//! This crate crawls a web graph from a set of seed URLs with a fixed pool of
//! workers, suppresses duplicate work through a probabilistic seen-set, and
//! persists every fetched page to a relational or content-addressed store.

pub mod api;
pub mod config;
pub mod crawler;
pub mod dedup;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Driftnet operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A backing service could not be reached at startup; the crawl does not start
    #[error("Cannot reach {service}: {message}")]
    Connectivity {
        service: &'static str,
        message: String,
    },

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Dedup error: {0}")]
    Dedup(#[from] dedup::DedupError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Invalid seed URL: {0}")]
    InvalidSeed(String),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Driftnet operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Coordinator};
pub use url::{normalize, CanonicalUrl, Scope};
