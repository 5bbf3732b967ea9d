//! Probabilistic seen-set for canonical URLs
//!
//! Keys are hex SHA-256 digests of canonical URLs. A filter never answers
//! "unseen" for a key it has admitted; it may occasionally answer "seen" for
//! a key it has not.

mod memory;
mod redis;

pub use self::memory::MemoryBloomFilter;
pub use self::redis::RedisBloomFilter;

use crate::config::{DedupBackend, DedupConfig};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DedupError {
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("Filter lock poisoned")]
    LockPoisoned,
}

#[async_trait]
pub trait DedupFilter: Send + Sync {
    /// Returns true if the key may have been added before
    async fn exists(&self, key: &str) -> Result<bool, DedupError>;

    /// Adds the key, returning true only if this call newly added it
    ///
    /// Check and set happen in one step, so concurrent callers racing on
    /// the same key see exactly one `true`.
    async fn add_if_absent(&self, key: &str) -> Result<bool, DedupError>;

    /// Short backend name for log output
    fn backend_name(&self) -> &'static str;
}

/// Opens the filter selected by configuration
///
/// With `reset`, any existing Redis filter for this crawl is deleted and a
/// fresh one reserved; otherwise an existing filter is reused.
pub async fn open_filter(
    config: &DedupConfig,
    reset: bool,
) -> Result<Arc<dyn DedupFilter>, DedupError> {
    let filter: Arc<dyn DedupFilter> = match config.backend {
        DedupBackend::Redis => Arc::new(
            RedisBloomFilter::connect(
                &config.redis_url,
                &config.filter_key,
                config.capacity,
                config.error_rate,
                reset,
            )
            .await?,
        ),
        DedupBackend::Memory => Arc::new(MemoryBloomFilter::new(config.capacity, config.error_rate)),
    };
    Ok(filter)
}
