//! RedisBloom-backed seen-set
//!
//! The filter lives under one Redis key per crawl identity and survives
//! process restarts. `BF.ADD` is a single round trip that both checks and
//! sets, which is what makes admission exclusive across workers.

use crate::dedup::{DedupError, DedupFilter};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::Client;
use tracing::info;

#[derive(Clone)]
pub struct RedisBloomFilter {
    conn: ConnectionManager,
    key: String,
}

impl RedisBloomFilter {
    /// Connects and makes sure a filter exists under `key`
    ///
    /// An existing filter is reused unless `reset` is set, in which case it
    /// is deleted and reserved again with the given capacity and error rate.
    pub async fn connect(
        redis_url: &str,
        key: &str,
        capacity: u64,
        error_rate: f64,
        reset: bool,
    ) -> Result<Self, DedupError> {
        let client = Client::open(redis_url)?;
        let mut conn = ConnectionManager::new(client).await?;

        if reset {
            let _: i64 = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
            info!("Cleared dedup filter '{}'", key);
        }

        let exists: bool = redis::cmd("EXISTS").arg(key).query_async(&mut conn).await?;

        if exists {
            info!("Reusing dedup filter '{}'", key);
        } else {
            let _: () = redis::cmd("BF.RESERVE")
                .arg(key)
                .arg(error_rate)
                .arg(capacity)
                .query_async(&mut conn)
                .await?;
            info!(
                "Reserved dedup filter '{}' (capacity {}, error rate {})",
                key, capacity, error_rate
            );
        }

        Ok(Self {
            conn,
            key: key.to_string(),
        })
    }
}

#[async_trait]
impl DedupFilter for RedisBloomFilter {
    async fn exists(&self, key: &str) -> Result<bool, DedupError> {
        let mut conn = self.conn.clone();
        let seen: bool = redis::cmd("BF.EXISTS")
            .arg(&self.key)
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(seen)
    }

    async fn add_if_absent(&self, key: &str) -> Result<bool, DedupError> {
        let mut conn = self.conn.clone();
        let added: bool = redis::cmd("BF.ADD")
            .arg(&self.key)
            .arg(key)
            .query_async(&mut conn)
            .await?;
        Ok(added)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
