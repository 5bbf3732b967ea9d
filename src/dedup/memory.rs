//! Process-local Bloom filter
//!
//! Bits live in a `Vec<u64>` behind a mutex, so probing and setting a key is
//! one critical section. Bit positions come from two seeded hashes combined
//! by double hashing (`h1 + i * h2`).

use crate::dedup::{DedupError, DedupFilter};
use async_trait::async_trait;
use std::f64::consts::LN_2;
use std::sync::Mutex;

const BLOOM_HASH_SEEDS: [u64; 2] = [0x517c_c1b7_2722_0a95, 0x9e37_79b1_85eb_ca87];

pub struct MemoryBloomFilter {
    words: Mutex<Vec<u64>>,
    bit_count: u64,
    hashes: u64,
}

impl MemoryBloomFilter {
    /// Sizes the filter for `capacity` keys at the target false-positive rate
    pub fn new(capacity: u64, error_rate: f64) -> Self {
        let n = capacity.max(1) as f64;
        let p = error_rate.clamp(1e-9, 0.5);

        let bits = (-(n * p.ln()) / (LN_2 * LN_2)).ceil().max(64.0);
        let hashes = ((bits / n) * LN_2).round().clamp(1.0, 32.0) as u64;

        let words = (bits as u64).div_ceil(64);

        Self {
            words: Mutex::new(vec![0u64; words as usize]),
            bit_count: words * 64,
            hashes,
        }
    }

    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    pub fn hash_count(&self) -> u64 {
        self.hashes
    }

    fn positions(&self, data: &[u8]) -> impl Iterator<Item = u64> {
        let h1 = bloom_hash(data, BLOOM_HASH_SEEDS[0]);
        // Never a zero step
        let h2 = bloom_hash(data, BLOOM_HASH_SEEDS[1]) | 1;
        let bit_count = self.bit_count;

        (0..self.hashes).map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % bit_count)
    }

    /// Sets every bit for `data`, returning true if any bit was clear
    fn insert(&self, data: &[u8]) -> Result<bool, DedupError> {
        let mut words = self.words.lock().map_err(|_| DedupError::LockPoisoned)?;
        let mut inserted = false;

        for idx in self.positions(data) {
            let word = (idx / 64) as usize;
            let mask = 1u64 << (idx % 64);
            if words[word] & mask == 0 {
                inserted = true;
                words[word] |= mask;
            }
        }

        Ok(inserted)
    }

    fn contains(&self, data: &[u8]) -> Result<bool, DedupError> {
        let words = self.words.lock().map_err(|_| DedupError::LockPoisoned)?;
        Ok(self
            .positions(data)
            .all(|idx| words[(idx / 64) as usize] & (1u64 << (idx % 64)) != 0))
    }
}

#[async_trait]
impl DedupFilter for MemoryBloomFilter {
    async fn exists(&self, key: &str) -> Result<bool, DedupError> {
        self.contains(key.as_bytes())
    }

    async fn add_if_absent(&self, key: &str) -> Result<bool, DedupError> {
        self.insert(key.as_bytes())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

fn bloom_hash(data: &[u8], seed: u64) -> u64 {
    let mut hash = seed ^ data.len() as u64;
    for &byte in data {
        hash ^= (byte as u64).wrapping_mul(0x1000_0000_01b3);
        hash = hash.rotate_left(13).wrapping_mul(0xff51_afd7_ed55_8ccd);
    }
    hash ^ (hash >> 33)
}
