//! URL handling module for Driftnet
//!
//! This module provides link normalization, host extraction, and the scope
//! rules that decide which hosts the crawl may enter.

mod domain;
mod matcher;
mod normalize;

use crate::config::Config;
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

// Re-export main functions
pub use domain::extract_domain;
pub use matcher::matches_domain;
pub use normalize::normalize;

/// A normalized absolute URL; the sole key for dedup and storage
///
/// Values are only produced by [`normalize`], and normalizing a canonical
/// URL against any base yields the same value again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Hex SHA-256 of the URL string: the dedup key and the KV store key
    pub fn digest(&self) -> String {
        url_digest(&self.0)
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hex-encoded SHA-256 of a URL string
pub fn url_digest(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// The set of hosts a crawl may enter, plus the query-string policy
///
/// A host is in scope when it equals the host of a seed URL, or when it
/// equals or is a subdomain of one of the allowed domains.
#[derive(Debug, Clone)]
pub struct Scope {
    seed_hosts: Vec<String>,
    allowed_domains: Vec<String>,
    strip_query: bool,
}

impl Scope {
    pub fn new(seed_hosts: Vec<String>, allowed_domains: Vec<String>, strip_query: bool) -> Self {
        let lower = |v: Vec<String>| {
            v.into_iter()
                .map(|d| d.trim_end_matches('.').to_ascii_lowercase())
                .collect::<Vec<_>>()
        };

        Self {
            seed_hosts: lower(seed_hosts),
            allowed_domains: lower(allowed_domains),
            strip_query,
        }
    }

    /// Builds the scope from the seed list and allowed domains
    ///
    /// Seeds that fail to parse contribute no host; configuration
    /// validation rejects them before a crawl starts.
    pub fn from_config(config: &Config) -> Self {
        let seed_hosts = config
            .scope
            .seeds
            .iter()
            .filter_map(|seed| Url::parse(seed).ok())
            .filter_map(|url| extract_domain(&url))
            .collect();

        Self::new(
            seed_hosts,
            config.scope.allowed_domains.clone(),
            config.crawler.strip_query,
        )
    }

    /// Returns true if the (lowercase) host may be crawled
    pub fn contains_host(&self, host: &str) -> bool {
        self.seed_hosts.iter().any(|seed| seed == host)
            || self
                .allowed_domains
                .iter()
                .any(|domain| matches_domain(domain, host))
    }

    pub fn strip_query(&self) -> bool {
        self.strip_query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_host_is_exact() {
        let scope = Scope::new(vec!["en.wikipedia.org".to_string()], vec![], true);

        assert!(scope.contains_host("en.wikipedia.org"));
        assert!(!scope.contains_host("de.wikipedia.org"));
        assert!(!scope.contains_host("wikipedia.org"));
    }

    #[test]
    fn test_allowed_domain_covers_subdomains() {
        let scope = Scope::new(vec![], vec!["wikipedia.org".to_string()], true);

        assert!(scope.contains_host("wikipedia.org"));
        assert!(scope.contains_host("en.wikipedia.org"));
        assert!(scope.contains_host("en.m.wikipedia.org"));
    }

    #[test]
    fn test_substring_hosts_rejected() {
        let scope = Scope::new(
            vec!["example.com".to_string()],
            vec!["example.com".to_string()],
            true,
        );

        assert!(!scope.contains_host("example.com.evil.tld"));
        assert!(!scope.contains_host("notexample.com"));
        assert!(!scope.contains_host("evil-example.com"));
    }

    #[test]
    fn test_scope_entries_are_case_folded() {
        let scope = Scope::new(
            vec!["Example.ORG".to_string()],
            vec!["Wikipedia.org.".to_string()],
            true,
        );

        assert!(scope.contains_host("example.org"));
        assert!(scope.contains_host("en.wikipedia.org"));
    }

    #[test]
    fn test_url_digest() {
        let digest = url_digest("https://example.org/a");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(digest, url_digest("https://example.org/b"));
    }
}
