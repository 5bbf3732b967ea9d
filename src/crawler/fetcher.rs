//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client with the identifying user agent
//! - GET requests that observe the run's cancellation token
//! - Error classification into network and status failures
//!
//! Nothing here retries. A failed fetch is reported once and the caller
//! drops the task.

use crate::config::UserAgentConfig;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Largest response body kept for one page
pub const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Why a fetch produced no page
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport failure: DNS, connect, TLS, timeout, or a broken body
    #[error("Network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status
    #[error("HTTP {code} fetching {url}")]
    HttpStatus { url: String, code: u16 },

    /// The body is larger than the fetcher keeps
    #[error("Body of {url} exceeds {limit} bytes")]
    BodyTooLarge { url: String, limit: usize },

    /// The run was cancelled while the request was in flight
    #[error("Fetch cancelled")]
    Cancelled,
}

/// A successful GET
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the body was served from, after redirects
    pub final_url: Url,
    pub status: u16,
    pub body: Vec<u8>,
}

/// Builds an HTTP client with proper configuration
///
/// The client is shared by every worker and follows redirects with
/// reqwest's default policy.
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Whole-request timeout
///
/// # Example
///
/// ```no_run
/// use driftnet::config::UserAgentConfig;
/// use driftnet::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "driftnet".to_string(),
///     crawler_version: "0.1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues one GET for `url`
///
/// Returns as soon as `cancel` fires, abandoning the request. Bodies over
/// [`MAX_BODY_BYTES`] are rejected without being buffered in full.
pub async fn fetch_page(
    client: &Client,
    url: &str,
    cancel: &CancellationToken,
) -> Result<FetchedPage, FetchError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(FetchError::Cancelled),
        result = get(client, url, MAX_BODY_BYTES) => result,
    }
}

pub(crate) async fn get(
    client: &Client,
    url: &str,
    limit: usize,
) -> Result<FetchedPage, FetchError> {
    let network = |source| FetchError::Network {
        url: url.to_string(),
        source,
    };

    let too_large = || FetchError::BodyTooLarge {
        url: url.to_string(),
        limit,
    };

    let mut response = client.get(url).send().await.map_err(network)?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            code: status.as_u16(),
        });
    }

    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(too_large());
    }

    let final_url = response.url().clone();
    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await.map_err(network)? {
        if body.len() + chunk.len() > limit {
            return Err(too_large());
        }
        body.extend_from_slice(&chunk);
    }

    Ok(FetchedPage {
        final_url,
        status: status.as_u16(),
        body,
    })
}
