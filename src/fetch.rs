//! Item fetcher: raw bytes for one media URL.
//!
//! One GET per item, no retries. Anything other than a 2xx response is a
//! failure for that item only. [`HttpFetcher`] wraps a single blocking
//! `reqwest` client that all pool workers share; the client keeps its own
//! connection pool and is `Sync`.

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("bad status {status} for {url}")]
    Status { status: u16, url: String },
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Source of raw media bytes.
pub trait Fetcher: Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Settings for the HTTP client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// Whole-request deadline, connect through body.
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: concat!("media-variants/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Blocking HTTP fetcher.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(options.timeout)
            .user_agent(options.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes()?.to_vec())
    }
}
