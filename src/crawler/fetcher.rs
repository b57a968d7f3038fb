//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the harvester:
//! - Building the HTTP client from the configured user agent and timeout
//! - Deriving page URLs and Referer headers from listing offsets
//! - Issuing one GET per listing page
//! - Classifying failures into `FetchError`
//!
//! No retry is performed here. A failed page is reported to the pipeline,
//! which skips it for the rest of the run.

use crate::config::HttpConfig;
use crate::{ConfigError, FetchError, HarvestError};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, REFERER};
use reqwest::Client;
use std::time::Duration;

/// One listing page to retrieve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Offset of the first posting on the page
    pub offset: u64,

    /// Fully built page URL
    pub url: String,

    /// URL of the page immediately before this one, absent for offset 0
    pub referer: Option<String>,
}

impl PageRequest {
    /// Builds the request for the listing slice starting at `offset`
    pub fn new(base_url: &str, page_size: u32, offset: u64) -> Self {
        let referer = if offset == 0 {
            None
        } else {
            Some(page_url(
                base_url,
                offset.saturating_sub(u64::from(page_size)),
            ))
        };

        Self {
            offset,
            url: page_url(base_url, offset),
            referer,
        }
    }

    /// Builds the request for the zero-based page `index`
    pub fn for_page(base_url: &str, page_size: u32, index: u32) -> Self {
        Self::new(base_url, page_size, page_offset(index, page_size))
    }

    /// Returns the header set for this request
    ///
    /// The base headers are copied, never mutated, so no Referer leaks from
    /// one request into the next.
    pub fn headers(&self, base: &HeaderMap) -> HeaderMap {
        let mut headers = base.clone();
        if let Some(referer) = &self.referer {
            // base_url is validated as header-safe, and offsets are ASCII digits
            if let Ok(value) = HeaderValue::from_str(referer) {
                headers.insert(REFERER, value);
            }
        }
        headers
    }
}

/// Computes the listing offset for a zero-based page index
pub fn page_offset(index: u32, page_size: u32) -> u64 {
    u64::from(index) * u64::from(page_size)
}

/// Appends the offset to the base listing URL
pub fn page_url(base_url: &str, offset: u64) -> String {
    format!("{}{}", base_url, offset)
}

/// Builds an HTTP client with the configured user agent and timeout
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    let timeout = config.timeout();

    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Converts the configured extra headers into a `HeaderMap`
pub fn build_base_headers(config: &HttpConfig) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ConfigError::InvalidHeader(format!("'{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ConfigError::InvalidHeader(format!("value of '{}': {}", name, e)))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Page fetcher holding the shared client for the lifetime of a run
pub struct Fetcher {
    client: Client,
    base_headers: HeaderMap,
    base_url: String,
    page_size: u32,
}

impl Fetcher {
    /// Creates a fetcher from HTTP configuration
    pub fn new(config: &HttpConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(config)?,
            base_headers: build_base_headers(config)?,
            base_url: config.base_url.clone(),
            page_size: config.page_size,
        })
    }

    /// Builds the request for the listing slice starting at `offset`
    pub fn request_for(&self, offset: u64) -> PageRequest {
        PageRequest::new(&self.base_url, self.page_size, offset)
    }

    /// Fetches the listing page starting at `offset`
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The page body, trimmed of surrounding whitespace
    /// * `Err(FetchError)` - Transport failure, timeout, or non-2xx status
    pub async fn fetch(&self, offset: u64) -> Result<String, FetchError> {
        let request = self.request_for(offset);
        self.fetch_request(&request).await
    }

    /// Fetches a prepared page request
    pub async fn fetch_request(&self, request: &PageRequest) -> Result<String, FetchError> {
        tracing::debug!(
            url = %request.url,
            referer = request.referer.as_deref().unwrap_or("-"),
            "GET listing page"
        );

        let response = self
            .client
            .get(&request.url)
            .headers(request.headers(&self.base_headers))
            .send()
            .await
            .map_err(|e| classify_error(&request.url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| classify_error(&request.url, e))?;

        Ok(body.trim().to_string())
    }
}

/// Maps a reqwest error onto the fetch error taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else {
        FetchError::Transport {
            url: url.to_string(),
            source: error,
        }
    }
}
