use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for Board-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub http: HttpConfig,
    pub crawler: CrawlerConfig,
    pub storage: StorageConfig,
}

/// HTTP request configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Listing URL up to and including the offset parameter, e.g. `...discussion?start=`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Number of postings per listing page; the offset step
    #[serde(rename = "page-size", default = "default_page_size")]
    pub page_size: u32,

    /// Per-request timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent sent with every request
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Extra headers sent with every request (cookies, Accept-Language, ...)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Crawl range and pacing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of listing pages fetched per run
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Pause between consecutive page requests (seconds)
    #[serde(rename = "wait-interval")]
    pub wait_interval: f64,
}

/// Longest accepted pause between page requests (seconds)
pub const MAX_WAIT_INTERVAL_SECS: f64 = 3600.0;

impl CrawlerConfig {
    /// Pause between page requests
    ///
    /// Validated configs always convert exactly. Anything that does not fit a
    /// `Duration` falls back to the longest accepted pause.
    pub fn wait_duration(&self) -> Duration {
        Duration::try_from_secs_f64(self.wait_interval)
            .unwrap_or_else(|_| Duration::from_secs_f64(MAX_WAIT_INTERVAL_SECS))
    }
}

/// Document store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Name of the collection (table) holding posting documents
    #[serde(default = "default_collection")]
    pub collection: String,
}

fn default_page_size() -> u32 {
    25
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_collection() -> String {
    "postings".to_string()
}
