//! Board-Harvest: a paced discussion-board listing harvester
//!
//! This crate fetches paginated discussion-board listing pages, extracts one
//! posting record per table row, and upserts the records into a document
//! collection keyed by the posting identifier.

pub mod config;
pub mod crawler;
pub mod output;
pub mod posting;
pub mod storage;

use thiserror::Error;

/// Main error type for Board-Harvest operations
///
/// Only configuration and storage failures reach this level. Fetch and parse
/// failures are recovered per page by the pipeline.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
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

    #[error("Invalid HTTP header in config: {0}")]
    InvalidHeader(String),
}

/// Errors produced while retrieving a single listing page
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Unexpected HTTP status {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Errors produced while turning a listing page into posting records
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Document is empty")]
    EmptyDocument,

    #[error("Listing table not found in document")]
    MissingTable,

    #[error("Malformed listing row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Posting URL does not end with a path separator: {0}")]
    InvalidPostingUrl(String),

    #[error("Invalid selector {0}")]
    InvalidSelector(String),
}

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Pipeline, RunSummary};
pub use posting::{PageOutcome, PostingRecord};
pub use storage::{PostingStore, SqliteStorage};
