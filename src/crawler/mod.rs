//! Crawler module for listing page harvesting
//!
//! This module contains the fetch/parse/store pipeline:
//! - HTTP fetching with per-request Referer chaining
//! - Listing table extraction into posting records
//! - The page-range driver with inter-page pacing

mod extractor;
mod fetcher;
mod pipeline;

pub use extractor::{derive_posting_id, extract_postings, extract_postings_at, HEADER_ROWS};
pub use fetcher::{
    build_base_headers, build_http_client, page_offset, page_url, Fetcher, PageRequest,
};
pub use pipeline::{Pipeline, RunSummary};

use crate::config::Config;
use crate::storage::open_storage;
use crate::HarvestError;

/// Runs a complete harvest with the configured page count
///
/// This is the main entry point for a harvest. It will:
/// 1. Open the posting store
/// 2. Build the HTTP client
/// 3. Fetch, extract, and upsert each page in offset order
/// 4. Record the run in the run ledger
///
/// # Arguments
///
/// * `config` - The harvester configuration
/// * `config_hash` - Hash of the configuration file
pub async fn harvest(config: &Config, config_hash: &str) -> Result<RunSummary, HarvestError> {
    let storage = open_storage(&config.storage)?;
    let mut pipeline = Pipeline::new(config, storage, config_hash)?;
    pipeline.run(config.crawler.max_pages).await
}
