//! Pipeline driver - main harvest orchestration logic
//!
//! The pipeline walks a fixed page range in ascending offset order. For each
//! page it runs fetch → extract → store, then pauses for the configured wait
//! interval before the next request.
//!
//! Fetch and parse failures only skip the page they happen on; the run goes
//! on with the next page. Storage failures end the run.

use crate::config::Config;
use crate::crawler::extractor::extract_postings;
use crate::crawler::fetcher::{page_offset, Fetcher};
use crate::posting::PageOutcome;
use crate::storage::{store_postings, PostingStore, RunStatus};
use crate::HarvestError;
use std::time::Duration;

/// Counts collected over one harvest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub pages_stored: u32,
    pub pages_fetch_failed: u32,
    pub pages_parse_failed: u32,
    pub records_upserted: u64,

    /// Outcome of every page, indexed by page number
    pub outcomes: Vec<PageOutcome>,
}

impl RunSummary {
    fn record(&mut self, outcome: PageOutcome) {
        match outcome {
            PageOutcome::Stored => self.pages_stored += 1,
            PageOutcome::FetchFailed => self.pages_fetch_failed += 1,
            PageOutcome::ParseFailed => self.pages_parse_failed += 1,
        }
        self.outcomes.push(outcome);
    }

    /// Number of pages attempted
    pub fn pages_attempted(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of pages skipped because of a fetch or parse error
    pub fn pages_failed(&self) -> u32 {
        self.pages_fetch_failed + self.pages_parse_failed
    }
}

/// Main harvest pipeline
pub struct Pipeline<S: PostingStore> {
    fetcher: Fetcher,
    storage: S,
    page_size: u32,
    wait_interval: Duration,
    config_hash: String,
}

impl<S: PostingStore> Pipeline<S> {
    /// Creates a pipeline over an already opened store
    ///
    /// # Arguments
    ///
    /// * `config` - The validated configuration
    /// * `storage` - The posting store, held for the lifetime of the pipeline
    /// * `config_hash` - Hash of the configuration file, recorded with each run
    pub fn new(
        config: &Config,
        storage: S,
        config_hash: impl Into<String>,
    ) -> Result<Self, HarvestError> {
        let wait_interval = config.crawler.wait_duration();
        if wait_interval.is_zero() {
            tracing::warn!("wait_interval is 0, pages will be requested back to back");
        }

        Ok(Self {
            fetcher: Fetcher::new(&config.http)?,
            storage,
            page_size: config.http.page_size,
            wait_interval,
            config_hash: config_hash.into(),
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Harvests pages `0..page_count`
    ///
    /// The run is recorded in the store's run ledger. Every page is attempted
    /// exactly once; failed pages are not retried in this run.
    ///
    /// # Returns
    ///
    /// * `Ok(RunSummary)` - All pages were attempted
    /// * `Err(HarvestError)` - The store failed; the run stops at that page
    pub async fn run(&mut self, page_count: u32) -> Result<RunSummary, HarvestError> {
        let run_id = self.storage.create_run(&self.config_hash)?;
        tracing::info!(run_id, page_count, "Starting harvest run");

        let start_time = std::time::Instant::now();
        let mut summary = RunSummary::default();

        for index in 0..page_count {
            if index > 0 {
                tokio::time::sleep(self.wait_interval).await;
            }

            match self.process_page(index, &mut summary).await {
                Ok(outcome) => summary.record(outcome),
                Err(e) => {
                    tracing::error!(run_id, page = index, error = %e, "Store unavailable, aborting run");
                    self.storage
                        .finish_run(run_id, RunStatus::Failed, &summary)
                        .ok();
                    return Err(e);
                }
            }
        }

        self.storage
            .finish_run(run_id, RunStatus::Completed, &summary)?;

        tracing::info!(
            run_id,
            pages_stored = summary.pages_stored,
            pages_failed = summary.pages_failed(),
            records_upserted = summary.records_upserted,
            "Harvest run completed in {:?}",
            start_time.elapsed()
        );

        Ok(summary)
    }

    /// Processes a single listing page
    ///
    /// Returns the page's outcome; only a storage failure is an `Err`.
    async fn process_page(
        &mut self,
        index: u32,
        summary: &mut RunSummary,
    ) -> Result<PageOutcome, HarvestError> {
        let offset = page_offset(index, self.page_size);
        let request = self.fetcher.request_for(offset);
        tracing::info!(page = index, offset, "Start page");

        let html = match self.fetcher.fetch_request(&request).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "Failed to fetch listing page");
                return Ok(PageOutcome::FetchFailed);
            }
        };

        let records = match extract_postings(&html) {
            Ok(records) => records,
            Err(e) => {
                tracing::error!(url = %request.url, error = %e, "Failed to parse listing page");
                return Ok(PageOutcome::ParseFailed);
            }
        };

        store_postings(&mut self.storage, &records, &mut summary.records_upserted)?;

        Ok(PageOutcome::Stored)
    }
}
