//! Statistics generation from the posting store
//!
//! This module provides functionality for extracting and displaying
//! harvest statistics from the storage layer.

use crate::storage::{PostingStore, RunRecord, StorageResult};

/// Number of runs shown by default
pub const DEFAULT_RECENT_RUNS: usize = 5;

/// Harvest statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Collection the postings live in
    pub collection: String,

    /// Number of distinct postings stored
    pub total_postings: u64,

    /// Most recent runs, newest first
    pub recent_runs: Vec<RunRecord>,
}

/// Loads statistics from storage
pub fn load_statistics(
    storage: &dyn PostingStore,
    collection: &str,
    recent_runs: usize,
) -> StorageResult<HarvestStatistics> {
    Ok(HarvestStatistics {
        collection: collection.to_string(),
        total_postings: storage.count_postings()?,
        recent_runs: storage.get_recent_runs(recent_runs)?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Collection: {}", stats.collection);
    println!("  Postings stored: {}", stats.total_postings);
    println!();

    if stats.recent_runs.is_empty() {
        println!("No harvest runs recorded yet.");
        return;
    }

    println!("Recent Runs ({}):", stats.recent_runs.len());
    for run in &stats.recent_runs {
        println!(
            "  #{} {} [{}] pages stored: {}, fetch failed: {}, parse failed: {}, records: {}",
            run.id,
            run.started_at,
            run.status.to_db_string(),
            run.pages_stored,
            run.pages_fetch_failed,
            run.pages_parse_failed,
            run.records_upserted
        );
    }
}
