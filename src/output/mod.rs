//! Output module for reporting harvest results
//!
//! This module reads back what the harvester has stored: collection size
//! and the run ledger.

pub mod stats;

pub use stats::{load_statistics, print_statistics, HarvestStatistics, DEFAULT_RECENT_RUNS};
