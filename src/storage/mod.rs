//! Storage module for persisting harvested postings
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Idempotent posting upserts keyed by posting `id`
//! - The run ledger recording each harvest run

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{PostingStore, StorageError, StorageResult};

use crate::config::StorageConfig;
use crate::posting::PostingRecord;
use std::path::Path;

/// Opens the store described by the storage configuration
pub fn open_storage(config: &StorageConfig) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(Path::new(&config.database_path), &config.collection)
}

/// Upserts each record in order, one write per record
///
/// Records are not grouped in a transaction: if record *k* fails, records
/// before it stay written. `written` is bumped after every successful upsert,
/// so it stays accurate when a later record fails.
pub fn store_postings<S: PostingStore + ?Sized>(
    store: &mut S,
    records: &[PostingRecord],
    written: &mut u64,
) -> StorageResult<()> {
    for record in records {
        store.upsert_posting(record)?;
        *written += 1;
        tracing::info!(id = %record.id, "Upserted posting");
    }
    Ok(())
}

/// Represents a harvest run in the ledger
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages_stored: u32,
    pub pages_fetch_failed: u32,
    pub pages_parse_failed: u32,
    pub records_upserted: u64,
}

/// Status of a harvest run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
