//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::RunSummary;
use crate::posting::PostingRecord;
use crate::storage::{RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
///
/// Any of these ends the run: the store is expected to stay available for
/// the whole process lifetime.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid collection name: {0}")]
    InvalidCollection(String),

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for posting document stores
///
/// A store holds at most one document per posting `id`. Writing a record
/// whose `id` already exists replaces every field of the stored document.
pub trait PostingStore {
    // ===== Postings =====

    /// Inserts the record, or fully replaces the document with the same `id`
    fn upsert_posting(&mut self, record: &PostingRecord) -> StorageResult<()>;

    /// Gets a posting by its identifier
    fn get_posting(&self, id: &str) -> StorageResult<Option<PostingRecord>>;

    /// Counts the documents in the collection
    fn count_postings(&self) -> StorageResult<u64>;

    // ===== Run Ledger =====

    /// Records the start of a harvest run and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Records the end of a run with its final counts
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent runs, newest first
    fn get_recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>>;
}
