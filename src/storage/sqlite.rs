//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the PostingStore
//! trait. The posting collection is one table whose primary key is the
//! posting `id`, so every write is an `INSERT .. ON CONFLICT(id) DO UPDATE`.

use crate::config::validate_collection_name;
use crate::crawler::RunSummary;
use crate::posting::PostingRecord;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{PostingStore, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, pages_stored, \
     pages_fetch_failed, pages_parse_failed, records_upserted";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
    collection: String,
}

impl SqliteStorage {
    /// Opens or creates the database at `path` with the given collection
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Invalid collection name or database failure
    pub fn new(path: &Path, collection: &str) -> StorageResult<Self> {
        validate_collection_name(collection)
            .map_err(|e| StorageError::InvalidCollection(e.to_string()))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn, collection)?;

        Ok(Self {
            conn,
            collection: collection.to_string(),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory(collection: &str) -> StorageResult<Self> {
        validate_collection_name(collection)
            .map_err(|e| StorageError::InvalidCollection(e.to_string()))?;

        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn, collection)?;

        Ok(Self {
            conn,
            collection: collection.to_string(),
        })
    }

    /// Name of the posting collection
    pub fn collection(&self) -> &str {
        &self.collection
    }
}

fn posting_from_row(row: &Row) -> rusqlite::Result<PostingRecord> {
    Ok(PostingRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        owner: row.get(2)?,
        time_last_response: row.get(3)?,
        url_posting: row.get(4)?,
        url_owner: row.get(5)?,
        time_updated: row.get(6)?,
    })
}

fn run_from_row(row: &Row) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Failed),
        pages_stored: row.get(5)?,
        pages_fetch_failed: row.get(6)?,
        pages_parse_failed: row.get(7)?,
        records_upserted: row.get::<_, i64>(8)? as u64,
    })
}

impl PostingStore for SqliteStorage {
    // ===== Postings =====

    fn upsert_posting(&mut self, record: &PostingRecord) -> StorageResult<()> {
        let sql = format!(
            "INSERT INTO {} (id, title, owner, time_last_response, url_posting, url_owner, time_updated)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 owner = excluded.owner,
                 time_last_response = excluded.time_last_response,
                 url_posting = excluded.url_posting,
                 url_owner = excluded.url_owner,
                 time_updated = excluded.time_updated",
            self.collection
        );

        self.conn.execute(
            &sql,
            params![
                record.id,
                record.title,
                record.owner,
                record.time_last_response,
                record.url_posting,
                record.url_owner,
                record.time_updated
            ],
        )?;
        Ok(())
    }

    fn get_posting(&self, id: &str) -> StorageResult<Option<PostingRecord>> {
        let sql = format!(
            "SELECT id, title, owner, time_last_response, url_posting, url_owner, time_updated
             FROM {} WHERE id = ?1",
            self.collection
        );

        let posting = self
            .conn
            .query_row(&sql, params![id], posting_from_row)
            .optional()?;

        Ok(posting)
    }

    fn count_postings(&self) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.collection),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Run Ledger =====

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET finished_at = ?1, status = ?2, pages_stored = ?3,
             pages_fetch_failed = ?4, pages_parse_failed = ?5, records_upserted = ?6
             WHERE id = ?7",
            params![
                now,
                status.to_db_string(),
                summary.pages_stored,
                summary.pages_fetch_failed,
                summary.pages_parse_failed,
                summary.records_upserted as i64,
                run_id
            ],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM runs ORDER BY id DESC LIMIT ?1",
            RUN_COLUMNS
        ))?;

        let runs = stmt
            .query_map(params![limit as i64], run_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(runs)
    }
}
