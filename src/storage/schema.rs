//! Database schema definitions
//!
//! The posting collection is a single table keyed by the posting `id`. Its
//! name comes from configuration, so its DDL is built at runtime from a
//! validated identifier.

/// SQL schema for the run ledger
pub const RUNS_SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    pages_stored INTEGER NOT NULL DEFAULT 0,
    pages_fetch_failed INTEGER NOT NULL DEFAULT 0,
    pages_parse_failed INTEGER NOT NULL DEFAULT 0,
    records_upserted INTEGER NOT NULL DEFAULT 0
);
"#;

/// Builds the DDL for a posting collection
///
/// `collection` must already be validated as a plain SQL identifier.
pub fn collection_schema_sql(collection: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {collection} (
    id TEXT PRIMARY KEY NOT NULL,
    title TEXT NOT NULL,
    owner TEXT NOT NULL,
    time_last_response TEXT NOT NULL,
    url_posting TEXT NOT NULL,
    url_owner TEXT NOT NULL,
    time_updated INTEGER NOT NULL
);
"#
    )
}

/// Initializes the run ledger and the posting collection
pub fn initialize_schema(
    conn: &rusqlite::Connection,
    collection: &str,
) -> Result<(), rusqlite::Error> {
    conn.execute_batch(RUNS_SCHEMA_SQL)?;
    conn.execute_batch(&collection_schema_sql(collection))?;
    Ok(())
}
