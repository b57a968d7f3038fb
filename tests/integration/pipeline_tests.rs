//! Integration tests for the harvest pipeline
//!
//! These tests use wiremock to serve listing pages and run the full
//! fetch → extract → upsert cycle against an in-memory store.

use board_harvest::config::{Config, CrawlerConfig, HttpConfig, StorageConfig};
use board_harvest::crawler::{harvest, Fetcher, Pipeline, RunSummary};
use board_harvest::posting::{PageOutcome, PostingRecord};
use board_harvest::storage::{
    PostingStore, RunRecord, RunStatus, SqliteStorage, StorageError, StorageResult,
};
use board_harvest::{FetchError, HarvestError};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};
use wiremock::matchers::{header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING: &str = include_str!("../fixtures/listing.html");
const LISTING_PATH: &str = "/group/rent/discussion";

/// Creates a test configuration pointing at the mock server
fn create_test_config(server_uri: &str, max_pages: u32, db_path: &str) -> Config {
    Config {
        http: HttpConfig {
            base_url: format!("{}{}?start=", server_uri, LISTING_PATH),
            page_size: 25,
            timeout_secs: 1,
            user_agent: "TestBot/1.0".to_string(),
            headers: BTreeMap::new(),
        },
        crawler: CrawlerConfig {
            max_pages,
            wait_interval: 0.0,
        },
        storage: StorageConfig {
            database_path: db_path.to_string(),
            collection: "postings".to_string(),
        },
    }
}

fn listing_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html; charset=utf-8")
}

async fn mount_page(server: &MockServer, start: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("start", start))
        .respond_with(response)
        .mount(server)
        .await;
}

fn memory_pipeline(config: &Config) -> Pipeline<SqliteStorage> {
    let storage = SqliteStorage::open_in_memory("postings").expect("Failed to open store");
    Pipeline::new(config, storage, "test-hash").expect("Failed to build pipeline")
}

/// Store that refuses to write one posting id
struct RejectingStore {
    inner: SqliteStorage,
    reject_id: &'static str,
}

impl PostingStore for RejectingStore {
    fn upsert_posting(&mut self, record: &PostingRecord) -> StorageResult<()> {
        if record.id == self.reject_id {
            return Err(StorageError::Sqlite(rusqlite::Error::InvalidQuery));
        }
        self.inner.upsert_posting(record)
    }

    fn get_posting(&self, id: &str) -> StorageResult<Option<PostingRecord>> {
        self.inner.get_posting(id)
    }

    fn count_postings(&self) -> StorageResult<u64> {
        self.inner.count_postings()
    }

    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64> {
        self.inner.create_run(config_hash)
    }

    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &RunSummary,
    ) -> StorageResult<()> {
        self.inner.finish_run(run_id, status, summary)
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.inner.get_run(run_id)
    }

    fn get_recent_runs(&self, limit: usize) -> StorageResult<Vec<RunRecord>> {
        self.inner.get_recent_runs(limit)
    }
}

#[tokio::test]
async fn test_single_page_harvest() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", listing_response(LISTING)).await;

    let config = create_test_config(&mock_server.uri(), 1, ":memory:");
    let mut pipeline = memory_pipeline(&config);

    let summary = pipeline.run(1).await.expect("Harvest failed");

    assert_eq!(summary.outcomes, vec![PageOutcome::Stored]);
    assert_eq!(summary.records_upserted, 3);

    let storage = pipeline.storage();
    assert_eq!(storage.count_postings().unwrap(), 3);

    let first = storage.get_posting("1001").unwrap().expect("1001 missing");
    assert_eq!(first.title, "Room near Line 2, Jing'an");
    assert_eq!(first.owner, "alice");
    assert_eq!(first.time_last_response, "10-16 09:12");
    assert_eq!(
        first.url_posting,
        "https://www.example.com/group/topic/1001/"
    );
    assert_eq!(first.url_owner, "https://www.example.com/people/alice/");

    let relative = storage.get_posting("1003").unwrap().expect("1003 missing");
    assert_eq!(relative.url_posting, "/group/topic/1003/");
    assert_eq!(relative.owner, "carol");
}

#[tokio::test]
async fn test_referer_chaining() {
    let mock_server = MockServer::start().await;
    let base_url = format!("{}{}?start=", mock_server.uri(), LISTING_PATH);

    // The first page must go out without a Referer
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("start", "0"))
        .and(header_exists("referer"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("start", "0"))
        .respond_with(listing_response(LISTING))
        .expect(1)
        .mount(&mock_server)
        .await;

    for (start, previous) in [("25", "0"), ("50", "25")] {
        Mock::given(method("GET"))
            .and(path(LISTING_PATH))
            .and(query_param("start", start))
            .and(header("referer", format!("{}{}", base_url, previous).as_str()))
            .respond_with(listing_response(LISTING))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let config = create_test_config(&mock_server.uri(), 3, ":memory:");
    let mut pipeline = memory_pipeline(&config);

    let summary = pipeline.run(3).await.expect("Harvest failed");

    assert_eq!(
        summary.outcomes,
        vec![PageOutcome::Stored, PageOutcome::Stored, PageOutcome::Stored]
    );
}

#[tokio::test]
async fn test_configured_headers_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(header("cookie", "bid=abc123"))
        .and(header("user-agent", "TestBot/1.0"))
        .respond_with(listing_response(LISTING))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), 1, ":memory:");
    config
        .http
        .headers
        .insert("Cookie".to_string(), "bid=abc123".to_string());
    let mut pipeline = memory_pipeline(&config);

    let summary = pipeline.run(1).await.expect("Harvest failed");
    assert_eq!(summary.pages_stored, 1);
}

#[tokio::test]
async fn test_fetch_failure_skips_page() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", listing_response(LISTING)).await;
    mount_page(&mock_server, "25", ResponseTemplate::new(500)).await;
    mount_page(&mock_server, "50", listing_response(LISTING)).await;

    let config = create_test_config(&mock_server.uri(), 3, ":memory:");
    let mut pipeline = memory_pipeline(&config);

    let summary = pipeline.run(3).await.expect("Harvest failed");

    assert_eq!(
        summary.outcomes,
        vec![
            PageOutcome::Stored,
            PageOutcome::FetchFailed,
            PageOutcome::Stored
        ]
    );
    assert_eq!(summary.pages_fetch_failed, 1);
    assert_eq!(summary.records_upserted, 6);
    assert_eq!(pipeline.storage().count_postings().unwrap(), 3);
}

#[tokio::test]
async fn test_parse_failure_skips_page() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "0",
        listing_response("<html><body><p>Please log in</p></body></html>"),
    )
    .await;
    mount_page(&mock_server, "25", listing_response(LISTING)).await;

    let config = create_test_config(&mock_server.uri(), 2, ":memory:");
    let mut pipeline = memory_pipeline(&config);

    let summary = pipeline.run(2).await.expect("Harvest failed");

    assert_eq!(
        summary.outcomes,
        vec![PageOutcome::ParseFailed, PageOutcome::Stored]
    );
    assert_eq!(summary.records_upserted, 3);
}

#[tokio::test]
async fn test_malformed_row_aborts_whole_page() {
    let mock_server = MockServer::start().await;

    // Second data row has no owner link
    let broken = LISTING.replacen(
        r#"<a href="https://www.example.com/people/bob/" class="">bob</a>"#,
        "bob",
        1,
    );
    mount_page(&mock_server, "0", listing_response(&broken)).await;

    let config = create_test_config(&mock_server.uri(), 1, ":memory:");
    let mut pipeline = memory_pipeline(&config);

    let summary = pipeline.run(1).await.expect("Harvest failed");

    assert_eq!(summary.outcomes, vec![PageOutcome::ParseFailed]);
    assert_eq!(pipeline.storage().count_postings().unwrap(), 0);
}

#[tokio::test]
async fn test_empty_body_is_parse_failure() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", listing_response("   \n  ")).await;

    let config = create_test_config(&mock_server.uri(), 1, ":memory:");
    let mut pipeline = memory_pipeline(&config);

    let summary = pipeline.run(1).await.expect("Harvest failed");
    assert_eq!(summary.outcomes, vec![PageOutcome::ParseFailed]);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", listing_response(LISTING)).await;
    mount_page(&mock_server, "25", listing_response(LISTING)).await;

    let config = create_test_config(&mock_server.uri(), 2, ":memory:");
    let mut pipeline = memory_pipeline(&config);

    pipeline.run(2).await.expect("First run failed");
    let after_first = pipeline.storage().count_postings().unwrap();

    pipeline.run(2).await.expect("Second run failed");
    let after_second = pipeline.storage().count_postings().unwrap();

    assert_eq!(after_first, 3);
    assert_eq!(after_second, 3);
}

#[tokio::test]
async fn test_upsert_replaces_existing_document() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", listing_response(LISTING)).await;

    let config = create_test_config(&mock_server.uri(), 1, ":memory:");
    let mut pipeline = memory_pipeline(&config);
    pipeline.run(1).await.expect("First run failed");

    let before = pipeline
        .storage()
        .get_posting("1001")
        .unwrap()
        .expect("1001 missing");

    mock_server.reset().await;
    let updated = LISTING.replacen("10-16 09:12", "10-16 11:30", 1);
    mount_page(&mock_server, "0", listing_response(&updated)).await;

    tokio::time::sleep(Duration::from_millis(5)).await;
    pipeline.run(1).await.expect("Second run failed");

    let after = pipeline
        .storage()
        .get_posting("1001")
        .unwrap()
        .expect("1001 missing");

    assert_eq!(after.time_last_response, "10-16 11:30");
    assert!(after.time_updated > before.time_updated);
    assert_eq!(pipeline.storage().count_postings().unwrap(), 3);
}

#[tokio::test]
async fn test_wait_interval_between_pages() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .respond_with(listing_response(LISTING))
        .expect(3)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), 3, ":memory:");
    config.crawler.wait_interval = 0.2;
    let mut pipeline = memory_pipeline(&config);

    let start = Instant::now();
    pipeline.run(3).await.expect("Harvest failed");

    // Two pauses for three pages; none before the first
    assert!(start.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_wait_interval_kept_after_failed_page() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", ResponseTemplate::new(500)).await;
    mount_page(&mock_server, "25", listing_response(LISTING)).await;

    let mut config = create_test_config(&mock_server.uri(), 2, ":memory:");
    config.crawler.wait_interval = 0.2;
    let mut pipeline = memory_pipeline(&config);

    let start = Instant::now();
    let summary = pipeline.run(2).await.expect("Harvest failed");

    assert!(start.elapsed() >= Duration::from_millis(200));
    assert_eq!(
        summary.outcomes,
        vec![PageOutcome::FetchFailed, PageOutcome::Stored]
    );
    assert_eq!(pipeline.storage().count_postings().unwrap(), 3);
}

#[tokio::test]
async fn test_store_failure_aborts_run_and_ledger_counts_partial_writes() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", listing_response(LISTING)).await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("start", "25"))
        .respond_with(listing_response(LISTING))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 2, ":memory:");
    let storage = RejectingStore {
        inner: SqliteStorage::open_in_memory("postings").expect("Failed to open store"),
        reject_id: "1002",
    };
    let mut pipeline =
        Pipeline::new(&config, storage, "test-hash").expect("Failed to build pipeline");

    let result = pipeline.run(2).await;
    assert!(matches!(result, Err(HarvestError::Storage(_))));

    let store = &pipeline.storage().inner;
    assert_eq!(store.count_postings().unwrap(), 1);

    let run = &store.get_recent_runs(1).unwrap()[0];
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.records_upserted, 1);
}

#[tokio::test]
async fn test_zero_pages_fetches_nothing() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(listing_response(LISTING))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 1, ":memory:");
    let mut pipeline = memory_pipeline(&config);

    let summary = pipeline.run(0).await.expect("Harvest failed");
    assert_eq!(summary.pages_attempted(), 0);
}

#[tokio::test]
async fn test_run_ledger_records_counts() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", listing_response(LISTING)).await;
    mount_page(&mock_server, "25", ResponseTemplate::new(404)).await;

    let config = create_test_config(&mock_server.uri(), 2, ":memory:");
    let mut pipeline = memory_pipeline(&config);
    pipeline.run(2).await.expect("Harvest failed");

    let runs = pipeline.storage().get_recent_runs(1).unwrap();
    assert_eq!(runs.len(), 1);

    let run = &runs[0];
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "test-hash");
    assert_eq!(run.pages_stored, 1);
    assert_eq!(run.pages_fetch_failed, 1);
    assert_eq!(run.records_upserted, 3);
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_fetcher_status_error() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", ResponseTemplate::new(503)).await;

    let config = create_test_config(&mock_server.uri(), 1, ":memory:");
    let fetcher = Fetcher::new(&config.http).expect("Failed to build fetcher");

    let err = fetcher.fetch(0).await.unwrap_err();
    assert!(matches!(err, FetchError::Status { status: 503, .. }));
}

#[tokio::test]
async fn test_fetcher_timeout() {
    let mock_server = MockServer::start().await;
    mount_page(
        &mock_server,
        "0",
        listing_response(LISTING).set_delay(Duration::from_secs(3)),
    )
    .await;

    let config = create_test_config(&mock_server.uri(), 1, ":memory:");
    let fetcher = Fetcher::new(&config.http).expect("Failed to build fetcher");

    let err = fetcher.fetch(0).await.unwrap_err();
    assert!(matches!(err, FetchError::Timeout { .. }));
}

#[tokio::test]
async fn test_fetcher_connection_refused() {
    // Bind then drop a listener so the port is known to be closed
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to read address");
    drop(listener);

    let config = create_test_config(&format!("http://{}", addr), 1, ":memory:");
    let fetcher = Fetcher::new(&config.http).expect("Failed to build fetcher");

    let err = fetcher.fetch(0).await.unwrap_err();
    assert!(matches!(err, FetchError::Transport { .. }));
}

#[tokio::test]
async fn test_fetcher_trims_body() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", listing_response("\n\n  <html></html>  \n")).await;

    let config = create_test_config(&mock_server.uri(), 1, ":memory:");
    let fetcher = Fetcher::new(&config.http).expect("Failed to build fetcher");

    let body = fetcher.fetch(0).await.expect("Fetch failed");
    assert_eq!(body, "<html></html>");
}

#[tokio::test]
async fn test_harvest_persists_to_database_file() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "0", listing_response(LISTING)).await;

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("data").join("board.db");
    let config = create_test_config(&mock_server.uri(), 1, db_path.to_str().unwrap());

    let summary = harvest(&config, "file-hash").await.expect("Harvest failed");
    assert_eq!(summary.pages_stored, 1);

    let storage = SqliteStorage::new(&db_path, "postings").expect("Failed to reopen store");
    assert_eq!(storage.count_postings().unwrap(), 3);
    assert_eq!(
        storage.get_recent_runs(1).unwrap()[0].config_hash,
        "file-hash"
    );
}
