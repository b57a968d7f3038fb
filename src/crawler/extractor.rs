//! Listing extractor for turning board HTML into posting records
//!
//! A listing page carries one `<table class="olt">`. Its first rows are
//! headers; every row after them describes one posting:
//!
//! | Cell | Source |
//! |------|--------|
//! | first `<a>` | posting title (`title` attribute) and posting URL (`href`) |
//! | second `<a>` | owner display name (text) and profile URL (`href`) |
//! | `td.time` | last response time, kept as rendered |
//!
//! Any malformed row aborts the whole page: a page yields either every one
//! of its records or a `ParseError`, never a partial set.

use crate::posting::PostingRecord;
use crate::ParseError;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};

/// Number of leading table rows that are headers, not postings.
///
/// This mirrors the board's current layout (column header row plus a pinned
/// rules row). The rows are not inspected, so an upstream layout change will
/// shift extraction without any error.
pub const HEADER_ROWS: usize = 2;

const LISTING_TABLE: &str = "table.olt";
const TABLE_ROW: &str = "tr";
const LINK: &str = "a";
const TIME_CELL: &str = "td.time";

/// Extracts posting records, stamping them with the current time
///
/// # Example
///
/// ```
/// use board_harvest::crawler::extract_postings;
///
/// let html = r#"<table class="olt"><tr><td>h</td></tr><tr><td>h</td></tr></table>"#;
/// let records = extract_postings(html).unwrap();
/// assert!(records.is_empty());
/// ```
pub fn extract_postings(html: &str) -> Result<Vec<PostingRecord>, ParseError> {
    extract_postings_at(html, Utc::now().timestamp_millis())
}

/// Extracts posting records, stamping them with `now_ms`
///
/// # Returns
///
/// * `Ok(Vec<PostingRecord>)` - One record per data row, in page order
/// * `Err(ParseError)` - The document is empty, has no listing table, or
///   contains a malformed row
pub fn extract_postings_at(html: &str, now_ms: i64) -> Result<Vec<PostingRecord>, ParseError> {
    if html.trim().is_empty() {
        return Err(ParseError::EmptyDocument);
    }

    let document = Html::parse_document(html);

    let table_sel = parse_selector(LISTING_TABLE)?;
    let row_sel = parse_selector(TABLE_ROW)?;
    let link_sel = parse_selector(LINK)?;
    let time_sel = parse_selector(TIME_CELL)?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or(ParseError::MissingTable)?;

    let rows: Vec<ElementRef> = table.select(&row_sel).skip(HEADER_ROWS).collect();
    tracing::info!(rows = rows.len(), "Listing rows found");

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let record = extract_row(row, HEADER_ROWS + index, now_ms, &link_sel, &time_sel)?;

        tracing::info!(
            id = %record.id,
            title = %record.title,
            time_last_response = %record.time_last_response,
            "Extracted posting"
        );

        records.push(record);
    }

    Ok(records)
}

/// Maps one data row onto a posting record
fn extract_row(
    row: ElementRef,
    row_index: usize,
    now_ms: i64,
    link_sel: &Selector,
    time_sel: &Selector,
) -> Result<PostingRecord, ParseError> {
    let malformed = |reason: &str| ParseError::MalformedRow {
        row: row_index,
        reason: reason.to_string(),
    };

    let mut links = row.select(link_sel);
    let posting_link = links.next().ok_or_else(|| malformed("missing posting link"))?;
    let owner_link = links.next().ok_or_else(|| malformed("missing owner link"))?;

    let title = posting_link
        .value()
        .attr("title")
        .ok_or_else(|| malformed("posting link has no title attribute"))?;
    let url_posting = posting_link
        .value()
        .attr("href")
        .ok_or_else(|| malformed("posting link has no href"))?;
    let url_owner = owner_link
        .value()
        .attr("href")
        .ok_or_else(|| malformed("owner link has no href"))?;

    let time_cell = row
        .select(time_sel)
        .next()
        .ok_or_else(|| malformed("missing time cell"))?;

    Ok(PostingRecord {
        id: derive_posting_id(url_posting)?,
        title: title.to_string(),
        owner: element_text(owner_link),
        time_last_response: element_text(time_cell),
        url_posting: url_posting.to_string(),
        url_owner: url_owner.to_string(),
        time_updated: now_ms,
    })
}

/// Derives the posting identifier from its detail-page URL
///
/// The URL must end with `/`; the identifier is the path segment before it.
///
/// # Example
///
/// ```
/// use board_harvest::crawler::derive_posting_id;
///
/// let id = derive_posting_id("https://example.com/group/abc/discussion/12345/").unwrap();
/// assert_eq!(id, "12345");
/// ```
pub fn derive_posting_id(url: &str) -> Result<String, ParseError> {
    let invalid = || ParseError::InvalidPostingUrl(url.to_string());

    let trimmed = url.strip_suffix('/').ok_or_else(invalid)?;
    let id = match trimmed.rfind('/') {
        Some(pos) => &trimmed[pos + 1..],
        None => trimmed,
    };

    if id.is_empty() {
        return Err(invalid());
    }

    Ok(id.to_string())
}

/// Text content as rendered, whitespace included
fn element_text(element: ElementRef) -> String {
    element.text().collect()
}

fn parse_selector(css: &str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::InvalidSelector(format!("{}: {:?}", css, e)))
}
