//! Posting module for the harvested data model
//!
//! # Components
//!
//! - `PostingRecord`: one posting extracted from a listing row, the unit persisted to storage
//! - `PageOutcome`: how the processing of a single listing page ended

mod outcome;
mod record;

pub use outcome::PageOutcome;
pub use record::PostingRecord;
