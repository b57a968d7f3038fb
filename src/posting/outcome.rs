/// Page outcome definitions for tracking harvest progress
///
/// Every listing page ends a run in exactly one of these states.
use std::fmt;

/// Represents how the processing of one listing page ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageOutcome {
    /// Page was fetched, parsed, and all of its records upserted
    Stored,

    /// Page could not be retrieved (network error, timeout, non-2xx status)
    FetchFailed,

    /// Page was retrieved but its listing could not be extracted
    ParseFailed,
}

impl PageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stored => "stored",
            Self::FetchFailed => "fetch_failed",
            Self::ParseFailed => "parse_failed",
        }
    }
}

impl fmt::Display for PageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
