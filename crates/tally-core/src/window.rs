//! Report time window and the replica timestamp encoding.
//!
//! Replica databases exchange timestamps as fixed-width `YYYYMMDDHHmmss`
//! strings, which sort lexicographically in chronological order. Window
//! boundaries are formatted into that encoding once and compared as strings
//! everywhere downstream.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Width of the replica timestamp encoding.
pub const WIKI_TS_LEN: usize = 14;

/// Format an instant as a replica timestamp (`YYYYMMDDHHmmss`, UTC).
#[must_use]
pub fn wiki_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y%m%d%H%M%S").to_string()
}

/// The bounded report window plus the trailing lookback used only for the
/// active-editor and newly-registered classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportWindow {
    /// Inclusive start of the report window.
    pub start: DateTime<Utc>,
    /// Inclusive end of the report window.
    pub end: DateTime<Utc>,
    /// Days before `start` that open the lookback window.
    pub lookback_days: i64,
}

impl ReportWindow {
    /// Build a window with the given lookback length.
    #[must_use]
    pub const fn new(start: DateTime<Utc>, end: DateTime<Utc>, lookback_days: i64) -> Self {
        Self {
            start,
            end,
            lookback_days,
        }
    }

    /// Start of the trailing lookback window (`start - lookback_days`).
    #[must_use]
    pub fn lookback_start(&self) -> DateTime<Utc> {
        self.start - Duration::days(self.lookback_days)
    }

    /// `start` in the replica encoding.
    #[must_use]
    pub fn start_ts(&self) -> String {
        wiki_timestamp(self.start)
    }

    /// `end` in the replica encoding.
    #[must_use]
    pub fn end_ts(&self) -> String {
        wiki_timestamp(self.end)
    }

    /// `lookback_start` in the replica encoding.
    #[must_use]
    pub fn lookback_ts(&self) -> String {
        wiki_timestamp(self.lookback_start())
    }
}
