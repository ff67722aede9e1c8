//! Date-range windowing
//!
//! The listing endpoint only accepts bounded date intervals, so a requested
//! range is split into consecutive windows of at most `max_days` days each.
//! Windows are inclusive on both ends, abut without gaps or overlap, and their
//! union is exactly the requested range.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default maximum window length in days
pub const DEFAULT_MAX_DAYS_PER_WINDOW: u32 = 31;

/// Windowing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    /// Start date falls after end date
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange {
        /// Requested start
        start: NaiveDate,
        /// Requested end
        end: NaiveDate,
    },

    /// Window length of zero days
    #[error("window length must be at least 1 day")]
    ZeroLength,
}

/// Inclusive date interval dispatched as one listing request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    /// First day (inclusive)
    pub start: NaiveDate,
    /// Last day (inclusive)
    pub end: NaiveDate,
}

impl DateWindow {
    /// Number of days covered, counting both ends
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Start formatted as `YYYYMMDD` for URL paths
    pub fn start_compact(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    /// End formatted as `YYYYMMDD` for URL paths
    pub fn end_compact(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Split `[start, end]` into ordered windows of at most `max_days` days
///
/// The final window is truncated to `end`. Inverted ranges are rejected
/// rather than swapped.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use plenary_speech_downloader::window::plan_windows;
///
/// let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
/// let end = NaiveDate::from_ymd_opt(2019, 2, 15).unwrap();
/// let windows = plan_windows(start, end, 31).unwrap();
///
/// assert_eq!(windows.len(), 2);
/// assert_eq!(windows[0].end, NaiveDate::from_ymd_opt(2019, 1, 31).unwrap());
/// assert_eq!(windows[1].start, NaiveDate::from_ymd_opt(2019, 2, 1).unwrap());
/// ```
pub fn plan_windows(
    start: NaiveDate,
    end: NaiveDate,
    max_days: u32,
) -> Result<Vec<DateWindow>, WindowError> {
    if max_days == 0 {
        return Err(WindowError::ZeroLength);
    }
    if start > end {
        return Err(WindowError::InvalidRange { start, end });
    }

    let span = Days::new(u64::from(max_days - 1));
    let mut windows = Vec::new();
    let mut current = start;

    loop {
        // Saturate at the calendar's upper bound instead of overflowing.
        let window_end = current
            .checked_add_days(span)
            .map_or(end, |candidate| candidate.min(end));

        windows.push(DateWindow {
            start: current,
            end: window_end,
        });

        match window_end.succ_opt() {
            Some(next) if window_end < end => current = next,
            _ => break,
        }
    }

    Ok(windows)
}
