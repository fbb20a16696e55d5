//! Daily date windows.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GridError, GridResult};

/// Parse a calendar day in `yyyy-mm-dd` or `yyyymmdd` form.
pub fn parse_date(s: &str) -> GridResult<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y%m%d"))
        .map_err(|_| GridError::InvalidDate(s.to_string()))
}

/// Half-open window of calendar days, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Create a window; `start` must precede `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> GridResult<Self> {
        if start >= end {
            return Err(GridError::InvalidWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// Parse both ends from strings.
    pub fn parse(start: &str, end: &str) -> GridResult<Self> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Whether a day falls inside the window (end exclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    /// Number of days in the window.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Label such as `2017_2018` covering the first and last included year.
    pub fn year_span(&self) -> String {
        let last = self.end.pred_opt().unwrap_or(self.end);
        format!("{}_{}", self.start.year(), last.year())
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
