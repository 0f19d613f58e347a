use crate::error::{GridExportError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Half-open date interval `[start_date, end_date)` shared by every tile in a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct ProcessingWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawWindow {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TryFrom<RawWindow> for ProcessingWindow {
    type Error = GridExportError;

    fn try_from(raw: RawWindow) -> Result<Self> {
        Self::new(raw.start_date, raw.end_date)
    }
}

impl ProcessingWindow {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Result<Self> {
        if start_date >= end_date {
            return Err(GridExportError::ValidationError(format!(
                "processing window start {start_date} must be before end {end_date}"
            )));
        }
        Ok(Self {
            start_date,
            end_date,
        })
    }

    /// Parse `YYYY-MM-DD` dates
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        let parse = |value: &str| {
            NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|e| {
                GridExportError::ValidationError(format!("invalid date '{value}': {e}"))
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date < self.end_date
    }

    pub fn num_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

impl fmt::Display for ProcessingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_date, self.end_date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_or_inverted_windows() {
        assert!(ProcessingWindow::parse("2024-01-01", "2024-01-01").is_err());
        assert!(ProcessingWindow::parse("2024-02-01", "2024-01-01").is_err());
        assert!(ProcessingWindow::parse("2024-13-01", "2025-01-01").is_err());
    }

    #[test]
    fn window_is_half_open() {
        let window = ProcessingWindow::parse("2017-06-01", "2024-12-07").unwrap();
        let start = NaiveDate::from_ymd_opt(2017, 6, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 12, 7).unwrap();
        assert!(window.contains(start));
        assert!(!window.contains(end));
        assert_eq!(window.to_string(), "[2017-06-01, 2024-12-07)");
    }

    #[test]
    fn deserialization_validates_order() {
        let ok: ProcessingWindow =
            serde_json::from_str(r#"{"start_date":"2020-01-01","end_date":"2020-03-01"}"#)
                .unwrap();
        assert_eq!(ok.num_days(), 60);
        assert!(serde_json::from_str::<ProcessingWindow>(
            r#"{"start_date":"2020-03-01","end_date":"2020-01-01"}"#
        )
        .is_err());
    }
}
