//! Calendar date utilities for tag-reaper
//!
//! Every lifecycle decision is made on whole calendar days. Dates are stored
//! on resources as ISO-8601 strings (`yyyy-mm-dd`) and read back leniently:
//! a missing or hand-mangled tag value is treated as "no date".

use chrono::{Local, NaiveDate};
use std::collections::BTreeMap;

use crate::{ReaperError, Result};

/// Tag/CLI date format
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date in the local timezone.
#[allow(clippy::disallowed_methods)] // The one place wall-clock time enters a run
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Parse a strict `yyyy-mm-dd` date (CLI `--run-date`, config values).
pub fn parse_iso_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), ISO_DATE_FORMAT)
        .map_err(|_| ReaperError::invalid_date(value))
}

/// Format a date the way it is stored in tags.
pub fn format_iso_date(date: NaiveDate) -> String {
    date.format(ISO_DATE_FORMAT).to_string()
}

/// Format an optional date for messages; absent renders as `None`.
pub fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map(format_iso_date).unwrap_or_else(|| "None".to_string())
}

/// Read a tag as a date, or `None` if it is missing or not a valid date.
pub fn date_from_tags(tags: &BTreeMap<String, String>, tag: &str) -> Option<NaiveDate> {
    let value = tags.get(tag)?;
    match parse_iso_date(value) {
        Ok(date) => Some(date),
        Err(_) => {
            tracing::debug!(tag, value = %value, "Ignoring unparseable date tag");
            None
        }
    }
}

/// `date + days`, saturating at chrono's maximum date.
pub fn add_days(date: NaiveDate, days: u32) -> NaiveDate {
    date.checked_add_days(chrono::Days::new(u64::from(days)))
        .unwrap_or(NaiveDate::MAX)
}

/// Signed number of days from `from` to `to`.
pub fn days_until(from: NaiveDate, to: NaiveDate) -> i64 {
    to.signed_duration_since(from).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(parse_iso_date("2024-07-22").unwrap(), date(2024, 7, 22));
        assert_eq!(parse_iso_date(" 2024-07-22 ").unwrap(), date(2024, 7, 22));

        assert!(parse_iso_date("2024-13-01").is_err());
        assert!(parse_iso_date("22/07/2024").is_err());
        assert!(parse_iso_date("").is_err());
    }

    #[test]
    fn test_format_round_trip_through_tags() {
        let mut tags = BTreeMap::new();
        tags.insert("reaper/stop/date".to_string(), format_iso_date(date(2025, 1, 9)));
        tags.insert("reaper/stop/notification/1".to_string(), "soon".to_string());

        assert_eq!(date_from_tags(&tags, "reaper/stop/date"), Some(date(2025, 1, 9)));
        assert_eq!(date_from_tags(&tags, "reaper/stop/notification/1"), None);
        assert_eq!(date_from_tags(&tags, "missing"), None);
    }

    #[test]
    fn test_day_arithmetic() {
        let start = date(2024, 12, 30);
        assert_eq!(add_days(start, 3), date(2025, 1, 2));
        assert_eq!(add_days(start, 0), start);
        assert_eq!(days_until(start, date(2025, 1, 2)), 3);
        assert_eq!(days_until(date(2025, 1, 2), start), -3);
    }

    #[test]
    fn test_format_optional_date() {
        assert_eq!(format_optional_date(None), "None");
        assert_eq!(format_optional_date(Some(date(2024, 2, 29))), "2024-02-29");
    }
}
