//! Date keys and display strings.
//!
//! Appointments are matched to calendar days through a canonical
//! `YYYY-MM-DD` key and ordered within a day through a fixed-width `HH:MM`
//! time, so both formats are strict: no missing zero padding, no extra
//! components.

use chrono::{NaiveDate, NaiveTime};

const DATE_KEY_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Canonical day key, e.g. `2025-06-10`.
pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` key back into a calendar day.
pub fn parse_date_key(key: &str) -> Result<NaiveDate, String> {
    if key.len() != 10 {
        return Err(format!("Invalid date '{}'. Expected YYYY-MM-DD", key));
    }
    NaiveDate::parse_from_str(key, DATE_KEY_FORMAT)
        .map_err(|_| format!("Invalid date '{}'. Expected YYYY-MM-DD", key))
}

/// Human-readable date using a chrono format string.
pub fn display_date(date: NaiveDate, format: &str) -> String {
    date.format(format).to_string()
}

/// Canonical `HH:MM` label for a time of day.
pub fn time_label(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parse a zero-padded 24h `HH:MM` time.
pub fn parse_time(s: &str) -> Result<NaiveTime, String> {
    if s.len() != 5 {
        return Err(format!("Invalid time '{}'. Expected HH:MM", s));
    }
    NaiveTime::parse_from_str(s, TIME_FORMAT)
        .map_err(|_| format!("Invalid time '{}'. Expected HH:MM", s))
}
