//! Date parsing helpers

use chrono::{DateTime, NaiveDate, Utc};

/// Get current UTC timestamp in milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Parse an order creation timestamp into a UTC calendar date.
///
/// Unparseable timestamps yield `None` rather than an error; normalization
/// degrades per-field, never per-collection.
pub fn parse_order_date(timestamp: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(timestamp) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    // Portal responses occasionally omit the offset
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(timestamp, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.date());
    }
    None
}

/// Parse a payments-export date cell (`MM/DD/YYYY`, also tolerating ISO).
pub fn parse_report_date(text: &str) -> Option<NaiveDate> {
    let s = text.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(s, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}
