//! Lenient parsing for the free-form date strings that open-response components store.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const ZONED_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_FORMATS: [&str; 10] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%Y%m%dT%H%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d %Y %H:%M:%S",
];

/// Formats that carry an hour but no minutes. chrono needs minutes to build a time, so
/// `:00` is appended before these are tried.
const HOUR_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"];

/// Month names match full or abbreviated (`January`, `Jan`).
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d", "%B %d, %Y", "%B %d %Y"];

/// Parses `value`, reading it as UTC when it carries no zone. Returns `None` if nothing
/// matches.
pub fn parse_loose(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.to_utc());
    }

    for format in ZONED_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(value, format) {
            return Some(parsed.to_utc());
        }
    }

    let naive = value
        .strip_suffix('Z')
        .or_else(|| value.strip_suffix('z'))
        .unwrap_or(value);

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(naive, format) {
            return Some(parsed.and_utc());
        }
    }

    let padded = format!("{naive}:00");
    for format in HOUR_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(&padded, format) {
            return Some(parsed.and_utc());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(naive, format).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
