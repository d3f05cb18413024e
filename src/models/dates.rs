//! Human-friendly date strings used in time range configuration.
//!
//! Supports fixed dates (`2022-09-13`, RFC 3339 timestamps) and a small set of
//! relative expressions (`today`, `yesterday`, `7 days ago`, `3 months ago`).
//! Every result is truncated to midnight UTC.

use crate::error::{Error, Result};
use chrono::{DateTime, Days, Months, NaiveDate, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

static RELATIVE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(\d+)\s+(day|week|month|year)s?\s+ago$").unwrap()
});

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap()
});

const PARSE_HINT: &str = "Please either use a fixed date such as \"1982-09-13\" or \
                          a relative expression such as \"7 days ago\", \"today\", etc.";

/// Truncate an instant to midnight of the same UTC day
pub fn midnight_utc(dt: DateTime<Utc>) -> DateTime<Utc> {
    at_midnight(dt.date_naive())
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// Parse a date string relative to `now`
pub fn parse_date(s: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let trimmed = s.trim();
    let lowered = trimmed.to_lowercase();
    let today = now.date_naive();

    let date = match lowered.as_str() {
        "now" | "today" => Some(today),
        "yesterday" => today.checked_sub_days(Days::new(1)),
        _ => {
            if let Some(caps) = RELATIVE_REGEX.captures(&lowered) {
                let amount: u32 = caps[1].parse().map_err(|_| unparseable(trimmed))?;
                match &caps[2] {
                    "day" => today.checked_sub_days(Days::new(amount as u64)),
                    "week" => today.checked_sub_days(Days::new(amount as u64 * 7)),
                    "month" => today.checked_sub_months(Months::new(amount)),
                    _ => amount
                        .checked_mul(12)
                        .and_then(|months| today.checked_sub_months(Months::new(months))),
                }
            } else if ISO_DATE_REGEX.is_match(trimmed) {
                NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").ok()
            } else {
                DateTime::parse_from_rfc3339(trimmed)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc).date_naive())
            }
        }
    };

    date.map(at_midnight).ok_or_else(|| unparseable(trimmed))
}

fn unparseable(s: &str) -> Error {
    Error::user(
        format!("Could not parse the string \"{s}\" into a valid datetime."),
        PARSE_HINT,
    )
}
