//! Time ranges and time-interval specifications for time-bound statistics.

use crate::error::{Error, Result};
use crate::models::dates::{midnight_utc, parse_date};
use chrono::{DateTime, Duration, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::warn;

/// Sentinel accepted as `date_from`, resolved against the stored watermark
pub const LAST_RUN: &str = "last run";

/// Longest span one API call may cover (14 months of 30 days)
pub const MAXIMUM_TIME_RANGE_DAYS: i64 = 30 * 14;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

pub fn maximum_time_range_size() -> Duration {
    Duration::days(MAXIMUM_TIME_RANGE_DAYS)
}

/// User-facing `{date_from, date_to}` block from the configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRangeConfig {
    pub date_from: String,
    pub date_to: String,
}

/// A closed UTC interval with `start <= end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self> {
        if start > end {
            return Err(Error::Validation(format!(
                "start value must be earlier than or concurrent with end value, got start {} and end {}",
                iso_seconds(start),
                iso_seconds(end)
            )));
        }
        Ok(TimeRange { start, end })
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Build from the API's `{"start": <epoch ms>, "end": <epoch ms>}` object
    pub fn from_api(value: &Value) -> Result<Self> {
        let start = epoch_millis_field(value, "start")?;
        let end = epoch_millis_field(value, "end")?;
        TimeRange::new(start, end)
    }

    /// Resolve a configuration block, `last_run` being the previous run's watermark.
    ///
    /// Without a watermark, `"last run"` falls back to the widest window the API
    /// accepts in one call, ending at `date_to`.
    pub fn from_config(
        config: &TimeRangeConfig,
        last_run: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let end = parse_date(&config.date_to, now)?;
        let start = if config.date_from.trim().eq_ignore_ascii_case(LAST_RUN) {
            match last_run {
                Some(watermark) => midnight_utc(watermark),
                None => {
                    warn!(
                        "No last run watermark stored despite \"{LAST_RUN}\" being used as the start \
                         of the time range, using the largest possible range up to the end date"
                    );
                    end - maximum_time_range_size()
                }
            }
        } else {
            parse_date(&config.date_from, now)?
        };

        TimeRange::new(start, end).map_err(|_| {
            Error::user(
                format!(
                    "Time range start ({}) is later than its end ({}).",
                    iso_seconds(start),
                    iso_seconds(end)
                ),
                "Please make sure date_from is earlier than or equal to date_to.",
            )
        })
    }

    /// Fractional length in days
    pub fn length_in_days(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / MILLIS_PER_DAY
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Wire form `(start:<ms>,end:<ms>)`
    pub fn to_url_string(&self) -> String {
        format!(
            "(start:{},end:{})",
            self.start.timestamp_millis(),
            self.end.timestamp_millis()
        )
    }

    /// `{"start": "<iso>", "end": "<iso>"}` with second precision
    pub fn to_serializable(&self) -> Value {
        json!({
            "start": iso_seconds(self.start),
            "end": iso_seconds(self.end),
        })
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", iso_seconds(self.start), iso_seconds(self.end))
    }
}

pub fn iso_seconds(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, false)
}

fn epoch_millis_field(value: &Value, field: &str) -> Result<DateTime<Utc>> {
    let millis = value
        .get(field)
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            Error::Format(format!(
                "time range field '{field}' missing or not an epoch-millisecond integer: {value}"
            ))
        })?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| Error::Format(format!("epoch milliseconds out of range: {millis}")))
}

/// Bucket size of time-bound statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeGranularity {
    #[default]
    Day,
    Month,
}

impl TimeGranularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeGranularity::Day => "DAY",
            TimeGranularity::Month => "MONTH",
        }
    }
}

/// Granularity plus range, sent to time-bound statistics endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeIntervals {
    pub granularity: TimeGranularity,
    pub time_range: TimeRange,
}

impl TimeIntervals {
    pub fn new(granularity: TimeGranularity, time_range: TimeRange) -> Self {
        TimeIntervals {
            granularity,
            time_range,
        }
    }

    /// Wire form `(timeRange:(start:..,end:..),timeGranularityType:DAY)`
    pub fn to_url_string(&self) -> String {
        format!(
            "(timeRange:{},timeGranularityType:{})",
            self.time_range.to_url_string(),
            self.granularity.as_str()
        )
    }

    /// Number of granularity buckets the range spans, rounded up
    pub fn amount(&self) -> u64 {
        let days = self.time_range.length_in_days();
        let buckets = match self.granularity {
            TimeGranularity::Day => days,
            TimeGranularity::Month => days / 30.0,
        };
        buckets.ceil() as u64
    }

    /// Split into contiguous sub-intervals, each no longer than the API maximum
    pub fn to_chunks(&self) -> TimeIntervalChunks {
        self.to_chunks_of(maximum_time_range_size())
    }

    pub fn to_chunks_of(&self, max_span: Duration) -> TimeIntervalChunks {
        TimeIntervalChunks {
            granularity: self.granularity,
            cursor: self.time_range.start,
            end: self.time_range.end,
            max_span,
            emitted_any: false,
        }
    }
}

/// Lazy, chronological sequence of sub-intervals produced by [`TimeIntervals::to_chunks`]
#[derive(Debug, Clone)]
pub struct TimeIntervalChunks {
    granularity: TimeGranularity,
    cursor: DateTime<Utc>,
    end: DateTime<Utc>,
    max_span: Duration,
    emitted_any: bool,
}

impl Iterator for TimeIntervalChunks {
    type Item = TimeIntervals;

    fn next(&mut self) -> Option<Self::Item> {
        // A zero-length range still yields itself once
        if self.cursor >= self.end && self.emitted_any {
            return None;
        }
        let chunk_end = if self.end - self.cursor > self.max_span {
            self.cursor + self.max_span
        } else {
            self.end
        };
        let range = TimeRange {
            start: self.cursor,
            end: chunk_end,
        };
        self.cursor = chunk_end;
        self.emitted_any = true;
        Some(TimeIntervals::new(self.granularity, range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_start_after_end_fails() {
        assert!(matches!(
            TimeRange::new(day(2024, 1, 2), day(2024, 1, 1)),
            Err(Error::Validation(_))
        ));
        assert!(TimeRange::new(day(2024, 1, 1), day(2024, 1, 1)).is_ok());
    }

    #[test]
    fn test_from_api() {
        let range = TimeRange::from_api(&json!({"start": 1_704_067_200_000i64, "end": 1_704_153_600_000i64})).unwrap();
        assert_eq!(range.start(), day(2024, 1, 1));
        assert_eq!(range.end(), day(2024, 1, 2));
        assert_eq!(range.length_in_days(), 1.0);
    }

    #[test]
    fn test_from_api_rejects_missing_or_non_numeric() {
        assert!(matches!(
            TimeRange::from_api(&json!({"start": 1})),
            Err(Error::Format(_))
        ));
        assert!(matches!(
            TimeRange::from_api(&json!({"start": "yesterday", "end": 2})),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_serializable_form() {
        let range = TimeRange::new(day(2024, 1, 1), day(2024, 1, 2)).unwrap();
        assert_eq!(
            range.to_serializable(),
            json!({"start": "2024-01-01T00:00:00+00:00", "end": "2024-01-02T00:00:00+00:00"})
        );
    }

    #[test]
    fn test_from_config_with_watermark() {
        let config = TimeRangeConfig {
            date_from: "last run".to_string(),
            date_to: "today".to_string(),
        };
        let range = TimeRange::from_config(&config, Some(day(2024, 3, 1)), now()).unwrap();
        assert_eq!(range.start(), day(2024, 3, 1));
        assert_eq!(range.end(), day(2024, 3, 15));
    }

    #[test]
    fn test_from_config_last_run_without_watermark_uses_max_lookback() {
        let config = TimeRangeConfig {
            date_from: "last run".to_string(),
            date_to: "2024-03-15".to_string(),
        };
        let range = TimeRange::from_config(&config, None, now()).unwrap();
        assert_eq!(range.end() - range.start(), maximum_time_range_size());
    }

    #[test]
    fn test_from_config_reversed_is_user_error() {
        let config = TimeRangeConfig {
            date_from: "today".to_string(),
            date_to: "7 days ago".to_string(),
        };
        assert!(matches!(
            TimeRange::from_config(&config, None, now()),
            Err(Error::User { .. })
        ));
    }

    #[test]
    fn test_url_strings() {
        let range = TimeRange::new(day(2024, 1, 1), day(2024, 1, 2)).unwrap();
        let intervals = TimeIntervals::new(TimeGranularity::Day, range);
        assert_eq!(
            intervals.to_url_string(),
            "(timeRange:(start:1704067200000,end:1704153600000),timeGranularityType:DAY)"
        );
    }

    #[test]
    fn test_amount() {
        let range = TimeRange::new(day(2024, 1, 1), day(2024, 3, 1) + Duration::hours(1)).unwrap();
        assert_eq!(TimeIntervals::new(TimeGranularity::Day, range).amount(), 61);
        assert_eq!(TimeIntervals::new(TimeGranularity::Month, range).amount(), 3);
    }

    #[test]
    fn test_short_range_is_single_chunk() {
        let range = TimeRange::new(day(2024, 1, 1), day(2024, 2, 1)).unwrap();
        let intervals = TimeIntervals::new(TimeGranularity::Day, range);
        let chunks: Vec<_> = intervals.to_chunks().collect();
        assert_eq!(chunks, vec![intervals]);
    }

    #[test]
    fn test_zero_length_range_is_single_chunk() {
        let range = TimeRange::new(day(2024, 1, 1), day(2024, 1, 1)).unwrap();
        let chunks: Vec<_> = TimeIntervals::new(TimeGranularity::Day, range).to_chunks().collect();
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].time_range.is_empty());
    }

    #[test]
    fn test_long_range_chunks_are_contiguous_and_bounded() {
        let start = day(2020, 1, 1);
        let end = start + Duration::days(1000) + Duration::hours(5);
        let range = TimeRange::new(start, end).unwrap();
        let chunks: Vec<_> = TimeIntervals::new(TimeGranularity::Day, range).to_chunks().collect();

        let expected = (range.length_in_days() / MAXIMUM_TIME_RANGE_DAYS as f64).ceil() as usize;
        assert_eq!(chunks.len(), expected);
        assert_eq!(chunks.first().unwrap().time_range.start(), start);
        assert_eq!(chunks.last().unwrap().time_range.end(), end);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].time_range.end(), pair[1].time_range.start());
        }
        for chunk in &chunks {
            assert!(chunk.time_range.end() - chunk.time_range.start() <= maximum_time_range_size());
            assert_eq!(chunk.granularity, TimeGranularity::Day);
        }
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_empty_chunk() {
        let start = day(2020, 1, 1);
        let range = TimeRange::new(start, start + Duration::days(10)).unwrap();
        let chunks: Vec<_> = TimeIntervals::new(TimeGranularity::Day, range)
            .to_chunks_of(Duration::days(5))
            .collect();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].time_range.end(), start + Duration::days(10));
    }
}
