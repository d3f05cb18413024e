//! Cross-run state: the watermark that "last run" resolves to.

use crate::error::{Error, Result};
use crate::models::dates::midnight_utc;
use crate::models::time::iso_seconds;
use crate::models::TimeRange;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_run: Option<String>,
}

impl RunState {
    pub fn with_watermark(watermark: DateTime<Utc>) -> Self {
        RunState {
            last_run: Some(iso_seconds(watermark)),
        }
    }

    /// Read a state file; a missing file means no previous run
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        match fs::read_to_string(path.as_ref()) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(RunState::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn last_run(&self) -> Result<Option<DateTime<Utc>>> {
        self.last_run
            .as_deref()
            .map(|value| {
                DateTime::parse_from_rfc3339(value)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| Error::Format(format!("stored last_run '{value}' is not ISO-8601: {e}")))
            })
            .transpose()
    }
}

/// The next run's "last run": today at midnight UTC, or the requested
/// range's end when that is earlier
pub fn compute_watermark(now: DateTime<Utc>, time_range: Option<&TimeRange>) -> DateTime<Utc> {
    let today = midnight_utc(now);
    match time_range {
        Some(range) => today.min(range.end()),
        None => today,
    }
}
