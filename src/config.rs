//! Run configuration loaded from a JSON file.

use crate::error::{Error, Result};
use crate::models::{TimeGranularity, TimeRangeConfig};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// What a run extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionTarget {
    PageStatistics,
    FollowerStatistics,
    ShareStatistics,
    Posts,
    Enums,
    Organizations,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsType {
    #[default]
    Lifetime,
    TimeBound,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Parameters {
    pub extraction_target: ExtractionTarget,
    #[serde(default)]
    pub statistics_type: StatisticsType,
    #[serde(default)]
    pub organization_ids: Vec<u64>,
    #[serde(default)]
    pub time_range: Option<TimeRangeConfig>,
    #[serde(default)]
    pub time_granularity: TimeGranularity,
    #[serde(default)]
    pub incremental: bool,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Authorization {
    #[serde(default)]
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub parameters: Parameters,
    #[serde(default)]
    pub authorization: Authorization,
}

impl Config {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// The bearer token, or a user error asking to re-authorize
    pub fn access_token(&self) -> Result<&str> {
        self.authorization
            .access_token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::user("Access token not available.", "Retry Authorization process"))
    }
}
