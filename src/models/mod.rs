//! Value types shared by the client and the table builder
//!
//! - **urn**: platform entity identifiers (`urn:li:<type>:<id>`)
//! - **time**: time ranges, granularity and chunked time intervals
//! - **dates**: human/relative date strings from configuration
//! - **standardized**: reference data collections

pub mod dates;
pub mod standardized;
pub mod time;
pub mod urn;

pub use standardized::StandardizedDataType;
pub use time::{TimeGranularity, TimeIntervalChunks, TimeIntervals, TimeRange, TimeRangeConfig};
pub use urn::Urn;
