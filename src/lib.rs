//! # lipages - Organization Analytics Extractor
//!
//! Pulls page, follower and share statistics, posts with their comments and
//! likes, organization details and reference data from an organization
//! management API, and melts the nested JSON responses into flat tables.
//!
//! ## Modules
//!
//! - **models**: URNs, time ranges and chunked time intervals
//! - **client**: authenticated, lazily paginated API client
//! - **melt**: flatten records and split statistics into relational tables
//! - **writer**: table sinks (CSV files plus load manifests)
//! - **extractor**: ties configuration, client, melting and sink together
//!
//! ## Quick Start
//!
//! ```rust
//! use lipages::melt::FOLLOWER_STATISTICS;
//! use serde_json::json;
//!
//! # fn main() -> lipages::Result<()> {
//! let records = vec![Ok(json!({
//!     "organizationalEntity": "urn:li:organization:1",
//!     "timeRange": {"start": 1704067200000i64, "end": 1704153600000i64},
//!     "followerGains": {"organicFollowerGain": 3, "paidFollowerGain": 0}
//! }))];
//!
//! let table = FOLLOWER_STATISTICS.time_bound_table(records)?;
//! assert_eq!(table.name, "time_bound_follower_statistics");
//! assert_eq!(
//!     table.primary_key,
//!     ["organizational_entity", "time_range_start", "time_range_end"]
//! );
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod melt;
pub mod models;
pub mod state;
pub mod writer;

// Re-export commonly used types for convenience
pub use client::{LinkedInClient, Transport, UreqTransport};
pub use config::{Config, ExtractionTarget, Parameters, StatisticsType};
pub use error::{Error, Result};
pub use extractor::{ExtractionRun, Extractor};
pub use melt::{build_table, Table, TableOptions};
pub use models::{TimeGranularity, TimeIntervals, TimeRange, Urn};
pub use state::RunState;
pub use writer::{CsvTableWriter, PersistOutcome, TableSink};
