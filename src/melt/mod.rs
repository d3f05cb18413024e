//! Record melting - reshape nested API records into flat relational tables
//!
//! This module turns streams of nested JSON objects into [`Table`]s with a
//! stable column set and a validated primary key.
//!
//! ## Statistics
//!
//! Statistics records bundle several breakdowns into one object; use
//! [`StatisticsKind::aggregate_total_statistics_tables`] to split lifetime
//! records into one table per breakdown, and
//! [`StatisticsKind::time_bound_table`] for per-day or per-month records.

pub mod enums;
pub mod flatten;
pub mod naming;
pub mod statistics;
pub mod table;

pub use enums::{process_enum_element, standardized_data_table};
pub use flatten::flatten;
pub use naming::{normalize_header, to_snake_case};
pub use statistics::{
    Breakdown, StatisticsKind, TotalStatistics, FOLLOWER_STATISTICS, PAGE_STATISTICS,
    SHARE_STATISTICS,
};
pub use table::{build_table, into_row, Row, RowStream, Table, TableOptions};
