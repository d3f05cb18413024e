//! Reshaping organization statistics records into tables
//!
//! Page, follower and share statistics differ only in field names, so a single
//! processor is parameterized by a [`StatisticsKind`] record.
//!
//! Time-bound records carry a `timeRange` and one aggregate sub-object:
//!
//! ```json
//! {"organizationalEntity": "urn:li:organization:1",
//!  "timeRange": {"start": 1704067200000, "end": 1704153600000},
//!  "followerGains": {"organicFollowerGain": 3, "paidFollowerGain": 0}}
//! ```
//!
//! Lifetime records carry the aggregate (when the endpoint has one) next to
//! "X by Y" breakdown fields, each becoming its own table:
//!
//! ```json
//! {"organizationalEntity": "urn:li:organization:1",
//!  "followerCountsByAssociationType": [
//!    {"associationType": "EMPLOYEE", "followerCounts": {"organicFollowerCount": 5}}]}
//! ```

use crate::error::{Error, Result};
use crate::melt::flatten::flatten;
use crate::melt::naming::{camel_case_words, to_lower_camel_case, to_snake_case};
use crate::melt::table::{build_table, into_row, Row, Table, TableOptions};
use crate::models::TimeRange;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

static BREAKDOWN_FIELD_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([a-z][A-Za-z0-9]*)By([A-Z][A-Za-z0-9]*)$").unwrap()
});

pub const TIME_RANGE_FIELD: &str = "timeRange";
pub const TIME_RANGE_START_COLUMN: &str = "timeRange_start";
pub const TIME_RANGE_END_COLUMN: &str = "timeRange_end";

/// Field names distinguishing one statistics endpoint from another
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatisticsKind {
    /// Short type name used in table names, e.g. `page`
    pub name: &'static str,
    /// Field holding the organization URN
    pub organization_urn_field: &'static str,
    /// Field holding the aggregate sub-object
    pub total_statistics_field: &'static str,
}

pub const PAGE_STATISTICS: StatisticsKind = StatisticsKind {
    name: "page",
    organization_urn_field: "organization",
    total_statistics_field: "totalPageStatistics",
};

pub const FOLLOWER_STATISTICS: StatisticsKind = StatisticsKind {
    name: "follower",
    organization_urn_field: "organizationalEntity",
    total_statistics_field: "followerGains",
};

pub const SHARE_STATISTICS: StatisticsKind = StatisticsKind {
    name: "share",
    organization_urn_field: "organizationalEntity",
    total_statistics_field: "totalShareStatistics",
};

/// Rows of one breakdown table, collected across records
#[derive(Debug, Clone, PartialEq)]
pub struct Breakdown {
    /// Source field, e.g. `followerCountsByAssociationType`
    pub field: String,
    /// Field identifying the breakdown value within each row, e.g. `associationType`
    pub breakdown_field: String,
    pub rows: Vec<Row>,
}

/// Result of un-nesting one lifetime record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TotalStatistics {
    /// Organization URN plus the inlined aggregate, if the record had one
    pub total: Option<Row>,
    /// Breakdown table name -> rows
    pub breakdowns: BTreeMap<String, Breakdown>,
}

impl StatisticsKind {
    pub fn time_bound_table_name(&self) -> String {
        format!("time_bound_{}_statistics", self.name)
    }

    pub fn total_table_name(&self) -> String {
        format!("total_{}_statistics", self.name)
    }

    pub fn time_bound_primary_key(&self) -> [&'static str; 3] {
        [
            self.organization_urn_field,
            TIME_RANGE_START_COLUMN,
            TIME_RANGE_END_COLUMN,
        ]
    }

    /// Inline the aggregate, make the time range serializable and flatten
    pub fn process_time_bound_element(&self, element: Value) -> Result<Row> {
        let mut row = into_row(element)?;

        let total = row.remove(self.total_statistics_field).ok_or_else(|| {
            Error::Format(format!(
                "time-bound {} statistics record lacks '{}'",
                self.name, self.total_statistics_field
            ))
        })?;
        inline_object(&mut row, self.total_statistics_field, total)?;

        let time_range = row.get(TIME_RANGE_FIELD).ok_or_else(|| {
            Error::Format(format!(
                "time-bound {} statistics record lacks '{TIME_RANGE_FIELD}'",
                self.name
            ))
        })?;
        let serializable = TimeRange::from_api(time_range)?.to_serializable();
        row.insert(TIME_RANGE_FIELD.to_string(), serializable);

        Ok(flatten(row))
    }

    /// Build the time-bound table from a stream of raw records
    pub fn time_bound_table<'a, I>(&self, records: I) -> Result<Table<'a>>
    where
        I: IntoIterator<Item = Result<Value>>,
        I::IntoIter: 'a,
    {
        let kind = *self;
        let rows = records
            .into_iter()
            .map(move |record| record.and_then(|element| kind.process_time_bound_element(element)));
        build_table(
            rows,
            &self.time_bound_table_name(),
            &self.time_bound_primary_key(),
            TableOptions::default(),
        )
    }

    /// Split one lifetime record into its aggregate row and breakdown rows
    pub fn process_total_statistics_record(&self, record: Value) -> Result<TotalStatistics> {
        let mut record = into_row(record)?;
        let organization = record
            .remove(self.organization_urn_field)
            .ok_or_else(|| {
                Error::Format(format!(
                    "{} statistics record lacks '{}'",
                    self.name, self.organization_urn_field
                ))
            })?;

        let mut result = TotalStatistics::default();

        if let Some(total) = record.remove(self.total_statistics_field) {
            let mut row = Row::new();
            row.insert(self.organization_urn_field.to_string(), organization.clone());
            inline_object(&mut row, self.total_statistics_field, total)?;
            result.total = Some(row);
        }

        for (field, value) in record {
            let Some(caps) = BREAKDOWN_FIELD_REGEX.captures(&field) else {
                debug!(field = %field, "ignoring non-breakdown field of {} statistics", self.name);
                continue;
            };
            let dimension = caps[1].to_string();
            let breakdown = caps[2].to_string();

            let elements = match value {
                Value::Array(elements) => elements,
                Value::Object(single) => vec![Value::Object(single)],
                other => {
                    return Err(Error::Validation(format!(
                        "breakdown field '{field}' must hold an object or a list of objects, got: {other}"
                    )))
                }
            };

            let mut rows = Vec::with_capacity(elements.len());
            for element in elements {
                let mut row = match element {
                    Value::Object(row) => row,
                    other => {
                        return Err(Error::Validation(format!(
                            "elements of breakdown field '{field}' must be objects, got: {other}"
                        )))
                    }
                };
                row.insert(self.organization_urn_field.to_string(), organization.clone());
                if let Some(sub_object) = row.remove(&dimension) {
                    inline_object(&mut row, &dimension, sub_object)?;
                }
                rows.push(row);
            }

            let breakdown_field = resolve_breakdown_field(&breakdown, rows.first());
            result.breakdowns.insert(
                to_snake_case(&field),
                Breakdown {
                    field,
                    breakdown_field,
                    rows,
                },
            );
        }

        Ok(result)
    }

    /// Un-nest every lifetime record and build one table per breakdown, plus
    /// the aggregate table when the records carry one
    pub fn aggregate_total_statistics_tables<I>(&self, records: I) -> Result<Vec<Table<'static>>>
    where
        I: IntoIterator<Item = Result<Value>>,
    {
        let mut totals: Vec<Row> = Vec::new();
        let mut breakdowns: BTreeMap<String, Breakdown> = BTreeMap::new();

        for record in records {
            let processed = self.process_total_statistics_record(record?)?;
            totals.extend(processed.total);
            for (table_name, breakdown) in processed.breakdowns {
                match breakdowns.get_mut(&table_name) {
                    Some(existing) => {
                        // An empty breakdown could not resolve its key field from a row
                        if existing.rows.is_empty() {
                            existing.breakdown_field = breakdown.breakdown_field;
                        }
                        existing.rows.extend(breakdown.rows);
                    }
                    None => {
                        breakdowns.insert(table_name, breakdown);
                    }
                }
            }
        }

        let mut tables = Vec::with_capacity(breakdowns.len() + 1);
        if !totals.is_empty() {
            tables.push(build_table(
                totals.into_iter().map(Ok),
                &self.total_table_name(),
                &[self.organization_urn_field],
                TableOptions::default(),
            )?);
        }
        for (table_name, breakdown) in breakdowns {
            tables.push(build_table(
                breakdown.rows.into_iter().map(Ok),
                &table_name,
                &[self.organization_urn_field, breakdown.breakdown_field.as_str()],
                TableOptions::default(),
            )?);
        }
        Ok(tables)
    }
}

/// Move the fields of `value` into `row`; non-objects stay under `field`
fn inline_object(row: &mut Map<String, Value>, field: &str, value: Value) -> Result<()> {
    match value {
        Value::Object(inner) => {
            for (key, value) in inner {
                if row.contains_key(&key) {
                    return Err(Error::Format(format!(
                        "inlining '{field}' would overwrite existing field '{key}'"
                    )));
                }
                row.insert(key, value);
            }
        }
        other => {
            row.insert(field.to_string(), other);
        }
    }
    Ok(())
}

/// camelCase breakdown name, or its longest word prefix present in the rows
/// (`GeoCountry` elements are keyed by `geo`)
fn resolve_breakdown_field(breakdown: &str, sample: Option<&Row>) -> String {
    let full = to_lower_camel_case(breakdown);
    let Some(sample) = sample else {
        return full;
    };
    if sample.contains_key(&full) {
        return full;
    }
    let words = camel_case_words(breakdown);
    (1..words.len())
        .rev()
        .map(|n| camel_join(&words[..n]))
        .find(|candidate| sample.contains_key(candidate))
        .unwrap_or(full)
}

fn camel_join(words: &[String]) -> String {
    let mut joined = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            joined.push_str(word);
        } else {
            let mut chars = word.chars();
            if let Some(first) = chars.next() {
                joined.extend(first.to_uppercase());
                joined.push_str(chars.as_str());
            }
        }
    }
    joined
}
