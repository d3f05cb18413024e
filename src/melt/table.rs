//! Tables: named, keyed row streams built from raw API records.

use crate::error::{Error, Result};
use crate::melt::flatten::flatten;
use crate::melt::naming::normalize_header;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// One output row, keyed by column name
pub type Row = Map<String, Value>;

/// Lazy, single-pass stream of rows
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

/// A named relational output.
///
/// `columns` is `None` when the source produced no records at all. `records`
/// can be consumed once; re-reading means going back to whatever the sink
/// persisted.
pub struct Table<'a> {
    pub name: String,
    pub columns: Option<Vec<String>>,
    pub primary_key: Vec<String>,
    pub records: RowStream<'a>,
}

impl<'a> Table<'a> {
    /// A table signalling "no data"
    pub fn empty(name: impl Into<String>, primary_key: Vec<String>) -> Self {
        Table {
            name: name.into(),
            columns: None,
            primary_key,
            records: Box::new(std::iter::empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_none()
    }
}

impl fmt::Debug for Table<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("name", &self.name)
            .field("columns", &self.columns)
            .field("primary_key", &self.primary_key)
            .finish_non_exhaustive()
    }
}

/// How rows are reshaped while a table is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableOptions {
    pub flatten: bool,
    pub normalize_header: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            flatten: true,
            normalize_header: true,
        }
    }
}

/// Convert a raw API element into a row, rejecting non-objects
pub fn into_row(value: Value) -> Result<Row> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(Error::Format(format!("expected a JSON object record, got: {other}"))),
    }
}

/// Build a table from a record stream.
///
/// The first record fixes the column set and the header renaming; the primary
/// key (given in raw field names) is checked against it before any further
/// record is pulled. An empty stream gives a table with `columns == None`.
pub fn build_table<'a, I>(
    records: I,
    name: &str,
    primary_key: &[&str],
    options: TableOptions,
) -> Result<Table<'a>>
where
    I: IntoIterator<Item = Result<Row>>,
    I::IntoIter: 'a,
{
    let mut records = records.into_iter();
    let first = match records.next() {
        Some(first) => first?,
        None => {
            warn!(table = name, "no records produced, table will be empty");
            return Ok(Table::empty(name, primary_key.iter().map(|k| k.to_string()).collect()));
        }
    };

    let first = if options.flatten { flatten(first) } else { first };

    let missing: Vec<&str> = primary_key
        .iter()
        .copied()
        .filter(|key| !first.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(Error::Validation(format!(
            "primary key columns {missing:?} of table '{name}' are not among its columns {:?}",
            first.keys().collect::<Vec<_>>()
        )));
    }

    let renames = if options.normalize_header {
        Some(header_mapping(name, first.keys())?)
    } else {
        None
    };
    let shaper = RowShaper {
        table: name.to_string(),
        flatten: options.flatten,
        renames,
    };

    let columns: Vec<String> = first.keys().map(|k| shaper.column_name(k)).collect();
    let primary_key: Vec<String> = primary_key.iter().map(|k| shaper.column_name(k)).collect();

    let first = shaper.rename(first)?;
    let rest = records.map(move |record| record.and_then(|row| shaper.shape(row)));

    Ok(Table {
        name: name.to_string(),
        columns: Some(columns),
        primary_key,
        records: Box::new(std::iter::once(Ok(first)).chain(rest)),
    })
}

/// Raw -> normalized column names, rejecting collisions
fn header_mapping<'k>(
    table: &str,
    keys: impl Iterator<Item = &'k String>,
) -> Result<HashMap<String, String>> {
    let mut renames = HashMap::new();
    let mut taken: HashMap<String, String> = HashMap::new();
    for key in keys {
        let normalized = normalize_header(key);
        if let Some(previous) = taken.insert(normalized.clone(), key.clone()) {
            return Err(Error::Validation(format!(
                "columns '{previous}' and '{key}' of table '{table}' both normalize to '{normalized}'"
            )));
        }
        renames.insert(key.clone(), normalized);
    }
    Ok(renames)
}

/// Applies the same flattening and renaming to every row
struct RowShaper {
    table: String,
    flatten: bool,
    renames: Option<HashMap<String, String>>,
}

impl RowShaper {
    fn column_name(&self, raw: &str) -> String {
        match &self.renames {
            Some(renames) => renames
                .get(raw)
                .cloned()
                .unwrap_or_else(|| normalize_header(raw)),
            None => raw.to_string(),
        }
    }

    /// Keys unseen in the first record are normalized on the fly; two keys
    /// landing on one column is an error
    fn rename(&self, row: Row) -> Result<Row> {
        if self.renames.is_none() {
            return Ok(row);
        }
        let mut renamed = Row::new();
        for (key, value) in row {
            let column = self.column_name(&key);
            if renamed.contains_key(&column) {
                return Err(Error::Validation(format!(
                    "column '{key}' of table '{}' normalizes to '{column}', which another column of the same row already uses",
                    self.table
                )));
            }
            renamed.insert(column, value);
        }
        Ok(renamed)
    }

    fn shape(&self, row: Row) -> Result<Row> {
        let row = if self.flatten { flatten(row) } else { row };
        self.rename(row)
    }
}
