//! Output sinks: CSV tables plus load manifests.

use crate::error::{Error, Result};
use crate::melt::{Row, RowStream, Table};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Destination for built tables
pub trait TableSink {
    /// Persist one table. Empty tables and repeated names are skipped, not errors.
    fn persist(&mut self, table: Table<'_>, incremental: bool, include_header: bool) -> Result<PersistOutcome>;
}

/// What happened to a table handed to a sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistOutcome {
    Written { rows: usize, columns: Vec<String> },
    Empty,
    Duplicate,
}

/// Load metadata written next to every CSV file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub primary_key: Vec<String>,
    pub columns: Vec<String>,
    pub incremental: bool,
}

#[derive(Debug, Clone)]
struct PersistedTable {
    path: PathBuf,
    columns: Vec<String>,
    header_included: bool,
}

/// Writes each table to `<dir>/<name>.csv` plus `<name>.csv.manifest`
pub struct CsvTableWriter {
    tables_dir: PathBuf,
    persisted: HashMap<String, PersistedTable>,
}

impl CsvTableWriter {
    /// Create a writer for a directory, creating it if needed
    pub fn new<P: AsRef<Path>>(tables_dir: P) -> Result<Self> {
        fs::create_dir_all(&tables_dir)?;
        Ok(CsvTableWriter {
            tables_dir: tables_dir.as_ref().to_path_buf(),
            persisted: HashMap::new(),
        })
    }

    pub fn table_path(&self, name: &str) -> PathBuf {
        self.tables_dir.join(format!("{name}.csv"))
    }

    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.tables_dir.join(format!("{name}.csv.manifest"))
    }

    /// Names of the tables written so far
    pub fn persisted_tables(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.persisted.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Re-read a persisted table from its CSV file. Values come back as strings.
    pub fn read_persisted(&self, name: &str) -> Result<RowStream<'static>> {
        let persisted = self
            .persisted
            .get(name)
            .ok_or_else(|| Error::Validation(format!("table '{name}' has not been persisted")))?
            .clone();
        let reader = csv::ReaderBuilder::new()
            .has_headers(persisted.header_included)
            .flexible(true)
            .from_path(&persisted.path)?;
        let columns = persisted.columns;
        Ok(Box::new(reader.into_records().map(move |record| -> Result<Row> {
            let record = record?;
            let row: Row = columns
                .iter()
                .zip(record.iter())
                .map(|(column, cell)| (column.clone(), Value::String(cell.to_string())))
                .collect();
            Ok(row)
        })))
    }

    fn write_manifest(&self, name: &str, manifest: &Manifest) -> Result<()> {
        let file = fs::File::create(self.manifest_path(name))?;
        serde_json::to_writer_pretty(file, manifest)?;
        Ok(())
    }
}

impl TableSink for CsvTableWriter {
    fn persist(&mut self, table: Table<'_>, incremental: bool, include_header: bool) -> Result<PersistOutcome> {
        let Table {
            name,
            columns,
            primary_key,
            records,
        } = table;

        if self.persisted.contains_key(&name) {
            warn!(table = %name, "table already persisted in this run, skipping");
            return Ok(PersistOutcome::Duplicate);
        }
        let mut records = records.peekable();
        let Some(mut columns) = columns.filter(|_| records.peek().is_some()) else {
            warn!(
                table = %name,
                incremental,
                "attempting to save an empty table, nothing will be loaded"
            );
            return Ok(PersistOutcome::Empty);
        };

        let path = self.table_path(&name);
        let mut writer = csv::WriterBuilder::new().flexible(true).from_path(&path)?;
        if include_header {
            writer.write_record(&columns)?;
        }

        let initial_width = columns.len();
        let mut known: HashSet<String> = columns.iter().cloned().collect();
        let mut rows = 0usize;
        for record in records {
            let row = record?;
            for key in row.keys() {
                if known.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
            writer.write_record(columns.iter().map(|column| cell(row.get(column))))?;
            rows += 1;
        }
        writer.flush()?;
        drop(writer);

        if columns.len() > initial_width {
            pad_rows(&path, &columns, include_header)?;
        }

        self.write_manifest(
            &name,
            &Manifest {
                primary_key,
                columns: columns.clone(),
                incremental,
            },
        )?;
        info!(table = %name, rows, path = %path.display(), "table written");

        self.persisted.insert(
            name,
            PersistedTable {
                path,
                columns: columns.clone(),
                header_included: include_header,
            },
        );
        Ok(PersistOutcome::Written { rows, columns })
    }
}

/// Render one value as a CSV cell
fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(nested) => nested.to_string(),
    }
}

/// Rewrite a file whose column set grew while writing: every row padded to
/// the final width, header replaced by the full column list
fn pad_rows(path: &Path, columns: &[String], header_included: bool) -> Result<()> {
    let padded_path = path.with_extension("csv.padded");
    {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut writer = csv::Writer::from_path(&padded_path)?;
        let mut records = reader.records();
        if header_included {
            records.next().transpose()?;
            writer.write_record(columns)?;
        }
        for record in records {
            let record = record?;
            let mut cells: Vec<String> = record.iter().map(str::to_owned).collect();
            cells.resize(columns.len(), String::new());
            writer.write_record(&cells)?;
        }
        writer.flush()?;
    }
    fs::rename(&padded_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::melt::{build_table, into_row, TableOptions};
    use serde_json::json;

    fn table(name: &str, values: Vec<Value>) -> Table<'static> {
        build_table(
            values.into_iter().map(into_row),
            name,
            &["id"],
            TableOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_writes_csv_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvTableWriter::new(dir.path()).unwrap();

        let outcome = writer
            .persist(
                table("posts", vec![json!({"id": "a", "tags": [1, 2]}), json!({"id": "b", "tags": null})]),
                true,
                true,
            )
            .unwrap();
        assert_eq!(
            outcome,
            PersistOutcome::Written {
                rows: 2,
                columns: vec!["id".to_string(), "tags".to_string()]
            }
        );

        let content = fs::read_to_string(writer.table_path("posts")).unwrap();
        assert_eq!(content, "id,tags\na,\"[1,2]\"\nb,\n");

        let manifest: Manifest =
            serde_json::from_str(&fs::read_to_string(writer.manifest_path("posts")).unwrap()).unwrap();
        assert_eq!(manifest.primary_key, vec!["id"]);
        assert!(manifest.incremental);
    }

    #[test]
    fn test_empty_and_duplicate_tables_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvTableWriter::new(dir.path()).unwrap();

        let empty = Table::empty("nothing", vec!["id".to_string()]);
        assert_eq!(writer.persist(empty, false, false).unwrap(), PersistOutcome::Empty);
        assert!(!writer.table_path("nothing").exists());

        writer.persist(table("t", vec![json!({"id": 1})]), false, false).unwrap();
        assert_eq!(
            writer.persist(table("t", vec![json!({"id": 2})]), false, false).unwrap(),
            PersistOutcome::Duplicate
        );
        assert_eq!(fs::read_to_string(writer.table_path("t")).unwrap(), "1\n");
    }

    #[test]
    fn test_new_columns_extend_and_pad() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvTableWriter::new(dir.path()).unwrap();

        let outcome = writer
            .persist(
                table("t", vec![json!({"id": 1}), json!({"id": 2, "extra": "x"})]),
                false,
                true,
            )
            .unwrap();
        assert_eq!(
            outcome,
            PersistOutcome::Written {
                rows: 2,
                columns: vec!["id".to_string(), "extra".to_string()]
            }
        );
        assert_eq!(
            fs::read_to_string(writer.table_path("t")).unwrap(),
            "id,extra\n1,\n2,x\n"
        );
    }

    #[test]
    fn test_read_persisted_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = CsvTableWriter::new(dir.path()).unwrap();
        writer
            .persist(table("posts", vec![json!({"id": "urn:li:share:1"}), json!({"id": "urn:li:share:2"})]), false, false)
            .unwrap();

        let rows: Vec<Row> = writer.read_persisted("posts").unwrap().collect::<Result<_>>().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], json!("urn:li:share:2"));
        assert_eq!(writer.persisted_tables(), vec!["posts"]);
        assert!(writer.read_persisted("missing").is_err());
    }
}
