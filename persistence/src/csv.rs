//! FILENAME: persistence/src/csv.rs
//! PURPOSE: The delimited file dialect.
//! CONTEXT: Fields are separated by a caller-chosen delimiter with no
//! quoting; the column list travels per call, not in the file. Export
//! covers the rows of the table's current selection. Import runs through
//! the shared merge machinery, with an optional defaults string for
//! columns the file does not carry.

use std::fs;
use std::io::Write;
use std::path::Path;

use engine::{Table, ValueKind};

use crate::error::{PersistenceError, PersistenceResult};
use crate::merge::{self, MergeMode, Record};

/// Merge modes of the delimited dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvMode {
    /// Append every record as a new row.
    Append,
    /// Drop all existing rows, then append.
    Replace,
    /// Match records on the table's key fields; ignore unmatched records.
    KeyedUpdate,
    /// Match on key fields; insert rows for unmatched records.
    KeyedUpsert,
    /// `Replace`, with a header row: written on export, skipped on import.
    ReplaceSkipHeader,
}

impl CsvMode {
    fn merge(self) -> MergeMode {
        match self {
            CsvMode::Append => MergeMode::Append,
            CsvMode::Replace | CsvMode::ReplaceSkipHeader => MergeMode::Replace,
            CsvMode::KeyedUpdate => MergeMode::KeyedUpdate,
            CsvMode::KeyedUpsert => MergeMode::KeyedUpsert,
        }
    }
}

/// Writes the selected rows of `table` to `path`, one record per line,
/// fields in column-list order. There is no quoting, so field text
/// containing the delimiter or a line break cannot be represented and
/// fails with `InvalidFormat` before anything hits the file. Returns
/// the number of rows written.
pub fn write_csv(
    table: &Table,
    path: &Path,
    columns: &[&str],
    delimiter: char,
    mode: CsvMode,
) -> PersistenceResult<usize> {
    let mut lines = Vec::new();
    if mode == CsvMode::ReplaceSkipHeader {
        lines.push(columns.join(&delimiter.to_string()));
    }

    let mut written = 0;
    for row in table.iter_rows() {
        let mut fields = Vec::with_capacity(columns.len());
        for name in columns {
            let text = table.get(row, *name, ValueKind::NotScaled)?.display();
            if text.contains(delimiter) || text.contains('\n') || text.contains('\r') {
                return Err(PersistenceError::InvalidFormat(format!(
                    "Value '{}' in column '{}' cannot be written with delimiter '{}'",
                    text, name, delimiter
                )));
            }
            fields.push(text);
        }
        lines.push(fields.join(&delimiter.to_string()));
        written += 1;
    }

    let mut file = fs::File::create(path)?;
    for line in &lines {
        writeln!(file, "{}", line)?;
    }
    Ok(written)
}

/// Reads `path` into `table` under the given merge mode. `defaults` is a
/// `name=value[,name=value]` string applied to columns absent from the
/// file, on every row this read creates. Empty fields leave the target
/// cell unchanged. Returns the number of rows created or updated.
pub fn read_csv(
    table: &mut Table,
    path: &Path,
    columns: &[&str],
    delimiter: char,
    mode: CsvMode,
    defaults: &str,
) -> PersistenceResult<usize> {
    let defaults = merge::parse_defaults(defaults)?;
    let text = fs::read_to_string(path)?;

    let mut records: Vec<Record> = Vec::new();
    let mut lines = text.lines();
    if mode == CsvMode::ReplaceSkipHeader {
        lines.next();
    }
    for line in lines {
        if line.is_empty() {
            continue;
        }
        records.push(
            line.split(delimiter)
                .map(|f| Some(f.to_string()))
                .collect(),
        );
    }

    merge::apply_records(table, columns, records, mode.merge(), &defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{CellValue, ColumnKind};
    use tempfile::tempdir;

    fn node_table(rows: usize) -> Table {
        let mut t = Table::new("node");
        t.add_column("ny", ColumnKind::Int).unwrap();
        t.add_column("name", ColumnKind::Str).unwrap();
        t.add_column("pn", ColumnKind::Real).unwrap();
        t.set_keys(vec!["ny".to_string()]);
        for i in 0..rows {
            let row = t.add_row();
            t.set(row, "ny", CellValue::Int(i as i64 + 1), ValueKind::NotScaled).unwrap();
            t.set(
                row,
                "name",
                CellValue::Str(format!("Node {}", i + 1)),
                ValueKind::NotScaled,
            )
            .unwrap();
            t.set(row, "pn", CellValue::Real(1.5 * (i as f64 + 1.0)), ValueKind::NotScaled)
                .unwrap();
        }
        t
    }

    #[test]
    fn replace_round_trip_preserves_rows_and_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node.csv");
        let source = node_table(4);
        let columns = ["ny", "name", "pn"];

        let written = write_csv(&source, &path, &columns, ';', CsvMode::Replace).unwrap();
        assert_eq!(written, 4);

        let mut target = node_table(0);
        let read = read_csv(&mut target, &path, &columns, ';', CsvMode::Replace, "").unwrap();
        assert_eq!(read, 4);
        assert_eq!(target.full_size(), 4);
        for row in 0..4 {
            for name in columns {
                assert_eq!(
                    target.get(row, name, ValueKind::NotScaled).unwrap(),
                    source.get(row, name, ValueKind::NotScaled).unwrap()
                );
            }
        }
    }

    #[test]
    fn header_mode_writes_and_skips_the_header_row() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node.csv");
        let source = node_table(2);
        let columns = ["ny", "pn"];

        write_csv(&source, &path, &columns, ',', CsvMode::ReplaceSkipHeader).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("ny,pn\n"));

        let mut target = node_table(0);
        let read =
            read_csv(&mut target, &path, &columns, ',', CsvMode::ReplaceSkipHeader, "").unwrap();
        assert_eq!(read, 2);
        assert_eq!(target.full_size(), 2);
    }

    #[test]
    fn export_covers_only_the_selection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node.csv");
        let mut source = node_table(5);
        source.set_selection("ny>3").unwrap();

        let written = write_csv(&source, &path, &["ny"], ';', CsvMode::Replace).unwrap();
        assert_eq!(written, 2);
    }

    #[test]
    fn defaults_fill_columns_absent_from_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node.csv");
        std::fs::write(&path, "7\n8\n").unwrap();

        let mut target = node_table(0);
        read_csv(&mut target, &path, &["ny"], ';', CsvMode::Append, "pn=4.5,name=new").unwrap();

        assert_eq!(target.full_size(), 2);
        assert_eq!(target.get(0, "pn", ValueKind::NotScaled).unwrap(), CellValue::Real(4.5));
        assert_eq!(
            target.get(1, "name", ValueKind::NotScaled).unwrap(),
            CellValue::Str("new".to_string())
        );
    }

    #[test]
    fn keyed_update_changes_matched_rows_only() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node.csv");
        std::fs::write(&path, "2;200\n9;900\n").unwrap();

        let mut target = node_table(3);
        let touched =
            read_csv(&mut target, &path, &["ny", "pn"], ';', CsvMode::KeyedUpdate, "").unwrap();

        assert_eq!(touched, 1);
        assert_eq!(target.full_size(), 3);
        assert_eq!(target.get(1, "pn", ValueKind::NotScaled).unwrap(), CellValue::Real(200.0));
    }

    #[test]
    fn field_text_containing_the_delimiter_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("node.csv");
        let mut source = node_table(2);
        source
            .set(1, "name", CellValue::Str("Node;south".to_string()), ValueKind::NotScaled)
            .unwrap();

        let err =
            write_csv(&source, &path, &["ny", "name"], ';', CsvMode::Replace).unwrap_err();
        assert!(matches!(err, crate::PersistenceError::InvalidFormat(_)));
        // Rejected before the file is created.
        assert!(!path.exists());

        // The same data is fine under a delimiter the text does not use.
        assert_eq!(
            write_csv(&source, &path, &["ny", "name"], ',', CsvMode::Replace).unwrap(),
            2
        );
    }

    #[test]
    fn missing_file_surfaces_the_io_cause() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.csv");
        let mut target = node_table(0);
        let err = read_csv(&mut target, &path, &["ny"], ';', CsvMode::Append, "").unwrap_err();
        assert!(matches!(err, crate::PersistenceError::Io(_)));
    }
}
