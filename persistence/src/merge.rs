//! FILENAME: persistence/src/merge.rs
//! PURPOSE: Shared merge-mode machinery for the two file dialects.
//! CONTEXT: Both dialects reduce a file to a list of records, each a list
//! of optional text fields aligned with a caller-supplied column list. The
//! four merge modes decide how records map onto table rows: appended,
//! replacing everything, or matched against the table's key fields. A
//! `None` field (or an empty one) leaves the target cell unchanged.

use std::collections::HashMap;

use engine::value::coerce;
use engine::{CellValue, EngineError, Table, ValueKind};

use crate::error::{PersistenceError, PersistenceResult};

/// Placeholder column name marking a field position that is never read
/// or written.
pub(crate) const SKIP_COLUMN: &str = "$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MergeMode {
    Append,
    Replace,
    KeyedUpdate,
    KeyedUpsert,
}

/// One parsed record: fields aligned with the column list, `None` where
/// the file marked the field as skipped.
pub(crate) type Record = Vec<Option<String>>;

/// Applies parsed records to the table under the given merge mode.
/// `defaults` are `(column, value)` pairs written into every row this
/// call creates, before the record's own fields. Returns the number of
/// rows created or updated.
pub(crate) fn apply_records(
    table: &mut Table,
    columns: &[&str],
    records: Vec<Record>,
    mode: MergeMode,
    defaults: &[(String, String)],
) -> PersistenceResult<usize> {
    for name in columns {
        if *name != SKIP_COLUMN && table.find_column(name).is_none() {
            return Err(EngineError::UnknownColumn(name.to_string()).into());
        }
    }
    for (name, _) in defaults {
        if table.find_column(name).is_none() {
            return Err(EngineError::UnknownColumn(name.clone()).into());
        }
    }

    if mode == MergeMode::Replace {
        table.clear_selection();
        table.delete_rows()?;
    }

    let keyed = matches!(mode, MergeMode::KeyedUpdate | MergeMode::KeyedUpsert);
    let key_positions = if keyed {
        Some(key_positions(table, columns)?)
    } else {
        None
    };
    let mut by_key = if keyed {
        index_rows_by_key(table)?
    } else {
        HashMap::new()
    };

    let mut touched = 0;
    for record in records {
        let row = match (&key_positions, mode) {
            (None, _) => {
                let row = table.add_row();
                write_defaults(table, row, defaults)?;
                row
            }
            (Some(positions), _) => {
                let key = record_key(table, positions, &record)?;
                match by_key.get(&key) {
                    Some(&row) => row,
                    None if mode == MergeMode::KeyedUpsert => {
                        let row = table.add_row();
                        write_defaults(table, row, defaults)?;
                        by_key.insert(key, row);
                        row
                    }
                    // KeyedUpdate ignores records without a matching row.
                    None => continue,
                }
            }
        };

        for (name, field) in columns.iter().zip(record.iter()) {
            if *name == SKIP_COLUMN {
                continue;
            }
            if let Some(text) = field {
                if !text.is_empty() {
                    table.set(row, *name, CellValue::Str(text.clone()), ValueKind::NotScaled)?;
                }
            }
        }
        touched += 1;
    }
    Ok(touched)
}

/// Parses a `name=value[,name=value]` defaults string.
pub(crate) fn parse_defaults(defaults: &str) -> PersistenceResult<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for piece in defaults.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        match piece.split_once('=') {
            Some((name, value)) => pairs.push((name.trim().to_string(), value.trim().to_string())),
            None => {
                return Err(PersistenceError::InvalidFormat(format!(
                    "Malformed default '{}' (expected name=value)",
                    piece
                )))
            }
        }
    }
    Ok(pairs)
}

fn write_defaults(
    table: &mut Table,
    row: usize,
    defaults: &[(String, String)],
) -> PersistenceResult<()> {
    for (name, value) in defaults {
        table.set(
            row,
            name.as_str(),
            CellValue::Str(value.clone()),
            ValueKind::NotScaled,
        )?;
    }
    Ok(())
}

/// Position of every key field within the column list. Keyed modes
/// require the table to define keys, and every key to be present in the
/// file's column list.
fn key_positions(table: &Table, columns: &[&str]) -> PersistenceResult<Vec<(usize, String)>> {
    if table.keys().is_empty() {
        return Err(PersistenceError::InvalidFormat(format!(
            "Table '{}' has no key fields; keyed merge modes need them",
            table.name()
        )));
    }
    let mut positions = Vec::new();
    for key in table.keys() {
        match columns.iter().position(|c| *c == key.as_str()) {
            Some(pos) => positions.push((pos, key.clone())),
            None => {
                return Err(PersistenceError::InvalidFormat(format!(
                    "Key field '{}' is not in the column list",
                    key
                )))
            }
        }
    }
    Ok(positions)
}

/// Maps each existing row's key to its id. Later duplicates win, matching
/// last-write semantics of keyed import.
fn index_rows_by_key(table: &Table) -> PersistenceResult<HashMap<String, usize>> {
    let mut map = HashMap::new();
    for row in 0..table.full_size() {
        let mut parts = Vec::with_capacity(table.keys().len());
        for key in table.keys() {
            parts.push(table.get(row, key.as_str(), ValueKind::NotScaled)?.display());
        }
        map.insert(parts.join("\u{1f}"), row);
    }
    Ok(map)
}

/// Builds the normalized key of one record: each key field is coerced to
/// its column kind first, so `10.0` and `10` in an integer key compare
/// equal.
fn record_key(
    table: &Table,
    positions: &[(usize, String)],
    record: &Record,
) -> PersistenceResult<String> {
    let mut parts = Vec::with_capacity(positions.len());
    for (pos, name) in positions {
        let text = record
            .get(*pos)
            .and_then(|f| f.as_deref())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                PersistenceError::InvalidFormat(format!("Record is missing key field '{}'", name))
            })?;
        let kind = table.column(name.as_str())?.kind();
        let value = coerce(CellValue::Str(text.to_string()), kind)?;
        parts.push(value.display());
    }
    Ok(parts.join("\u{1f}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine::ColumnKind;

    fn keyed_table() -> Table {
        let mut t = Table::new("node");
        t.add_column("ny", ColumnKind::Int).unwrap();
        t.add_column("pn", ColumnKind::Real).unwrap();
        t.set_keys(vec!["ny".to_string()]);
        for i in 0..2 {
            let row = t.add_row();
            t.set(row, "ny", CellValue::Int(i + 1), ValueKind::NotScaled).unwrap();
            t.set(row, "pn", CellValue::Real(5.0), ValueKind::NotScaled).unwrap();
        }
        t
    }

    fn record(fields: &[&str]) -> Record {
        fields.iter().map(|f| Some(f.to_string())).collect()
    }

    #[test]
    fn keyed_update_ignores_unmatched_records() {
        let mut t = keyed_table();
        let touched = apply_records(
            &mut t,
            &["ny", "pn"],
            vec![record(&["2", "42"]), record(&["9", "99"])],
            MergeMode::KeyedUpdate,
            &[],
        )
        .unwrap();

        assert_eq!(touched, 1);
        assert_eq!(t.full_size(), 2);
        assert_eq!(t.get(1, "pn", ValueKind::NotScaled).unwrap(), CellValue::Real(42.0));
    }

    #[test]
    fn keyed_upsert_inserts_unmatched_records() {
        let mut t = keyed_table();
        apply_records(
            &mut t,
            &["ny", "pn"],
            vec![record(&["9", "99"])],
            MergeMode::KeyedUpsert,
            &[],
        )
        .unwrap();

        assert_eq!(t.full_size(), 3);
        assert_eq!(t.get(2, "ny", ValueKind::NotScaled).unwrap(), CellValue::Int(9));
    }

    #[test]
    fn key_normalization_matches_across_spellings() {
        let mut t = keyed_table();
        // "2.0" in an integer key must match the stored 2.
        apply_records(
            &mut t,
            &["ny", "pn"],
            vec![record(&["2.0", "7"])],
            MergeMode::KeyedUpdate,
            &[],
        )
        .unwrap();
        assert_eq!(t.get(1, "pn", ValueKind::NotScaled).unwrap(), CellValue::Real(7.0));
    }

    #[test]
    fn keyed_mode_without_keys_is_rejected() {
        let mut t = Table::new("raw");
        t.add_column("a", ColumnKind::Int).unwrap();
        let err = apply_records(&mut t, &["a"], vec![], MergeMode::KeyedUpdate, &[]).unwrap_err();
        assert!(matches!(err, PersistenceError::InvalidFormat(_)));
    }

    #[test]
    fn defaults_apply_only_to_created_rows() {
        let mut t = keyed_table();
        let defaults = parse_defaults("pn=111").unwrap();
        apply_records(
            &mut t,
            &["ny"],
            vec![record(&["1"]), record(&["9"])],
            MergeMode::KeyedUpsert,
            &defaults,
        )
        .unwrap();

        // Existing row keeps its value; the inserted row got the default.
        assert_eq!(t.get(0, "pn", ValueKind::NotScaled).unwrap(), CellValue::Real(5.0));
        assert_eq!(t.get(2, "pn", ValueKind::NotScaled).unwrap(), CellValue::Real(111.0));
    }

    #[test]
    fn malformed_defaults_fail_fast() {
        assert!(parse_defaults("pn=1,broken").is_err());
        assert!(parse_defaults("").unwrap().is_empty());
    }

    #[test]
    fn unknown_column_in_list_is_rejected() {
        let mut t = keyed_table();
        let err = apply_records(&mut t, &["nosuch"], vec![], MergeMode::Append, &[]).unwrap_err();
        assert!(matches!(
            err,
            PersistenceError::Engine(EngineError::UnknownColumn(_))
        ));
    }
}
