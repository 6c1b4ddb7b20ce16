//! FILENAME: persistence/src/cdu.rs
//! PURPOSE: The fixed-layout file dialect.
//! CONTEXT: Each record is one line: a 4-character type code, one
//! 4-character field, then any number of 8-character fields. Contents are
//! right-aligned on write and trimmed on read; `$` fills a field that
//! carries no value. Files may interleave records of several type codes;
//! a read consumes only the requested code and skips the rest.

use std::fs;
use std::io::Write;
use std::path::Path;

use engine::{Table, ValueKind};

use crate::error::{PersistenceError, PersistenceResult};
use crate::merge::{self, MergeMode, Record, SKIP_COLUMN};

const TYPE_WIDTH: usize = 4;
const FIRST_WIDTH: usize = 4;
const FIELD_WIDTH: usize = 8;

/// Merge modes of the fixed-layout dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CduMode {
    Append,
    Replace,
    KeyedUpdate,
    KeyedUpsert,
}

impl CduMode {
    fn merge(self) -> MergeMode {
        match self {
            CduMode::Append => MergeMode::Append,
            CduMode::Replace => MergeMode::Replace,
            CduMode::KeyedUpdate => MergeMode::KeyedUpdate,
            CduMode::KeyedUpsert => MergeMode::KeyedUpsert,
        }
    }
}

/// Writes the selected rows of `table` under the given record type code.
/// The first column lands in the 4-character field, the rest in
/// 8-character fields; a `$` column name writes a skipped field. Returns
/// the number of records written.
pub fn write_cdu(
    table: &Table,
    path: &Path,
    type_code: &str,
    columns: &[&str],
) -> PersistenceResult<usize> {
    let code = fit(type_code, TYPE_WIDTH)?;
    let mut file = fs::File::create(path)?;

    let mut written = 0;
    for row in table.iter_rows() {
        let mut line = code.clone();
        for (i, name) in columns.iter().enumerate() {
            let width = if i == 0 { FIRST_WIDTH } else { FIELD_WIDTH };
            let text = if *name == SKIP_COLUMN {
                SKIP_COLUMN.to_string()
            } else {
                table.get(row, *name, ValueKind::NotScaled)?.display()
            };
            line.push_str(&fit(&text, width)?);
        }
        writeln!(file, "{}", line)?;
        written += 1;
    }
    Ok(written)
}

/// Reads the records of `path` whose type code equals `type_code`,
/// merging them into `table`. Fields holding `$` (or nothing) leave the
/// target cell unchanged. Returns the number of rows created or updated.
pub fn read_cdu(
    table: &mut Table,
    path: &Path,
    type_code: &str,
    columns: &[&str],
    mode: CduMode,
) -> PersistenceResult<usize> {
    let wanted = type_code.trim();
    let text = fs::read_to_string(path)?;

    let mut records: Vec<Record> = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            continue;
        }
        if line.chars().count() < TYPE_WIDTH {
            return Err(PersistenceError::InvalidFormat(format!(
                "Record shorter than the {}-character type code: '{}'",
                TYPE_WIDTH, line
            )));
        }
        let (code, rest) = split_at_chars(line, TYPE_WIDTH);
        if code.trim() != wanted {
            continue;
        }
        records.push(parse_fields(&rest, columns.len()));
    }

    merge::apply_records(table, columns, records, mode.merge(), &[])
}

/// Splits `rest` into the 4-character first field and 8-character tail
/// fields, trimming each. `$` and blank fields become `None`; fields
/// beyond `expected` are ignored, missing trailing fields stay `None`.
fn parse_fields(rest: &str, expected: usize) -> Record {
    let mut record: Record = Vec::with_capacity(expected);
    let mut remaining = rest.to_string();
    for i in 0..expected {
        let width = if i == 0 { FIRST_WIDTH } else { FIELD_WIDTH };
        let (field, tail) = split_at_chars(&remaining, width);
        remaining = tail;
        let trimmed = field.trim();
        if trimmed.is_empty() || trimmed == SKIP_COLUMN {
            record.push(None);
        } else {
            record.push(Some(trimmed.to_string()));
        }
    }
    record
}

/// Right-aligns `text` in a field of `width` characters. Overflow is an
/// error rather than silent truncation.
fn fit(text: &str, width: usize) -> PersistenceResult<String> {
    let len = text.chars().count();
    if len > width {
        return Err(PersistenceError::InvalidFormat(format!(
            "Value '{}' does not fit in a {}-character field",
            text, width
        )));
    }
    Ok(format!("{:>width$}", text, width = width))
}

/// Char-boundary split: first `count` characters and the rest.
fn split_at_chars(text: &str, count: usize) -> (String, String) {
    let head: String = text.chars().take(count).collect();
    let tail: String = text.chars().skip(count).collect();
    (head, tail)
}
