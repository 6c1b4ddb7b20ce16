//! FILENAME: persistence/src/store.rs
//! PURPOSE: Whole-workspace save/load in the JSON document format.
//! CONTEXT: A workspace file is a JSON document of table snapshots: name,
//! description, template, keys, column definitions with their descriptive
//! properties, and row data. Template files are the same document with
//! zero rows, used to create table structure without data. Loading merges
//! row data under the same four modes as the file dialects.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use engine::value::coerce;
use engine::{
    CellValue, ColumnKind, ColumnProperty, PropertyValue, Table, ValueKind, Workspace,
};

use crate::error::{PersistenceError, PersistenceResult};

/// Row-merge behavior of `load_workspace`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Append all rows, no key check.
    Append,
    /// Drop existing rows of each loaded table first.
    Replace,
    /// Match rows on key fields; ignore unmatched file rows.
    KeyedUpdate,
    /// Match on key fields; insert unmatched file rows.
    KeyedUpsert,
}

// ============================================================================
// DOCUMENT SCHEMA
// ============================================================================

#[derive(Serialize, Deserialize)]
struct WorkspaceDoc {
    tables: Vec<TableDoc>,
}

#[derive(Serialize, Deserialize)]
struct TableDoc {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    template: String,
    #[serde(default)]
    keys: Vec<String>,
    columns: Vec<ColumnDoc>,
    #[serde(default)]
    rows: Vec<Vec<CellValue>>,
}

#[derive(Serialize, Deserialize)]
struct ColumnDoc {
    name: String,
    kind: ColumnKind,
    /// Descriptive properties by code, JSON-typed per property.
    #[serde(default)]
    properties: HashMap<String, JsonValue>,
}

// ============================================================================
// SAVE
// ============================================================================

/// Writes the workspace to `path`. With `template = Some(name)` only the
/// tables belonging to that template are written; `None` writes all.
pub fn save_workspace(
    ws: &Workspace,
    path: &Path,
    template: Option<&str>,
) -> PersistenceResult<()> {
    let mut tables = Vec::new();
    for table in ws.tables.iter() {
        if let Some(wanted) = template {
            if table.template() != wanted {
                continue;
            }
        }
        tables.push(snapshot(table)?);
    }
    let doc = WorkspaceDoc { tables };
    let json = serde_json::to_string_pretty(&doc)?;
    fs::write(path, json)?;
    Ok(())
}

fn snapshot(table: &Table) -> PersistenceResult<TableDoc> {
    let mut columns = Vec::new();
    for column in table.iter_columns() {
        let mut properties = HashMap::new();
        for property in ColumnProperty::ALL {
            if property == ColumnProperty::Name {
                continue;
            }
            properties.insert(
                property.code().to_string(),
                property_to_json(column.property(property)),
            );
        }
        columns.push(ColumnDoc {
            name: column.name().to_string(),
            kind: column.kind(),
            properties,
        });
    }

    let mut rows = Vec::with_capacity(table.full_size());
    for row in 0..table.full_size() {
        let mut cells = Vec::with_capacity(columns.len());
        for column in table.iter_columns() {
            cells.push(column.value(row, ValueKind::NotScaled)?);
        }
        rows.push(cells);
    }

    Ok(TableDoc {
        name: table.name().to_string(),
        description: table.description().to_string(),
        template: table.template().to_string(),
        keys: table.keys().to_vec(),
        columns,
        rows,
    })
}

// ============================================================================
// LOAD
// ============================================================================

/// Loads `path` into the workspace. Tables and columns the document names
/// are created when absent; row data merges per `mode`. With
/// `template = Some(name)` only document tables belonging to that
/// template are considered.
pub fn load_workspace(
    ws: &mut Workspace,
    path: &Path,
    mode: LoadMode,
    template: Option<&str>,
) -> PersistenceResult<()> {
    let doc = read_doc(path)?;
    for table_doc in &doc.tables {
        if let Some(wanted) = template {
            if table_doc.template != wanted {
                continue;
            }
        }
        let table = ensure_structure(ws, table_doc)?;
        load_rows(table, table_doc, mode)?;
    }
    Ok(())
}

/// Creates or clears the table structure a template file implies, without
/// loading any row data.
pub fn new_from_template(ws: &mut Workspace, path: &Path) -> PersistenceResult<()> {
    let doc = read_doc(path)?;
    for table_doc in &doc.tables {
        let table = ensure_structure(ws, table_doc)?;
        table.clear_selection();
        table.delete_rows()?;
    }
    Ok(())
}

fn read_doc(path: &Path) -> PersistenceResult<WorkspaceDoc> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Makes the workspace contain a table matching the document's structure:
/// missing tables and columns are created, keys and descriptive
/// properties are applied. Existing columns keep their kind.
fn ensure_structure<'a>(
    ws: &'a mut Workspace,
    doc: &TableDoc,
) -> PersistenceResult<&'a mut Table> {
    if !ws.tables.contains(&doc.name) {
        ws.tables.add(doc.name.clone())?;
    }
    let table = ws.tables.get_mut(doc.name.as_str())?;
    table.set_description(doc.description.clone());
    table.set_template(doc.template.clone());
    table.set_keys(doc.keys.clone());

    for column_doc in &doc.columns {
        if table.find_column(&column_doc.name).is_none() {
            table.add_column(column_doc.name.clone(), column_doc.kind)?;
        }
        let column = table.column_mut(column_doc.name.as_str())?;
        for (code, json) in &column_doc.properties {
            let property = ColumnProperty::from_code(code)?;
            column.set_property(property, json_to_property(property, json)?)?;
        }
    }
    Ok(table)
}

fn load_rows(table: &mut Table, doc: &TableDoc, mode: LoadMode) -> PersistenceResult<()> {
    if mode == LoadMode::Replace {
        table.clear_selection();
        table.delete_rows()?;
    }

    let keyed = matches!(mode, LoadMode::KeyedUpdate | LoadMode::KeyedUpsert);
    let mut by_key: HashMap<String, usize> = HashMap::new();
    if keyed {
        if table.keys().is_empty() {
            return Err(PersistenceError::InvalidFormat(format!(
                "Table '{}' has no key fields; keyed load modes need them",
                table.name()
            )));
        }
        for row in 0..table.full_size() {
            by_key.insert(row_key(table, row)?, row);
        }
    }

    let column_names: Vec<String> = doc.columns.iter().map(|c| c.name.clone()).collect();
    for cells in &doc.rows {
        if cells.len() != column_names.len() {
            return Err(PersistenceError::InvalidFormat(format!(
                "Row of {} cells does not match {} columns in table '{}'",
                cells.len(),
                column_names.len(),
                doc.name
            )));
        }
        let row = if keyed {
            let key = doc_row_key(table, &column_names, cells)?;
            match by_key.get(&key) {
                Some(&row) => row,
                None if mode == LoadMode::KeyedUpsert => {
                    let row = table.add_row();
                    by_key.insert(key, row);
                    row
                }
                None => continue,
            }
        } else {
            table.add_row()
        };
        for (name, cell) in column_names.iter().zip(cells.iter()) {
            table.set(row, name.as_str(), cell.clone(), ValueKind::NotScaled)?;
        }
    }
    Ok(())
}

fn row_key(table: &Table, row: usize) -> PersistenceResult<String> {
    let mut parts = Vec::with_capacity(table.keys().len());
    for key in table.keys() {
        parts.push(table.get(row, key.as_str(), ValueKind::NotScaled)?.display());
    }
    Ok(parts.join("\u{1f}"))
}

fn doc_row_key(
    table: &Table,
    column_names: &[String],
    cells: &[CellValue],
) -> PersistenceResult<String> {
    let mut parts = Vec::with_capacity(table.keys().len());
    for key in table.keys() {
        let pos = column_names.iter().position(|c| c == key).ok_or_else(|| {
            PersistenceError::InvalidFormat(format!("Key field '{}' is not in the document", key))
        })?;
        let kind = table.column(key.as_str())?.kind();
        parts.push(coerce(cells[pos].clone(), kind)?.display());
    }
    Ok(parts.join("\u{1f}"))
}

// ============================================================================
// PROPERTY <-> JSON
// ============================================================================

fn property_to_json(value: PropertyValue) -> JsonValue {
    match value {
        PropertyValue::Int(i) => JsonValue::from(i),
        PropertyValue::Real(r) => JsonValue::from(r),
        PropertyValue::Str(s) => JsonValue::from(s),
        PropertyValue::Bool(b) => JsonValue::from(b),
    }
}

fn json_to_property(property: ColumnProperty, json: &JsonValue) -> PersistenceResult<PropertyValue> {
    let value = match json {
        JsonValue::Bool(b) => PropertyValue::Bool(*b),
        JsonValue::String(s) => PropertyValue::Str(s.clone()),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => PropertyValue::Int(i),
            None => PropertyValue::Real(n.as_f64().unwrap_or(0.0)),
        },
        other => {
            return Err(PersistenceError::InvalidFormat(format!(
                "Property '{}' holds unsupported JSON value {}",
                property.code(),
                other
            )))
        }
    };
    Ok(value)
}

// ============================================================================
// TEMPLATE DIRECTORY SHIM
// ============================================================================

/// The user-profile-relative template directory of the original desktop
/// installation layout.
#[deprecated(note = "compatibility shim; pass explicit template paths instead")]
pub fn template_dir() -> PathBuf {
    let home = std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_default();
    home.join("Documents").join("RastrWin3").join("SHABLON")
}

/// Resolves a template file name against the deprecated template
/// directory. Fails with `TemplateNotFound` when the file is absent.
#[deprecated(note = "compatibility shim; pass explicit template paths instead")]
pub fn resolve_template(name: &str) -> PersistenceResult<PathBuf> {
    #[allow(deprecated)]
    let path = template_dir().join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(PersistenceError::TemplateNotFound(name.to_string()))
    }
}
