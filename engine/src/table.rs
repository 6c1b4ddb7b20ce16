//! FILENAME: engine/src/table.rs
//! PURPOSE: An ordered collection of rows and a named collection of columns.
//! CONTEXT: This is the central data structure of the engine. Row ids are
//! dense integers in [0, full_size); the selection is a derived view over
//! them. Structural edits keep every column's data vector aligned and emit
//! the matching change event. Lookups dispatch on an explicit tagged union
//! (`ColumnRef`) instead of argument runtime types.

use crate::column::Column;
use crate::error::{EngineError, EngineResult};
use crate::evaluator::{self, ColumnLookup};
use crate::events::{ChangeScope, EventHub};
use crate::selection::{self, Selection};
use crate::value::{coerce, CellValue, ColumnKind, ValueKind};

/// Column addressing: by unique name or by position in native order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    ByName(String),
    ByIndex(usize),
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        ColumnRef::ByName(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        ColumnRef::ByName(name)
    }
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        ColumnRef::ByIndex(index)
    }
}

/// A table in the workspace. Owns its columns exclusively; obtained
/// through the table collection.
#[derive(Clone)]
pub struct Table {
    name: String,
    description: String,
    template: String,
    /// Ordered column names forming the merge key for keyed import.
    keys: Vec<String>,
    columns: Vec<Column>,
    /// Full row count. Every column's data vector has exactly this length.
    size: usize,
    selection: Selection,
    events: EventHub,
}

impl Table {
    /// Creates a standalone table with its own event hub. Tables that
    /// belong to a workspace are created through the collection instead,
    /// sharing the workspace hub.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_events(name, EventHub::new())
    }

    pub(crate) fn with_events(name: impl Into<String>, events: EventHub) -> Self {
        Table {
            name: name.into(),
            description: String::new(),
            template: String::new(),
            keys: Vec::new(),
            columns: Vec::new(),
            size: 0,
            selection: Selection::new(),
            events,
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        for column in &mut self.columns {
            column.set_table_name(&self.name);
        }
        self.events
            .data_changed(ChangeScope::Table, &self.name, "", None);
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn set_template(&mut self, template: impl Into<String>) {
        self.template = template.into();
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn set_keys(&mut self, keys: Vec<String>) {
        self.keys = keys;
    }

    /// Key fields as a single comma-delimited string, the boundary form.
    pub fn keys_string(&self) -> String {
        self.keys.join(",")
    }

    pub fn set_keys_string(&mut self, keys: &str) {
        self.keys = keys
            .split(',')
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
    }

    /// Number of rows in the table, selected or not.
    pub fn full_size(&self) -> usize {
        self.size
    }

    /// Number of rows matching the current selection.
    pub fn count(&self) -> usize {
        if !self.selection.is_restricted() {
            return self.size;
        }
        (0..self.size).filter(|&row| self.matches(row)).count()
    }

    // ------------------------------------------------------------------
    // Columns
    // ------------------------------------------------------------------

    /// Appends a column of the given kind, filled with default values for
    /// every existing row. Column names are unique within a table.
    pub fn add_column(
        &mut self,
        name: impl Into<String>,
        kind: ColumnKind,
    ) -> EngineResult<&mut Column> {
        let name = name.into();
        if self.find_column(&name).is_some() {
            return Err(EngineError::DuplicateName(name));
        }
        let mut column = Column::new(name, kind, self.name.clone(), self.events.clone());
        for _ in 0..self.size {
            column.push_default();
        }
        self.columns.push(column);
        self.events
            .data_changed(ChangeScope::Table, &self.name, "", None);
        let last = self.columns.len() - 1;
        Ok(&mut self.columns[last])
    }

    /// Renames a column, enforcing name uniqueness. Key-field references
    /// to the old name follow the rename.
    pub fn rename_column(
        &mut self,
        column: impl Into<ColumnRef>,
        new_name: impl Into<String>,
    ) -> EngineResult<()> {
        let index = self.resolve_column(&column.into())?;
        let new_name = new_name.into();
        let old_name = self.columns[index].name().to_string();
        if new_name == old_name {
            return Ok(());
        }
        if self.find_column(&new_name).is_some() {
            return Err(EngineError::DuplicateName(new_name));
        }
        self.columns[index].set_name(&new_name);
        for key in &mut self.keys {
            if *key == old_name {
                *key = new_name.clone();
            }
        }
        self.events
            .data_changed(ChangeScope::Table, &self.name, "", None);
        Ok(())
    }

    pub fn remove_column(&mut self, column: impl Into<ColumnRef>) -> EngineResult<()> {
        let index = self.resolve_column(&column.into())?;
        self.columns.remove(index);
        self.events
            .data_changed(ChangeScope::Table, &self.name, "", None);
        Ok(())
    }

    /// Position of the named column, if present.
    pub fn find_column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, column: impl Into<ColumnRef>) -> EngineResult<&Column> {
        let index = self.resolve_column(&column.into())?;
        Ok(&self.columns[index])
    }

    pub fn column_mut(&mut self, column: impl Into<ColumnRef>) -> EngineResult<&mut Column> {
        let index = self.resolve_column(&column.into())?;
        Ok(&mut self.columns[index])
    }

    /// Columns in native order.
    pub fn iter_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    fn resolve_column(&self, column: &ColumnRef) -> EngineResult<usize> {
        match column {
            ColumnRef::ByName(name) => self
                .find_column(name)
                .ok_or_else(|| EngineError::UnknownColumn(name.clone())),
            ColumnRef::ByIndex(index) => {
                if *index < self.columns.len() {
                    Ok(*index)
                } else {
                    Err(EngineError::UnknownColumn(format!("#{}", index)))
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Cell access
    // ------------------------------------------------------------------

    pub fn get(
        &self,
        row: usize,
        column: impl Into<ColumnRef>,
        kind: ValueKind,
    ) -> EngineResult<CellValue> {
        self.column(column)?.value(row, kind)
    }

    pub fn set(
        &mut self,
        row: usize,
        column: impl Into<ColumnRef>,
        value: CellValue,
        kind: ValueKind,
    ) -> EngineResult<()> {
        self.column_mut(column)?.set_value(row, value, kind)
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    /// Appends an empty row and returns its id (`full_size - 1`).
    pub fn add_row(&mut self) -> usize {
        for column in &mut self.columns {
            column.push_default();
        }
        self.size += 1;
        let row = self.size - 1;
        self.events
            .data_changed(ChangeScope::RowAdded, &self.name, "", Some(row));
        row
    }

    /// Inserts an empty row before `row`. The new row occupies id `row`;
    /// the return value is `row - 1`, preserving the legacy convention of
    /// the RastrWin automation interface (see DESIGN.md).
    pub fn insert_row(&mut self, row: usize) -> EngineResult<i64> {
        self.check_row(row)?;
        for column in &mut self.columns {
            column.insert_default(row);
        }
        self.size += 1;
        self.events
            .data_changed(ChangeScope::RowInserted, &self.name, "", Some(row));
        Ok(row as i64 - 1)
    }

    /// Clones `row`; the copy lands at `row + 1`, which is returned.
    pub fn duplicate_row(&mut self, row: usize) -> EngineResult<usize> {
        self.check_row(row)?;
        for column in &mut self.columns {
            column.duplicate_row(row);
        }
        self.size += 1;
        self.events
            .data_changed(ChangeScope::RowInserted, &self.name, "", Some(row + 1));
        Ok(row + 1)
    }

    pub fn delete_row(&mut self, row: usize) -> EngineResult<()> {
        self.check_row(row)?;
        for column in &mut self.columns {
            column.remove_row(row);
        }
        self.size -= 1;
        self.events
            .data_changed(ChangeScope::RowDeleted, &self.name, "", Some(row));
        Ok(())
    }

    /// Deletes every row in the current selection, highest id first so
    /// pending ids stay valid. Returns the number of rows removed.
    pub fn delete_rows(&mut self) -> EngineResult<usize> {
        let selected: Vec<usize> = self.iter_rows().collect();
        for &row in selected.iter().rev() {
            for column in &mut self.columns {
                column.remove_row(row);
            }
            self.size -= 1;
        }
        if !selected.is_empty() {
            self.events
                .data_changed(ChangeScope::All, &self.name, "", None);
        }
        Ok(selected.len())
    }

    pub fn swap_rows(&mut self, i: usize, j: usize) -> EngineResult<()> {
        self.check_row(i)?;
        self.check_row(j)?;
        if i != j {
            for column in &mut self.columns {
                column.swap_rows(i, j);
            }
            self.events
                .data_changed(ChangeScope::Row, &self.name, "", Some(i));
            self.events
                .data_changed(ChangeScope::Row, &self.name, "", Some(j));
        }
        Ok(())
    }

    fn check_row(&self, row: usize) -> EngineResult<()> {
        if row < self.size {
            Ok(())
        } else {
            Err(EngineError::IndexOutOfRange {
                index: row,
                size: self.size,
            })
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Compiles and applies a selection predicate; returns the count of
    /// matching rows. An empty predicate clears the selection. The
    /// predicate is validated against every row up front, so unknown
    /// columns and type errors surface here rather than during iteration.
    pub fn set_selection(&mut self, predicate: &str) -> EngineResult<usize> {
        if predicate.trim().is_empty() {
            return Ok(self.clear_selection());
        }
        let expr = parser::parse(predicate)?;
        let mut count = 0;
        for row in 0..self.size {
            if evaluator::evaluate_predicate(&expr, &RowView { table: self, row })? {
                count += 1;
            }
        }
        self.selection.set(predicate)?;
        Ok(count)
    }

    /// Removes any selection; returns the full row count.
    pub fn clear_selection(&mut self) -> usize {
        self.selection.clear();
        self.size
    }

    /// The installed predicate string, or None when unrestricted.
    pub fn selection(&self) -> Option<&str> {
        self.selection.source()
    }

    /// Membership test for the current selection. Trivially true when
    /// unrestricted. Evaluation errors propagate.
    pub fn check_row_selection(&self, row: usize) -> EngineResult<bool> {
        self.check_row(row)?;
        match self.selection.expression() {
            None => Ok(true),
            Some(expr) => evaluator::evaluate_predicate(expr, &RowView { table: self, row }),
        }
    }

    /// The smallest selected row id strictly greater than `after`, or
    /// None when the selection is exhausted. `after = None` starts from
    /// the beginning. Rows that no longer evaluate against the predicate
    /// (after structural changes) are skipped.
    pub fn find_next_row(&self, after: Option<usize>) -> Option<usize> {
        let start = match after {
            Some(row) => row + 1,
            None => 0,
        };
        (start..self.size).find(|&row| self.matches(row))
    }

    /// Forward iterator over selected row ids, driven by `find_next_row`.
    /// Lazy and finite; not stable across concurrent row insertion or
    /// deletion.
    pub fn iter_rows(&self) -> SelectedRows<'_> {
        SelectedRows {
            table: self,
            last: None,
            done: false,
        }
    }

    /// Predicate string that uniquely re-identifies `row` by the table's
    /// key-field values (all columns when no keys are defined).
    pub fn row_predicate(&self, row: usize) -> EngineResult<String> {
        self.check_row(row)?;
        let names: Vec<&str> = if self.keys.is_empty() {
            self.columns.iter().map(|c| c.name()).collect()
        } else {
            self.keys.iter().map(|k| k.as_str()).collect()
        };
        let mut pairs = Vec::with_capacity(names.len());
        for name in names {
            let value = self.column(name)?.value(row, ValueKind::NotScaled)?;
            pairs.push((name.to_string(), value));
        }
        Ok(selection::row_predicate(&pairs))
    }

    fn matches(&self, row: usize) -> bool {
        match self.selection.expression() {
            None => true,
            Some(expr) => {
                evaluator::evaluate_predicate(expr, &RowView { table: self, row }).unwrap_or(false)
            }
        }
    }

    // ------------------------------------------------------------------
    // Group correction
    // ------------------------------------------------------------------

    /// Evaluates `formula` against every row in the current selection and
    /// writes the results into the target column, coerced to its kind.
    /// All rows are evaluated before anything is written, so a failing
    /// formula leaves the column untouched. Returns the number of rows
    /// written.
    pub fn calc_column(
        &mut self,
        column: impl Into<ColumnRef>,
        formula: &str,
    ) -> EngineResult<usize> {
        let index = self.resolve_column(&column.into())?;
        let kind = self.columns[index].kind();
        let expr = parser::parse(formula)?;

        let mut results: Vec<(usize, CellValue)> = Vec::new();
        for row in self.iter_rows() {
            let value = evaluator::evaluate(&expr, &RowView { table: self, row })?;
            results.push((row, coerce(value.to_cell_value(), kind)?));
        }

        let written = results.len();
        let column_name = self.columns[index].name().to_string();
        for (row, value) in results {
            self.columns[index].set_raw(row, value);
        }
        if written > 0 {
            self.events
                .data_changed(ChangeScope::Column, &self.name, &column_name, None);
        }
        Ok(written)
    }
}

/// Binds one row of a table for expression evaluation.
struct RowView<'a> {
    table: &'a Table,
    row: usize,
}

impl ColumnLookup for RowView<'_> {
    fn lookup(&self, name: &str) -> Option<CellValue> {
        let index = self.table.find_column(name)?;
        self.table.columns[index].raw(self.row).ok().cloned()
    }
}

/// Iterator over the row ids of the current selection, in strictly
/// increasing order.
pub struct SelectedRows<'a> {
    table: &'a Table,
    last: Option<usize>,
    done: bool,
}

impl Iterator for SelectedRows<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.done {
            return None;
        }
        match self.table.find_next_row(self.last) {
            Some(row) => {
                self.last = Some(row);
                Some(row)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
