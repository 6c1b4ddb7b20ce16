//! FILENAME: engine/src/column.rs
//! PURPOSE: A typed data field within a table.
//! CONTEXT: A column owns one dense vector of cell values, aligned with the
//! owning table's row ids, plus a bag of descriptive properties (width,
//! precision, formula, bounds, ...). Value access goes through the codec in
//! `value.rs`; every successful mutation emits a cell-scope change event
//! unless the hub is locked.

use crate::error::{EngineError, EngineResult};
use crate::events::{ChangeScope, EventHub};
use crate::value::{
    coerce, format_scaled, scale_value, unscale_value, CellValue, ColumnKind, ValueKind,
};

// ============================================================================
// PROPERTIES
// ============================================================================

/// The fixed set of descriptive column properties. Anything outside this
/// set fails with `InvalidArgument` at the string boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnProperty {
    Name,
    Tooltip,
    Width,
    Precision,
    Header,
    Formula,
    AutoFormula,
    CrossRef,
    NameRef,
    Description,
    Min,
    Max,
    Mask,
}

impl ColumnProperty {
    /// All 13 recognized properties, in engine order.
    pub const ALL: [ColumnProperty; 13] = [
        ColumnProperty::Name,
        ColumnProperty::Tooltip,
        ColumnProperty::Width,
        ColumnProperty::Precision,
        ColumnProperty::Header,
        ColumnProperty::Formula,
        ColumnProperty::AutoFormula,
        ColumnProperty::CrossRef,
        ColumnProperty::NameRef,
        ColumnProperty::Description,
        ColumnProperty::Min,
        ColumnProperty::Max,
        ColumnProperty::Mask,
    ];

    /// Resolves a property code string. Unrecognized codes fail fast.
    pub fn from_code(code: &str) -> EngineResult<Self> {
        match code {
            "name" => Ok(ColumnProperty::Name),
            "tooltip" => Ok(ColumnProperty::Tooltip),
            "width" => Ok(ColumnProperty::Width),
            "precision" => Ok(ColumnProperty::Precision),
            "header" => Ok(ColumnProperty::Header),
            "formula" => Ok(ColumnProperty::Formula),
            "auto_formula" => Ok(ColumnProperty::AutoFormula),
            "cross_ref" => Ok(ColumnProperty::CrossRef),
            "name_ref" => Ok(ColumnProperty::NameRef),
            "description" => Ok(ColumnProperty::Description),
            "min" => Ok(ColumnProperty::Min),
            "max" => Ok(ColumnProperty::Max),
            "mask" => Ok(ColumnProperty::Mask),
            other => Err(EngineError::InvalidArgument(format!(
                "Unknown column property: {}",
                other
            ))),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ColumnProperty::Name => "name",
            ColumnProperty::Tooltip => "tooltip",
            ColumnProperty::Width => "width",
            ColumnProperty::Precision => "precision",
            ColumnProperty::Header => "header",
            ColumnProperty::Formula => "formula",
            ColumnProperty::AutoFormula => "auto_formula",
            ColumnProperty::CrossRef => "cross_ref",
            ColumnProperty::NameRef => "name_ref",
            ColumnProperty::Description => "description",
            ColumnProperty::Min => "min",
            ColumnProperty::Max => "max",
            ColumnProperty::Mask => "mask",
        }
    }
}

/// The value of one column property.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Int(i64),
    Real(f64),
    Str(String),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            PropertyValue::Real(r) => Some(*r),
            PropertyValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Descriptive properties with engine defaults.
#[derive(Debug, Clone)]
pub(crate) struct ColumnMeta {
    pub tooltip: String,
    pub width: i64,
    pub precision: i64,
    pub header: String,
    pub formula: String,
    pub auto_formula: bool,
    pub cross_ref: bool,
    pub name_ref: String,
    pub description: String,
    pub min: f64,
    pub max: f64,
    pub mask: String,
}

impl Default for ColumnMeta {
    fn default() -> Self {
        ColumnMeta {
            tooltip: String::new(),
            width: 8,
            precision: 2,
            header: String::new(),
            formula: String::new(),
            auto_formula: false,
            cross_ref: false,
            name_ref: String::new(),
            description: String::new(),
            min: 0.0,
            max: 0.0,
            mask: String::new(),
        }
    }
}

// ============================================================================
// COLUMN
// ============================================================================

/// A typed data field. Owned exclusively by its table; obtained through
/// `Table::column` / `Table::column_mut`.
#[derive(Clone)]
pub struct Column {
    name: String,
    kind: ColumnKind,
    meta: ColumnMeta,
    data: Vec<CellValue>,
    /// Owning table name, carried in event payloads.
    table: String,
    events: EventHub,
}

impl Column {
    pub(crate) fn new(
        name: impl Into<String>,
        kind: ColumnKind,
        table: impl Into<String>,
        events: EventHub,
    ) -> Self {
        Column {
            name: name.into(),
            kind,
            meta: ColumnMeta::default(),
            data: Vec::new(),
            table: table.into(),
            events,
        }
    }

    /// Read-only identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ColumnKind {
        self.kind
    }

    // ------------------------------------------------------------------
    // Value access
    // ------------------------------------------------------------------

    /// Reads the cell at `row` in the requested representation.
    pub fn value(&self, row: usize, kind: ValueKind) -> EngineResult<CellValue> {
        let raw = self.raw(row)?;
        Ok(match kind {
            ValueKind::NotScaled => raw.clone(),
            ValueKind::Scaled => scale_value(raw, self.scale_factor()),
            ValueKind::ScaledString => CellValue::Str(format_scaled(
                &scale_value(raw, self.scale_factor()),
                self.precision(),
            )),
        })
    }

    /// Writes the cell at `row`, interpreting `value` per the requested
    /// representation, and emits a cell-scope change event.
    pub fn set_value(&mut self, row: usize, value: CellValue, kind: ValueKind) -> EngineResult<()> {
        self.check_row(row)?;
        let raw = match kind {
            ValueKind::NotScaled => coerce(value, self.kind)?,
            ValueKind::Scaled => coerce(unscale_value(value, self.scale_factor()), self.kind)?,
            ValueKind::ScaledString => {
                let text = match value {
                    CellValue::Str(s) => s,
                    other => other.display(),
                };
                // Numeric text is parsed first so the scale applies to it.
                let parsed = match text.trim().parse::<f64>() {
                    Ok(n) => CellValue::Real(n),
                    Err(_) => CellValue::Str(text),
                };
                coerce(unscale_value(parsed, self.scale_factor()), self.kind)?
            }
        };
        self.data[row] = raw;
        self.events
            .data_changed(ChangeScope::Cell, &self.table, &self.name, Some(row));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Properties
    // ------------------------------------------------------------------

    pub fn property(&self, property: ColumnProperty) -> PropertyValue {
        match property {
            ColumnProperty::Name => PropertyValue::Str(self.name.clone()),
            ColumnProperty::Tooltip => PropertyValue::Str(self.meta.tooltip.clone()),
            ColumnProperty::Width => PropertyValue::Int(self.meta.width),
            ColumnProperty::Precision => PropertyValue::Int(self.meta.precision),
            ColumnProperty::Header => PropertyValue::Str(self.meta.header.clone()),
            ColumnProperty::Formula => PropertyValue::Str(self.meta.formula.clone()),
            ColumnProperty::AutoFormula => PropertyValue::Bool(self.meta.auto_formula),
            ColumnProperty::CrossRef => PropertyValue::Bool(self.meta.cross_ref),
            ColumnProperty::NameRef => PropertyValue::Str(self.meta.name_ref.clone()),
            ColumnProperty::Description => PropertyValue::Str(self.meta.description.clone()),
            ColumnProperty::Min => PropertyValue::Real(self.meta.min),
            ColumnProperty::Max => PropertyValue::Real(self.meta.max),
            ColumnProperty::Mask => PropertyValue::Str(self.meta.mask.clone()),
        }
    }

    /// Sets one property. The value variant must match the property's
    /// type; mismatches fail before any mutation. `Name` only accepts
    /// the current name here: renames go through `Table::rename_column`,
    /// which keeps names unique and key references current.
    pub fn set_property(&mut self, property: ColumnProperty, value: PropertyValue) -> EngineResult<()> {
        match property {
            ColumnProperty::Name => {
                let name = expect_str(property, value)?;
                if name != self.name {
                    return Err(EngineError::InvalidArgument(format!(
                        "Column '{}' cannot be renamed through its name property; \
                         use Table::rename_column",
                        self.name
                    )));
                }
            }
            ColumnProperty::Tooltip => self.meta.tooltip = expect_str(property, value)?,
            ColumnProperty::Width => self.meta.width = expect_int(property, value)?,
            ColumnProperty::Precision => self.meta.precision = expect_int(property, value)?,
            ColumnProperty::Header => self.meta.header = expect_str(property, value)?,
            ColumnProperty::Formula => self.meta.formula = expect_str(property, value)?,
            ColumnProperty::AutoFormula => self.meta.auto_formula = expect_bool(property, value)?,
            ColumnProperty::CrossRef => self.meta.cross_ref = expect_bool(property, value)?,
            ColumnProperty::NameRef => self.meta.name_ref = expect_str(property, value)?,
            ColumnProperty::Description => self.meta.description = expect_str(property, value)?,
            ColumnProperty::Min => self.meta.min = expect_real(property, value)?,
            ColumnProperty::Max => self.meta.max = expect_real(property, value)?,
            ColumnProperty::Mask => self.meta.mask = expect_str(property, value)?,
        }
        self.events
            .data_changed(ChangeScope::Column, &self.table, &self.name, None);
        Ok(())
    }

    /// Display scale factor derived from the mask property. A mask that
    /// does not parse as a finite non-zero number means no scaling.
    pub fn scale_factor(&self) -> f64 {
        match self.meta.mask.trim().parse::<f64>() {
            Ok(f) if f.is_finite() && f != 0.0 => f,
            _ => 1.0,
        }
    }

    /// Fractional digits used by the scaled-string representation.
    pub fn precision(&self) -> usize {
        self.meta.precision.max(0) as usize
    }

    // ------------------------------------------------------------------
    // Raw storage access (table-internal)
    // ------------------------------------------------------------------

    pub(crate) fn raw(&self, row: usize) -> EngineResult<&CellValue> {
        self.data.get(row).ok_or(EngineError::IndexOutOfRange {
            index: row,
            size: self.data.len(),
        })
    }

    pub(crate) fn set_raw(&mut self, row: usize, value: CellValue) {
        self.data[row] = value;
    }

    pub(crate) fn check_row(&self, row: usize) -> EngineResult<()> {
        if row < self.data.len() {
            Ok(())
        } else {
            Err(EngineError::IndexOutOfRange {
                index: row,
                size: self.data.len(),
            })
        }
    }

    pub(crate) fn push_default(&mut self) {
        self.data.push(self.kind.default_value());
    }

    pub(crate) fn insert_default(&mut self, row: usize) {
        self.data.insert(row, self.kind.default_value());
    }

    pub(crate) fn duplicate_row(&mut self, row: usize) {
        let copy = self.data[row].clone();
        self.data.insert(row + 1, copy);
    }

    pub(crate) fn remove_row(&mut self, row: usize) {
        self.data.remove(row);
    }

    pub(crate) fn swap_rows(&mut self, i: usize, j: usize) {
        self.data.swap(i, j);
    }

    pub(crate) fn set_table_name(&mut self, table: &str) {
        self.table = table.to_string();
    }

    pub(crate) fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }
}

fn expect_str(property: ColumnProperty, value: PropertyValue) -> EngineResult<String> {
    match value {
        PropertyValue::Str(s) => Ok(s),
        other => Err(type_mismatch(property, "string", &other)),
    }
}

fn expect_int(property: ColumnProperty, value: PropertyValue) -> EngineResult<i64> {
    match value {
        PropertyValue::Int(i) => Ok(i),
        other => Err(type_mismatch(property, "integer", &other)),
    }
}

fn expect_real(property: ColumnProperty, value: PropertyValue) -> EngineResult<f64> {
    match value {
        PropertyValue::Real(r) => Ok(r),
        PropertyValue::Int(i) => Ok(i as f64),
        other => Err(type_mismatch(property, "real", &other)),
    }
}

fn expect_bool(property: ColumnProperty, value: PropertyValue) -> EngineResult<bool> {
    match value {
        PropertyValue::Bool(b) => Ok(b),
        other => Err(type_mismatch(property, "boolean", &other)),
    }
}

fn type_mismatch(property: ColumnProperty, expected: &str, got: &PropertyValue) -> EngineError {
    EngineError::InvalidArgument(format!(
        "Property '{}' expects a {} value, got {:?}",
        property.code(),
        expected,
        got
    ))
}
