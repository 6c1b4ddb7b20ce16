//! FILENAME: engine/src/value.rs
//! PURPOSE: Cell values, column data kinds, and the three-representation codec.
//! CONTEXT: Every cell stores one `CellValue` typed by its column's
//! `ColumnKind`. Callers address cells in one of three representations
//! (`ValueKind`): the raw stored value, the display-scaled value, or the
//! display-scaled value rendered as text. The scale factor and precision
//! come from the owning column's properties.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// The data kind of a column. Enumerated kinds (`Enum`, `EnumPic`) and
/// `Color` are integer-backed; they differ only in how a UI would render
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Int,
    Real,
    Str,
    Bool,
    Enum,
    EnumPic,
    Color,
}

impl ColumnKind {
    /// The value a freshly created row holds in a column of this kind.
    pub fn default_value(&self) -> CellValue {
        match self {
            ColumnKind::Real => CellValue::Real(0.0),
            ColumnKind::Str => CellValue::Str(String::new()),
            ColumnKind::Bool => CellValue::Bool(false),
            _ => CellValue::Int(0),
        }
    }

    /// True for kinds stored as integers.
    pub fn is_integer_backed(&self) -> bool {
        matches!(
            self,
            ColumnKind::Int | ColumnKind::Enum | ColumnKind::EnumPic | ColumnKind::Color
        )
    }
}

/// Which representation of a cell value a caller is reading or writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    /// The raw stored value, no display transformation.
    NotScaled,
    /// The value after applying the column's display scale factor.
    Scaled,
    /// The scaled value rendered as text with the column's precision.
    ScaledString,
}

/// The stored form of a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Int(i64),
    Real(f64),
    Str(String),
    Bool(bool),
}

impl CellValue {
    /// Numeric view of the value. Booleans coerce to 0/1; strings do not
    /// coerce implicitly.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Real(r) => Some(*r),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            CellValue::Str(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            CellValue::Int(i) => Some(*i != 0),
            CellValue::Real(r) => Some(*r != 0.0),
            CellValue::Str(_) => None,
        }
    }

    /// Plain text rendering without scale or precision applied.
    pub fn display(&self) -> String {
        match self {
            CellValue::Int(i) => i.to_string(),
            CellValue::Real(r) => {
                // Format without unnecessary decimal places
                if r.fract() == 0.0 && r.abs() < 1e15 {
                    format!("{:.0}", r)
                } else {
                    format!("{}", r)
                }
            }
            CellValue::Str(s) => s.clone(),
            CellValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        }
    }
}

/// Coerces an arbitrary value into the stored form for a column kind.
/// Fails with `InvalidArgument` when no sensible conversion exists
/// (e.g. a non-numeric string into an integer column).
pub fn coerce(value: CellValue, kind: ColumnKind) -> EngineResult<CellValue> {
    match kind {
        ColumnKind::Real => match value {
            CellValue::Real(r) => Ok(CellValue::Real(r)),
            CellValue::Int(i) => Ok(CellValue::Real(i as f64)),
            CellValue::Bool(b) => Ok(CellValue::Real(if b { 1.0 } else { 0.0 })),
            CellValue::Str(s) => s
                .trim()
                .parse::<f64>()
                .map(CellValue::Real)
                .map_err(|_| bad_coercion(&s, "real")),
        },
        ColumnKind::Str => Ok(CellValue::Str(value.display())),
        ColumnKind::Bool => match value {
            CellValue::Bool(b) => Ok(CellValue::Bool(b)),
            CellValue::Int(i) => Ok(CellValue::Bool(i != 0)),
            CellValue::Real(r) => Ok(CellValue::Bool(r != 0.0)),
            CellValue::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(CellValue::Bool(true)),
                "false" | "0" | "" => Ok(CellValue::Bool(false)),
                _ => Err(bad_coercion(&s, "bool")),
            },
        },
        // Int, Enum, EnumPic, Color
        _ => match value {
            CellValue::Int(i) => Ok(CellValue::Int(i)),
            CellValue::Real(r) => Ok(CellValue::Int(r.round() as i64)),
            CellValue::Bool(b) => Ok(CellValue::Int(if b { 1 } else { 0 })),
            CellValue::Str(s) => {
                let trimmed = s.trim();
                if let Ok(i) = trimmed.parse::<i64>() {
                    Ok(CellValue::Int(i))
                } else if let Ok(r) = trimmed.parse::<f64>() {
                    Ok(CellValue::Int(r.round() as i64))
                } else {
                    Err(bad_coercion(&s, "integer"))
                }
            }
        },
    }
}

fn bad_coercion(text: &str, target: &str) -> EngineError {
    EngineError::InvalidArgument(format!("Cannot convert '{}' to {}", text, target))
}

/// Applies the display scale to a raw value. Non-numeric values pass
/// through unchanged; a factor of 1.0 is the identity.
pub fn scale_value(raw: &CellValue, factor: f64) -> CellValue {
    if factor == 1.0 {
        return raw.clone();
    }
    match raw.as_f64() {
        Some(n) => CellValue::Real(n * factor),
        None => raw.clone(),
    }
}

/// Removes the display scale from a caller-supplied value.
pub fn unscale_value(value: CellValue, factor: f64) -> CellValue {
    if factor == 1.0 {
        return value;
    }
    match value.as_f64() {
        Some(n) => CellValue::Real(n / factor),
        None => value,
    }
}

/// Renders a scaled value as display text with the given precision.
/// Integer-backed and non-numeric values ignore the precision.
pub fn format_scaled(scaled: &CellValue, precision: usize) -> String {
    match scaled {
        CellValue::Real(r) => format!("{:.*}", precision, r),
        other => other.display(),
    }
}
