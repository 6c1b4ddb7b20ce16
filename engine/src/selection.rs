//! FILENAME: engine/src/selection.rs
//! PURPOSE: Selection state for a table: all rows, or rows matching a predicate.
//! CONTEXT: A selection is a derived view, never a copy. This module holds
//! the two-state machine (`Unrestricted` / `Restricted`) and the compiled
//! predicate; membership itself is recomputed against current row data by
//! the table layer, so structural edits can never leave a stale row set
//! behind.

use crate::error::EngineResult;
use crate::value::CellValue;
use parser::Expression;

/// A predicate compiled from its string form. The source string is kept
/// so the selection can be reported and re-derived at any time.
#[derive(Debug, Clone)]
pub struct CompiledPredicate {
    pub source: String,
    pub expr: Expression,
}

/// Per-table selection state. Initial state is `Unrestricted`.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    predicate: Option<CompiledPredicate>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles and installs a predicate, transitioning to `Restricted`.
    /// The empty string means "all rows" and is equivalent to `clear`.
    pub fn set(&mut self, predicate: &str) -> EngineResult<()> {
        if predicate.trim().is_empty() {
            self.clear();
            return Ok(());
        }
        let expr = parser::parse(predicate)?;
        self.predicate = Some(CompiledPredicate {
            source: predicate.to_string(),
            expr,
        });
        Ok(())
    }

    /// Back to `Unrestricted`.
    pub fn clear(&mut self) {
        self.predicate = None;
    }

    pub fn is_restricted(&self) -> bool {
        self.predicate.is_some()
    }

    /// The predicate's string form, or None when unrestricted.
    pub fn source(&self) -> Option<&str> {
        self.predicate.as_ref().map(|p| p.source.as_str())
    }

    pub fn expression(&self) -> Option<&Expression> {
        self.predicate.as_ref().map(|p| &p.expr)
    }
}

/// Builds a predicate string that re-identifies one row by its key-field
/// values, of the form `k1=v1&k2=v2`. Used to re-locate a row after
/// structural changes reorder ids.
pub fn row_predicate(key_values: &[(String, CellValue)]) -> String {
    key_values
        .iter()
        .map(|(name, value)| format!("{}={}", name, predicate_literal(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn predicate_literal(value: &CellValue) -> String {
    match value {
        CellValue::Str(s) => {
            // Prefer single quotes; fall back when the value contains one.
            if s.contains('\'') {
                format!("\"{}\"", s)
            } else {
                format!("'{}'", s)
            }
        }
        other => other.display(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unrestricted() {
        let sel = Selection::new();
        assert!(!sel.is_restricted());
        assert!(sel.source().is_none());
    }

    #[test]
    fn set_compiles_and_stores_source() {
        let mut sel = Selection::new();
        sel.set("ny>100&sta=0").unwrap();
        assert!(sel.is_restricted());
        assert_eq!(sel.source(), Some("ny>100&sta=0"));
    }

    #[test]
    fn empty_predicate_means_all_rows() {
        let mut sel = Selection::new();
        sel.set("ny=5").unwrap();
        sel.set("").unwrap();
        assert!(!sel.is_restricted());

        sel.set("ny=5").unwrap();
        sel.set("   ").unwrap();
        assert!(!sel.is_restricted());
    }

    #[test]
    fn malformed_predicate_is_rejected() {
        let mut sel = Selection::new();
        assert!(sel.set("ny=").is_err());
        // State unchanged after a failed set
        assert!(!sel.is_restricted());
    }

    #[test]
    fn row_predicate_quotes_strings() {
        let keys = vec![
            ("ny".to_string(), CellValue::Int(5)),
            ("name".to_string(), CellValue::Str("Node 1".to_string())),
        ];
        assert_eq!(row_predicate(&keys), "ny=5&name='Node 1'");
    }

    #[test]
    fn row_predicate_round_trips_through_parser() {
        let keys = vec![
            ("ny".to_string(), CellValue::Int(5)),
            ("name".to_string(), CellValue::Str("Node 1".to_string())),
        ];
        let predicate = row_predicate(&keys);
        assert!(parser::parse(&predicate).is_ok());
    }
}
