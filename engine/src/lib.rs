//! FILENAME: engine/src/lib.rs
//! PURPOSE: Main library entry point for the table workspace engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod collection;
pub mod column;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod journal;
pub mod selection;
pub mod solver;
pub mod table;
pub mod value;
pub mod workspace;

// Re-export commonly used types at the crate root
pub use collection::{TableCollection, TableRef};
pub use column::{Column, ColumnProperty, PropertyValue};
pub use error::{EngineError, EngineResult};
pub use evaluator::{evaluate, evaluate_predicate, ColumnLookup, EvalValue};
pub use events::{ChangeScope, EventHub, EventListener, EventLock, LogListener, LogSeverity};
pub use journal::Journal;
pub use selection::Selection;
pub use solver::{CalcOutcome, CalcParams, NullSolver, Solver};
pub use table::{ColumnRef, SelectedRows, Table};
pub use value::{CellValue, ColumnKind, ValueKind};
pub use workspace::{WeightingParam, WeightingSettings, Workspace, CONTROL_TABLE};
