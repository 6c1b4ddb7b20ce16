//! FILENAME: persistence/src/lib.rs
//! PURPOSE: File interchange for the table workspace.
//! CONTEXT: Two per-table dialects (delimited and fixed-layout) and the
//! whole-workspace JSON document format, plus the deprecated template
//! directory shim. All failures surface as one `PersistenceError`
//! carrying the original cause.

mod error;
mod merge;

pub mod cdu;
pub mod csv;
pub mod store;

pub use cdu::{read_cdu, write_cdu, CduMode};
pub use csv::{read_csv, write_csv, CsvMode};
pub use error::{PersistenceError, PersistenceResult};
pub use store::{load_workspace, new_from_template, save_workspace, LoadMode};
