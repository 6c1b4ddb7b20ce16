//! FILENAME: engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad enumerated code, wrong value type, malformed parameter string.
    /// Raised locally, before any data is touched.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Row id {index} out of range for table of {size} rows")]
    IndexOutOfRange { index: usize, size: usize },

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Duplicate name: {0}")]
    DuplicateName(String),

    #[error(transparent)]
    Parse(#[from] parser::ParseError),

    #[error("Evaluation error: {0}")]
    Eval(String),

    /// Wraps a failure surfaced by a lower layer, carrying the original
    /// cause message.
    #[error("Unexpected result: {0}")]
    Unexpected(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
