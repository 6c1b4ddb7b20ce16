//! FILENAME: parser/src/lib.rs
//! PURPOSE: Expression language shared by selection predicates and column formulas.
//! CONTEXT: Re-exports public types and the parse entry point for use by
//! the engine crate. A selection predicate like `ny>100&sta=0` and a group
//! correction formula like `pn*1.05` go through the same pipeline.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{BinaryOperator, Expression, UnaryOperator, Value};
pub use lexer::Lexer;
pub use parser::{parse, ParseError, ParseResult, Parser};
pub use token::Token;

#[cfg(test)]
mod tests;
