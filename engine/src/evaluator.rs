//! FILENAME: engine/src/evaluator.rs
//! PURPOSE: Evaluates parsed expressions against a single table row.
//! CONTEXT: Selection predicates and group-correction formulas share the
//! parser's AST. This module traverses the tree with a per-row column
//! lookup, computing either a boolean (predicates) or a value to store
//! (formulas).
//!
//! SUPPORTED FEATURES:
//! - Literal evaluation: numbers, strings, booleans
//! - Column lookup via the `ColumnLookup` seam
//! - Binary operations: +, -, *, /, ^, =, <>, <, >, <=, >=, &, |
//! - Unary operations: - (negation), ! (logical not)
//! - Functions: abs, min, max, round, if

use crate::error::{EngineError, EngineResult};
use crate::value::CellValue;
use parser::{BinaryOperator, Expression, UnaryOperator, Value};

/// Per-row access to column values, implemented by the table layer.
pub trait ColumnLookup {
    /// Returns the raw (not scaled) value of the named column for the row
    /// this lookup is bound to, or None if the column does not exist.
    fn lookup(&self, name: &str) -> Option<CellValue>;
}

/// The result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl EvalValue {
    /// Attempts to coerce the result to a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            EvalValue::Number(n) => Some(*n),
            EvalValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            EvalValue::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// Attempts to coerce the result to a boolean. Numbers follow the
    /// engine convention: non-zero is true.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            EvalValue::Bool(b) => Some(*b),
            EvalValue::Number(n) => Some(*n != 0.0),
            EvalValue::Text(_) => None,
        }
    }

    /// Converts the result to a string representation.
    pub fn as_text(&self) -> String {
        match self {
            EvalValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            EvalValue::Text(s) => s.clone(),
            EvalValue::Bool(b) => if *b { "true" } else { "false" }.to_string(),
        }
    }

    /// Converts the result into a storable cell value.
    pub fn to_cell_value(&self) -> CellValue {
        match self {
            EvalValue::Number(n) => CellValue::Real(*n),
            EvalValue::Text(s) => CellValue::Str(s.clone()),
            EvalValue::Bool(b) => CellValue::Bool(*b),
        }
    }

    fn from_cell(value: CellValue) -> Self {
        match value {
            CellValue::Int(i) => EvalValue::Number(i as f64),
            CellValue::Real(r) => EvalValue::Number(r),
            CellValue::Str(s) => EvalValue::Text(s),
            CellValue::Bool(b) => EvalValue::Bool(b),
        }
    }
}

/// Evaluates `expr` for the row bound to `row`.
pub fn evaluate(expr: &Expression, row: &dyn ColumnLookup) -> EngineResult<EvalValue> {
    match expr {
        Expression::Literal(value) => Ok(match value {
            Value::Number(n) => EvalValue::Number(*n),
            Value::String(s) => EvalValue::Text(s.clone()),
            Value::Boolean(b) => EvalValue::Bool(*b),
        }),

        Expression::ColumnRef(name) => row
            .lookup(name)
            .map(EvalValue::from_cell)
            .ok_or_else(|| EngineError::UnknownColumn(name.clone())),

        Expression::UnaryOp { op, operand } => {
            let value = evaluate(operand, row)?;
            match op {
                UnaryOperator::Negate => value
                    .as_number()
                    .map(|n| EvalValue::Number(-n))
                    .ok_or_else(|| eval_error("Cannot negate a non-numeric value")),
                UnaryOperator::Not => value
                    .as_boolean()
                    .map(|b| EvalValue::Bool(!b))
                    .ok_or_else(|| eval_error("Cannot apply ! to a non-boolean value")),
            }
        }

        Expression::BinaryOp { left, op, right } => {
            let lhs = evaluate(left, row)?;
            let rhs = evaluate(right, row)?;
            apply_binary(*op, lhs, rhs)
        }

        Expression::FunctionCall { name, args } => {
            let mut values = Vec::with_capacity(args.len());
            // `if` is lazy in its branches; everything else is strict.
            if name.eq_ignore_ascii_case("if") {
                return eval_if(args, row);
            }
            for arg in args {
                values.push(evaluate(arg, row)?);
            }
            apply_function(name, values)
        }
    }
}

/// Evaluates a predicate expression to a boolean.
pub fn evaluate_predicate(expr: &Expression, row: &dyn ColumnLookup) -> EngineResult<bool> {
    evaluate(expr, row)?
        .as_boolean()
        .ok_or_else(|| eval_error("Selection predicate did not produce a boolean"))
}

fn apply_binary(op: BinaryOperator, lhs: EvalValue, rhs: EvalValue) -> EngineResult<EvalValue> {
    match op {
        BinaryOperator::And | BinaryOperator::Or => {
            let l = lhs
                .as_boolean()
                .ok_or_else(|| eval_error("Left side of a logical operator is not boolean"))?;
            let r = rhs
                .as_boolean()
                .ok_or_else(|| eval_error("Right side of a logical operator is not boolean"))?;
            Ok(EvalValue::Bool(match op {
                BinaryOperator::And => l && r,
                _ => l || r,
            }))
        }

        BinaryOperator::Equal
        | BinaryOperator::NotEqual
        | BinaryOperator::LessThan
        | BinaryOperator::GreaterThan
        | BinaryOperator::LessEqual
        | BinaryOperator::GreaterEqual => Ok(EvalValue::Bool(compare(op, &lhs, &rhs))),

        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => {
            let l = lhs
                .as_number()
                .ok_or_else(|| eval_error("Left operand is not numeric"))?;
            let r = rhs
                .as_number()
                .ok_or_else(|| eval_error("Right operand is not numeric"))?;
            let result = match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Subtract => l - r,
                BinaryOperator::Multiply => l * r,
                BinaryOperator::Divide => {
                    if r == 0.0 {
                        return Err(eval_error("Division by zero"));
                    }
                    l / r
                }
                _ => l.powf(r),
            };
            Ok(EvalValue::Number(result))
        }
    }
}

/// Comparison semantics: numeric when both sides coerce to numbers,
/// otherwise case-sensitive text comparison.
fn compare(op: BinaryOperator, lhs: &EvalValue, rhs: &EvalValue) -> bool {
    let ordering = match (lhs.as_number(), rhs.as_number()) {
        (Some(l), Some(r)) => l.partial_cmp(&r),
        _ => Some(lhs.as_text().cmp(&rhs.as_text())),
    };

    match ordering {
        Some(ord) => match op {
            BinaryOperator::Equal => ord == std::cmp::Ordering::Equal,
            BinaryOperator::NotEqual => ord != std::cmp::Ordering::Equal,
            BinaryOperator::LessThan => ord == std::cmp::Ordering::Less,
            BinaryOperator::GreaterThan => ord == std::cmp::Ordering::Greater,
            BinaryOperator::LessEqual => ord != std::cmp::Ordering::Greater,
            BinaryOperator::GreaterEqual => ord != std::cmp::Ordering::Less,
            _ => false,
        },
        // NaN on either side
        None => op == BinaryOperator::NotEqual,
    }
}

fn eval_if(args: &[Expression], row: &dyn ColumnLookup) -> EngineResult<EvalValue> {
    if args.len() != 3 {
        return Err(eval_error("if() expects exactly 3 arguments"));
    }
    let condition = evaluate(&args[0], row)?
        .as_boolean()
        .ok_or_else(|| eval_error("if() condition is not boolean"))?;
    if condition {
        evaluate(&args[1], row)
    } else {
        evaluate(&args[2], row)
    }
}

fn apply_function(name: &str, args: Vec<EvalValue>) -> EngineResult<EvalValue> {
    match name.to_ascii_lowercase().as_str() {
        "abs" => {
            let n = single_number(name, &args)?;
            Ok(EvalValue::Number(n.abs()))
        }
        "round" => {
            if args.is_empty() || args.len() > 2 {
                return Err(eval_error("round() expects 1 or 2 arguments"));
            }
            let n = args[0]
                .as_number()
                .ok_or_else(|| eval_error("round() expects a numeric argument"))?;
            let digits = match args.get(1) {
                Some(d) => d
                    .as_number()
                    .ok_or_else(|| eval_error("round() digits must be numeric"))?
                    as i32,
                None => 0,
            };
            let factor = 10f64.powi(digits);
            Ok(EvalValue::Number((n * factor).round() / factor))
        }
        "min" | "max" => {
            if args.is_empty() {
                return Err(eval_error(format!("{}() expects at least 1 argument", name)));
            }
            let mut best: Option<f64> = None;
            for arg in &args {
                let n = arg
                    .as_number()
                    .ok_or_else(|| eval_error(format!("{}() expects numeric arguments", name)))?;
                best = Some(match best {
                    Some(b) => {
                        if name.eq_ignore_ascii_case("min") {
                            b.min(n)
                        } else {
                            b.max(n)
                        }
                    }
                    None => n,
                });
            }
            Ok(EvalValue::Number(best.unwrap_or(0.0)))
        }
        other => Err(eval_error(format!("Unknown function: {}", other))),
    }
}

fn single_number(name: &str, args: &[EvalValue]) -> EngineResult<f64> {
    if args.len() != 1 {
        return Err(eval_error(format!("{}() expects exactly 1 argument", name)));
    }
    args[0]
        .as_number()
        .ok_or_else(|| eval_error(format!("{}() expects a numeric argument", name)))
}

fn eval_error(message: impl Into<String>) -> EngineError {
    EngineError::Eval(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeRow(HashMap<&'static str, CellValue>);

    impl ColumnLookup for FakeRow {
        fn lookup(&self, name: &str) -> Option<CellValue> {
            self.0.get(name).cloned()
        }
    }

    fn row() -> FakeRow {
        let mut map = HashMap::new();
        map.insert("ny", CellValue::Int(5));
        map.insert("pn", CellValue::Real(12.5));
        map.insert("sta", CellValue::Bool(false));
        map.insert("name", CellValue::Str("Node 1".to_string()));
        FakeRow(map)
    }

    fn eval(input: &str) -> EngineResult<EvalValue> {
        let expr = parser::parse(input).unwrap();
        evaluate(&expr, &row())
    }

    #[test]
    fn evaluates_arithmetic_with_columns() {
        assert_eq!(eval("pn*2").unwrap(), EvalValue::Number(25.0));
        assert_eq!(eval("ny+1").unwrap(), EvalValue::Number(6.0));
    }

    #[test]
    fn evaluates_predicate_conjunction() {
        let expr = parser::parse("ny=5&pn>10").unwrap();
        assert!(evaluate_predicate(&expr, &row()).unwrap());

        let expr = parser::parse("ny=5&pn>100").unwrap();
        assert!(!evaluate_predicate(&expr, &row()).unwrap());
    }

    #[test]
    fn evaluates_disjunction_and_not() {
        let expr = parser::parse("sta|ny=5").unwrap();
        assert!(evaluate_predicate(&expr, &row()).unwrap());

        let expr = parser::parse("!sta").unwrap();
        assert!(evaluate_predicate(&expr, &row()).unwrap());
    }

    #[test]
    fn string_comparison_is_case_sensitive() {
        let expr = parser::parse("name='Node 1'").unwrap();
        assert!(evaluate_predicate(&expr, &row()).unwrap());

        let expr = parser::parse("name='node 1'").unwrap();
        assert!(!evaluate_predicate(&expr, &row()).unwrap());
    }

    #[test]
    fn unknown_column_is_an_error() {
        match eval("nosuch+1") {
            Err(EngineError::UnknownColumn(name)) => assert_eq!(name, "nosuch"),
            other => panic!("Expected UnknownColumn, got {:?}", other),
        }
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(matches!(eval("pn/0"), Err(EngineError::Eval(_))));
    }

    #[test]
    fn builtin_functions() {
        assert_eq!(eval("abs(0-pn)").unwrap(), EvalValue::Number(12.5));
        assert_eq!(eval("min(ny, pn)").unwrap(), EvalValue::Number(5.0));
        assert_eq!(eval("max(ny, pn)").unwrap(), EvalValue::Number(12.5));
        assert_eq!(eval("round(pn, 0)").unwrap(), EvalValue::Number(13.0));
        assert_eq!(eval("if(ny=5, 1, 2)").unwrap(), EvalValue::Number(1.0));
    }

    #[test]
    fn unknown_function_is_an_error() {
        assert!(matches!(eval("frobnicate(1)"), Err(EngineError::Eval(_))));
    }

    #[test]
    fn predicate_requires_boolean_result() {
        let expr = parser::parse("name").unwrap();
        assert!(evaluate_predicate(&expr, &row()).is_err());
    }
}
