//! FILENAME: parser/src/tests.rs
//! PURPOSE: Consolidated unit tests for the parser crate.

use crate::ast::{BinaryOperator, Expression, UnaryOperator, Value};
use crate::lexer::Lexer;
use crate::parser::parse;
use crate::token::Token;

// ========================================
// LEXER TESTS
// ========================================

#[test]
fn lexer_tokenizes_simple_math() {
    let mut lexer = Lexer::new("1 + 2");

    assert_eq!(lexer.next_token(), Token::Number(1.0));
    assert_eq!(lexer.next_token(), Token::Plus);
    assert_eq!(lexer.next_token(), Token::Number(2.0));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_tokenizes_predicate() {
    let mut lexer = Lexer::new("ny>100&sta=0");

    assert_eq!(lexer.next_token(), Token::Identifier("ny".to_string()));
    assert_eq!(lexer.next_token(), Token::GreaterThan);
    assert_eq!(lexer.next_token(), Token::Number(100.0));
    assert_eq!(lexer.next_token(), Token::Ampersand);
    assert_eq!(lexer.next_token(), Token::Identifier("sta".to_string()));
    assert_eq!(lexer.next_token(), Token::Equals);
    assert_eq!(lexer.next_token(), Token::Number(0.0));
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_tokenizes_comparison_operators() {
    let mut lexer = Lexer::new("< > <= >= <> != =");

    assert_eq!(lexer.next_token(), Token::LessThan);
    assert_eq!(lexer.next_token(), Token::GreaterThan);
    assert_eq!(lexer.next_token(), Token::LessEqual);
    assert_eq!(lexer.next_token(), Token::GreaterEqual);
    assert_eq!(lexer.next_token(), Token::NotEqual);
    assert_eq!(lexer.next_token(), Token::NotEqual);
    assert_eq!(lexer.next_token(), Token::Equals);
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_tokenizes_logical_operators() {
    let mut lexer = Lexer::new("a | !b");

    assert_eq!(lexer.next_token(), Token::Identifier("a".to_string()));
    assert_eq!(lexer.next_token(), Token::Pipe);
    assert_eq!(lexer.next_token(), Token::Bang);
    assert_eq!(lexer.next_token(), Token::Identifier("b".to_string()));
}

#[test]
fn lexer_handles_single_quoted_strings() {
    let mut lexer = Lexer::new("name='ТЭЦ-1'");

    assert_eq!(lexer.next_token(), Token::Identifier("name".to_string()));
    assert_eq!(lexer.next_token(), Token::Equals);
    assert_eq!(lexer.next_token(), Token::String("ТЭЦ-1".to_string()));
}

#[test]
fn lexer_handles_double_quoted_strings_and_bools() {
    let mut lexer = Lexer::new("\"Hello\" true FALSE");

    assert_eq!(lexer.next_token(), Token::String("Hello".to_string()));
    assert_eq!(lexer.next_token(), Token::Boolean(true));
    assert_eq!(lexer.next_token(), Token::Boolean(false));
}

#[test]
fn lexer_preserves_identifier_case() {
    let mut lexer = Lexer::new("Vras vras");

    assert_eq!(lexer.next_token(), Token::Identifier("Vras".to_string()));
    assert_eq!(lexer.next_token(), Token::Identifier("vras".to_string()));
}

#[test]
fn lexer_handles_dotted_identifiers() {
    let mut lexer = Lexer::new("node.unom");
    assert_eq!(
        lexer.next_token(),
        Token::Identifier("node.unom".to_string())
    );
}

#[test]
fn lexer_reads_decimal_numbers() {
    let mut lexer = Lexer::new("3.14 .5");

    assert_eq!(lexer.next_token(), Token::Number(3.14));
    assert_eq!(lexer.next_token(), Token::Number(0.5));
}

#[test]
fn lexer_flags_illegal_characters() {
    let mut lexer = Lexer::new("ny # 5");

    assert_eq!(lexer.next_token(), Token::Identifier("ny".to_string()));
    assert_eq!(lexer.next_token(), Token::Illegal('#'));
}

// ========================================
// PARSER TESTS
// ========================================

#[test]
fn parses_number_literal() {
    let expr = parse("42").unwrap();
    assert_eq!(expr, Expression::Literal(Value::Number(42.0)));
}

#[test]
fn parses_column_reference() {
    let expr = parse("vras").unwrap();
    assert_eq!(expr, Expression::ColumnRef("vras".to_string()));
}

#[test]
fn parses_simple_comparison() {
    let expr = parse("ny=5").unwrap();
    assert_eq!(
        expr,
        Expression::BinaryOp {
            left: Box::new(Expression::ColumnRef("ny".to_string())),
            op: BinaryOperator::Equal,
            right: Box::new(Expression::Literal(Value::Number(5.0))),
        }
    );
}

#[test]
fn conjunction_binds_tighter_than_disjunction() {
    // a=1 | b=2 & c=3  -->  a=1 | (b=2 & c=3)
    let expr = parse("a=1|b=2&c=3").unwrap();
    match expr {
        Expression::BinaryOp { op, right, .. } => {
            assert_eq!(op, BinaryOperator::Or);
            match *right {
                Expression::BinaryOp { op, .. } => assert_eq!(op, BinaryOperator::And),
                other => panic!("Expected conjunction on the right, got {:?}", other),
            }
        }
        other => panic!("Expected disjunction at the top, got {:?}", other),
    }
}

#[test]
fn comparison_binds_tighter_than_conjunction() {
    // ny>100&sta=0  -->  (ny>100) & (sta=0)
    let expr = parse("ny>100&sta=0").unwrap();
    match expr {
        Expression::BinaryOp { op, left, right } => {
            assert_eq!(op, BinaryOperator::And);
            assert!(matches!(
                *left,
                Expression::BinaryOp {
                    op: BinaryOperator::GreaterThan,
                    ..
                }
            ));
            assert!(matches!(
                *right,
                Expression::BinaryOp {
                    op: BinaryOperator::Equal,
                    ..
                }
            ));
        }
        other => panic!("Expected conjunction at the top, got {:?}", other),
    }
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let expr = parse("1+2*3").unwrap();
    match expr {
        Expression::BinaryOp { op, right, .. } => {
            assert_eq!(op, BinaryOperator::Add);
            assert!(matches!(
                *right,
                Expression::BinaryOp {
                    op: BinaryOperator::Multiply,
                    ..
                }
            ));
        }
        other => panic!("Expected addition at the top, got {:?}", other),
    }
}

#[test]
fn power_is_right_associative() {
    // 2^3^2 --> 2^(3^2)
    let expr = parse("2^3^2").unwrap();
    match expr {
        Expression::BinaryOp { op, right, .. } => {
            assert_eq!(op, BinaryOperator::Power);
            assert!(matches!(
                *right,
                Expression::BinaryOp {
                    op: BinaryOperator::Power,
                    ..
                }
            ));
        }
        other => panic!("Expected power at the top, got {:?}", other),
    }
}

#[test]
fn parses_unary_negation() {
    let expr = parse("-pn").unwrap();
    assert_eq!(
        expr,
        Expression::UnaryOp {
            op: UnaryOperator::Negate,
            operand: Box::new(Expression::ColumnRef("pn".to_string())),
        }
    );
}

#[test]
fn parses_logical_not() {
    let expr = parse("!sta").unwrap();
    assert_eq!(
        expr,
        Expression::UnaryOp {
            op: UnaryOperator::Not,
            operand: Box::new(Expression::ColumnRef("sta".to_string())),
        }
    );
}

#[test]
fn parses_parenthesized_expression() {
    let expr = parse("(1+2)*3").unwrap();
    match expr {
        Expression::BinaryOp { op, left, .. } => {
            assert_eq!(op, BinaryOperator::Multiply);
            assert!(matches!(
                *left,
                Expression::BinaryOp {
                    op: BinaryOperator::Add,
                    ..
                }
            ));
        }
        other => panic!("Expected multiplication at the top, got {:?}", other),
    }
}

#[test]
fn parses_function_call_with_arguments() {
    let expr = parse("min(pn, qn)").unwrap();
    assert_eq!(
        expr,
        Expression::FunctionCall {
            name: "min".to_string(),
            args: vec![
                Expression::ColumnRef("pn".to_string()),
                Expression::ColumnRef("qn".to_string()),
            ],
        }
    );
}

#[test]
fn parses_nested_function_call() {
    let expr = parse("round(abs(pn), 2)").unwrap();
    match expr {
        Expression::FunctionCall { name, args } => {
            assert_eq!(name, "round");
            assert_eq!(args.len(), 2);
            assert!(matches!(args[0], Expression::FunctionCall { .. }));
        }
        other => panic!("Expected function call, got {:?}", other),
    }
}

#[test]
fn parses_string_comparison() {
    let expr = parse("name='Node 1'").unwrap();
    assert_eq!(
        expr,
        Expression::BinaryOp {
            left: Box::new(Expression::ColumnRef("name".to_string())),
            op: BinaryOperator::Equal,
            right: Box::new(Expression::Literal(Value::String("Node 1".to_string()))),
        }
    );
}

#[test]
fn rejects_empty_expression() {
    assert!(parse("").is_err());
    assert!(parse("   ").is_err());
}

#[test]
fn rejects_trailing_tokens() {
    assert!(parse("1 2").is_err());
}

#[test]
fn rejects_unbalanced_parentheses() {
    assert!(parse("(1+2").is_err());
    assert!(parse("min(pn").is_err());
}

#[test]
fn rejects_dangling_operator() {
    assert!(parse("ny=").is_err());
    assert!(parse("&sta=0").is_err());
}
