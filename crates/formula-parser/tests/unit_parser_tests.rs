//! Unit tests for the expression parser
//!
//! Tests the grammar end to end: operator levels, calls, local definitions,
//! source spans and error positions.

use formula_core::ast::{Expression, Operator, UnaryOperator};
use formula_parser::*;

fn parse(input: &str) -> Expression {
    let result = ExpressionParser::parse(input);
    assert!(result.is_ok(), "Failed to parse {:?}: {:?}", input, result.err());
    result.unwrap()
}

// =============================================================================
// Expression Tests
// =============================================================================

#[test]
fn test_parse_simple_comparison() {
    let expr = parse("x >= 18");
    assert_eq!(
        expr,
        Expression::binary(Expression::variable("x"), Operator::Ge, Expression::literal(18))
    );
}

#[test]
fn test_parse_every_binary_operator() {
    let cases = [
        ("a + b", Operator::Add),
        ("a - b", Operator::Sub),
        ("a * b", Operator::Mul),
        ("a / b", Operator::Div),
        ("a % b", Operator::Mod),
        ("a ^ b", Operator::Power),
        ("a & b", Operator::And),
        ("a ~& b", Operator::NAnd),
        ("a | b", Operator::Or),
        ("a ~| b", Operator::NOr),
        ("a ^^ b", Operator::Xor),
        ("a ~^ b", Operator::XNor),
        ("a = b", Operator::Eq),
        ("a ~= b", Operator::Neq),
        ("a < b", Operator::Lt),
        ("a > b", Operator::Gt),
        ("a <= b", Operator::Le),
        ("a >= b", Operator::Ge),
    ];

    for (source, op) in cases {
        match parse(source) {
            Expression::Binary { op: parsed, args } => {
                assert_eq!(parsed, op, "operator of {:?}", source);
                assert_eq!(args.len(), 2);
            }
            other => panic!("Expected binary for {:?}, got {:?}", source, other),
        }
    }
}

#[test]
fn test_parse_display_round_trip() {
    let sources = [
        "(a + b) * c",
        "a - (b - c)",
        "-x ^ 2",
        "2 ^ 3 ^ 2",
        "sqrt(x) + f'(y, 2)",
        "p.x * p.y",
        "n!",
        "a < 1 | ~b",
        "f'(x) = x * 2 + y; f'(1) + f'(2)",
    ];

    for source in sources {
        let expr = parse(source);
        assert_eq!(expr.to_string(), source);
        assert_eq!(parse(&expr.to_string()), expr);
    }
}

#[test]
fn test_parse_nested_definitions() {
    let expr = parse("f'(x) = x + 1; g'(y) = f'(y) * 2; g'(3)");
    match expr {
        Expression::CustomDefinition {
            function_name,
            value,
            ..
        } => {
            assert_eq!(function_name, "f");
            assert!(matches!(
                *value,
                Expression::CustomDefinition { ref function_name, .. } if function_name == "g"
            ));
        }
        other => panic!("Expected definition, got {:?}", other),
    }
}

#[test]
fn test_parse_definition_in_parentheses() {
    let expr = parse("(sq'(v) = v * v; sq'(3)) + 1");
    match expr {
        Expression::Binary { op: Operator::Add, args } => {
            assert!(matches!(args[0], Expression::CustomDefinition { .. }));
            assert_eq!(args[1], Expression::literal(1));
        }
        other => panic!("Expected addition, got {:?}", other),
    }
}

#[test]
fn test_parse_string_literal() {
    assert_eq!(parse("\"label\""), Expression::string("label"));
}

#[test]
fn test_parse_double_negation() {
    assert_eq!(
        parse("--x"),
        Expression::unary(
            UnaryOperator::Negate,
            Expression::unary(UnaryOperator::Negate, Expression::variable("x"))
        )
    );
}

#[test]
fn test_parse_error_positions() {
    let err = ExpressionParser::parse("1 + * 2").unwrap_err();
    assert_eq!(err.position(), Some(4));

    let err = ExpressionParser::parse("max(1, 2").unwrap_err();
    assert_eq!(err.position(), Some(8));

    let err = ExpressionParser::parse("a $ b").unwrap_err();
    assert!(matches!(err, ParseError::UnexpectedCharacter { character: '$', position: 2 }));
}

#[test]
fn test_source_map_covers_subtrees() {
    let source = "f'(x) = x * 2; f'(1)";
    let (expr, map) = ExpressionParser::parse_with_source_map(source).unwrap();

    assert_eq!(map.span_of(&expr).unwrap().slice(source), Some(source));
    let call = Expression::prime_call("f", vec![Expression::literal(1)]);
    assert_eq!(map.span_of(&call).unwrap().slice(source), Some("f'(1)"));
    assert!(map.span_of(&Expression::variable("missing")).is_none());
}
