//! Expression AST nodes

use super::operator::{Operator, UnaryOperator};
use crate::error::{CoreError, Result};
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expression AST node
///
/// Nodes are immutable once built and compared structurally. Every rewrite
/// produces a fresh tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Expression {
    /// Numeric literal with decimal precision
    Literal(BigDecimal),

    /// Named variable (input slot, constant or function parameter)
    Variable(String),

    /// Unary operation
    Unary {
        op: UnaryOperator,
        operand: Box<Expression>,
    },

    /// Binary operation over two or more operands, folded left to right
    Binary { op: Operator, args: Vec<Expression> },

    /// Member projection (e.g., `point.x`)
    Member {
        target: Box<Expression>,
        name: String,
    },

    /// Function call
    Function {
        name: String,
        args: Vec<Expression>,
        /// Set for prime calls (`f'(x)`) referring to a local definition
        is_user_call: bool,
    },

    /// Local function definition scoped over `value`
    /// (`f'(x) = body; value`)
    CustomDefinition {
        function_name: String,
        parameters: Vec<String>,
        body: Box<Expression>,
        value: Box<Expression>,
    },

    /// String literal
    StringLiteral(String),
}

impl Expression {
    /// Create a literal expression
    pub fn literal(value: impl Into<BigDecimal>) -> Self {
        Expression::Literal(value.into())
    }

    /// Create a variable reference
    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }

    /// Create a binary expression
    pub fn binary(left: Expression, op: Operator, right: Expression) -> Self {
        Expression::Binary {
            op,
            args: vec![left, right],
        }
    }

    /// Create an n-ary binary expression. A single operand is returned as is.
    pub fn nary(op: Operator, mut args: Vec<Expression>) -> Self {
        if args.len() == 1 {
            return args.remove(0);
        }
        Expression::Binary { op, args }
    }

    /// Create a unary expression
    pub fn unary(op: UnaryOperator, operand: Expression) -> Self {
        Expression::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    /// Create a member access expression
    pub fn member(target: Expression, name: impl Into<String>) -> Self {
        Expression::Member {
            target: Box::new(target),
            name: name.into(),
        }
    }

    /// Create a call to a builtin or library function
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Function {
            name: name.into(),
            args,
            is_user_call: false,
        }
    }

    /// Create a prime call (`name'(args)`) to a locally defined function
    pub fn prime_call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::Function {
            name: name.into(),
            args,
            is_user_call: true,
        }
    }

    /// Create a local function definition.
    ///
    /// Every parameter must be a bare variable.
    pub fn custom_definition(
        function_name: impl Into<String>,
        parameters: Vec<Expression>,
        body: Expression,
        value: Expression,
    ) -> Result<Self> {
        let function_name = function_name.into();
        let parameters = parameters
            .into_iter()
            .map(|parameter| match parameter {
                Expression::Variable(name) => Ok(name),
                other => Err(CoreError::InvalidDefinition(format!(
                    "parameter `{}` of `{}` is not a variable",
                    other, function_name
                ))),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Expression::CustomDefinition {
            function_name,
            parameters,
            body: Box::new(body),
            value: Box::new(value),
        })
    }

    /// Create a string literal
    pub fn string(value: impl Into<String>) -> Self {
        Expression::StringLiteral(value.into())
    }

    pub fn as_literal(&self) -> Option<&BigDecimal> {
        match self {
            Expression::Literal(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Expression::Variable(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expression::Literal(_))
    }

    /// Direct children in evaluation order
    pub fn children(&self) -> Vec<&Expression> {
        match self {
            Expression::Literal(_) | Expression::Variable(_) | Expression::StringLiteral(_) => {
                Vec::new()
            }
            Expression::Unary { operand, .. } => vec![operand],
            Expression::Binary { args, .. } | Expression::Function { args, .. } => {
                args.iter().collect()
            }
            Expression::Member { target, .. } => vec![target],
            Expression::CustomDefinition { body, value, .. } => vec![body, value],
        }
    }

    /// Rebuild this node with every direct child passed through `f`
    pub fn map_children<E>(
        self,
        mut f: impl FnMut(Expression) -> std::result::Result<Expression, E>,
    ) -> std::result::Result<Expression, E> {
        Ok(match self {
            leaf @ (Expression::Literal(_)
            | Expression::Variable(_)
            | Expression::StringLiteral(_)) => leaf,
            Expression::Unary { op, operand } => Expression::Unary {
                op,
                operand: Box::new(f(*operand)?),
            },
            Expression::Binary { op, args } => Expression::Binary {
                op,
                args: args.into_iter().map(&mut f).collect::<std::result::Result<_, E>>()?,
            },
            Expression::Member { target, name } => Expression::Member {
                target: Box::new(f(*target)?),
                name,
            },
            Expression::Function {
                name,
                args,
                is_user_call,
            } => Expression::Function {
                name,
                args: args.into_iter().map(&mut f).collect::<std::result::Result<_, E>>()?,
                is_user_call,
            },
            Expression::CustomDefinition {
                function_name,
                parameters,
                body,
                value,
            } => {
                let body = f(*body)?;
                let value = f(*value)?;
                Expression::CustomDefinition {
                    function_name,
                    parameters,
                    body: Box::new(body),
                    value: Box::new(value),
                }
            }
        })
    }

    /// Total number of nodes in this tree
    pub fn node_count(&self) -> usize {
        1 + self
            .children()
            .into_iter()
            .map(Expression::node_count)
            .sum::<usize>()
    }

    /// Number of calls (prime or not) to `name` in this tree
    pub fn count_calls(&self, name: &str) -> usize {
        let own = match self {
            Expression::Function { name: callee, .. } if callee == name => 1,
            _ => 0,
        };
        own + self
            .children()
            .into_iter()
            .map(|child| child.count_calls(name))
            .sum::<usize>()
    }

    fn precedence(&self) -> u8 {
        match self {
            Expression::Literal(value) if value.sign() == num_bigint::Sign::Minus => 6,
            Expression::Literal(_)
            | Expression::Variable(_)
            | Expression::Function { .. }
            | Expression::StringLiteral(_) => 9,
            Expression::Unary {
                op: UnaryOperator::Factorial,
                ..
            } => 8,
            Expression::Unary { .. } => 6,
            Expression::Binary { op, .. } => op.precedence(),
            Expression::Member { .. } => 8,
            Expression::CustomDefinition { .. } => 0,
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, min_precedence: u8) -> fmt::Result {
        if self.precedence() < min_precedence {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expression]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(value) => write!(f, "{}", value),
            Expression::Variable(name) => f.write_str(name),
            Expression::StringLiteral(value) => write!(f, "\"{}\"", value.replace('"', "\\\"")),
            Expression::Unary {
                op: UnaryOperator::Factorial,
                operand,
            } => {
                operand.write_operand(f, 9)?;
                f.write_str("!")
            }
            Expression::Unary { op, operand } => {
                f.write_str(op.symbol())?;
                operand.write_operand(f, 6)
            }
            Expression::Binary { op, args } => {
                let precedence = op.precedence();
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op)?;
                    }
                    // left-fold: later operands bind tighter, except for the
                    // right-associative power operator
                    let strict = match op {
                        Operator::Power => i == 0,
                        _ => i > 0,
                    };
                    arg.write_operand(f, if strict { precedence + 1 } else { precedence })?;
                }
                Ok(())
            }
            Expression::Member { target, name } => {
                target.write_operand(f, 8)?;
                write!(f, ".{}", name)
            }
            Expression::Function {
                name,
                args,
                is_user_call,
            } => {
                f.write_str(name)?;
                if *is_user_call {
                    f.write_str("'")?;
                }
                f.write_str("(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expression::CustomDefinition {
                function_name,
                parameters,
                body,
                value,
            } => write!(
                f,
                "{}'({}) = {}; {}",
                function_name,
                parameters.join(", "),
                body,
                value
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_expression() {
        let expr = Expression::literal(42);
        assert_eq!(expr, Expression::Literal(BigDecimal::from(42)));
    }

    #[test]
    fn test_binary_expression() {
        // x > 18
        let expr = Expression::binary(
            Expression::variable("x"),
            Operator::Gt,
            Expression::literal(18),
        );

        match expr {
            Expression::Binary { op, args } => {
                assert_eq!(op, Operator::Gt);
                assert_eq!(args[0], Expression::Variable("x".to_string()));
                assert_eq!(args[1], Expression::literal(18));
            }
            _ => panic!("Expected Binary expression"),
        }
    }

    #[test]
    fn test_nary_single_operand_is_unwrapped() {
        let expr = Expression::nary(Operator::Add, vec![Expression::variable("a")]);
        assert_eq!(expr, Expression::variable("a"));
    }

    #[test]
    fn test_custom_definition_requires_variables() {
        let ok = Expression::custom_definition(
            "f",
            vec![Expression::variable("x")],
            Expression::variable("x"),
            Expression::prime_call("f", vec![Expression::literal(1)]),
        );
        assert!(ok.is_ok());

        let err = Expression::custom_definition(
            "f",
            vec![Expression::literal(1)],
            Expression::variable("x"),
            Expression::literal(0),
        )
        .unwrap_err();
        assert!(matches!(err, CoreError::InvalidDefinition(_)));
    }

    #[test]
    fn test_structural_equality() {
        let a = Expression::binary(Expression::literal(1), Operator::Add, Expression::variable("y"));
        let b = Expression::binary(Expression::literal(1), Operator::Add, Expression::variable("y"));
        assert_eq!(a, b);
        assert_ne!(a, Expression::binary(Expression::variable("y"), Operator::Add, Expression::literal(1)));
    }

    #[test]
    fn test_node_count_and_calls() {
        // f'(x) + f'(2) * g(1)
        let expr = Expression::binary(
            Expression::prime_call("f", vec![Expression::variable("x")]),
            Operator::Add,
            Expression::binary(
                Expression::prime_call("f", vec![Expression::literal(2)]),
                Operator::Mul,
                Expression::call("g", vec![Expression::literal(1)]),
            ),
        );

        assert_eq!(expr.node_count(), 8);
        assert_eq!(expr.count_calls("f"), 2);
        assert_eq!(expr.count_calls("g"), 1);
    }

    #[test]
    fn test_map_children_rebuilds_node() {
        let expr = Expression::binary(Expression::literal(1), Operator::Add, Expression::literal(2));
        let doubled = expr
            .map_children::<()>(|child| {
                Ok(Expression::binary(child, Operator::Mul, Expression::literal(2)))
            })
            .unwrap();

        assert_eq!(doubled.to_string(), "1 * 2 + 2 * 2");
    }

    #[test]
    fn test_display_parenthesizes() {
        // (a + b) * c
        let expr = Expression::binary(
            Expression::binary(Expression::variable("a"), Operator::Add, Expression::variable("b")),
            Operator::Mul,
            Expression::variable("c"),
        );
        assert_eq!(expr.to_string(), "(a + b) * c");

        // a - (b - c)
        let expr = Expression::binary(
            Expression::variable("a"),
            Operator::Sub,
            Expression::binary(Expression::variable("b"), Operator::Sub, Expression::variable("c")),
        );
        assert_eq!(expr.to_string(), "a - (b - c)");

        // -x^2 keeps the power binding tighter
        let expr = Expression::unary(
            UnaryOperator::Negate,
            Expression::binary(Expression::variable("x"), Operator::Power, Expression::literal(2)),
        );
        assert_eq!(expr.to_string(), "-x ^ 2");
    }

    #[test]
    fn test_display_definition() {
        let expr = Expression::custom_definition(
            "f",
            vec![Expression::variable("x")],
            Expression::binary(Expression::variable("x"), Operator::Mul, Expression::literal(2)),
            Expression::prime_call("f", vec![Expression::literal(1)]),
        )
        .unwrap();
        assert_eq!(expr.to_string(), "f'(x) = x * 2; f'(1)");
    }
}
