//! Operators for Formula expressions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    // Arithmetic operators
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
    /// Modulo (%)
    Mod,
    /// Exponentiation (^)
    Power,

    // Logical operators
    /// Logical AND (&)
    And,
    /// Negated AND (~&)
    NAnd,
    /// Logical OR (|)
    Or,
    /// Negated OR (~|)
    NOr,
    /// Exclusive OR (^^)
    Xor,
    /// Negated exclusive OR (~^)
    XNor,

    // Comparison operators
    /// Equal (=)
    Eq,
    /// Not equal (~=)
    Neq,
    /// Less than (<)
    Lt,
    /// Greater than (>)
    Gt,
    /// Less than or equal (<=)
    Le,
    /// Greater than or equal (>=)
    Ge,
}

impl Operator {
    /// Returns true if this is a comparison operator
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq | Operator::Neq | Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le
        )
    }

    /// Returns true if this is an arithmetic operator
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Operator::Add
                | Operator::Sub
                | Operator::Mul
                | Operator::Div
                | Operator::Mod
                | Operator::Power
        )
    }

    /// Returns true if this is a logical operator
    pub fn is_logical(&self) -> bool {
        matches!(
            self,
            Operator::And
                | Operator::NAnd
                | Operator::Or
                | Operator::NOr
                | Operator::Xor
                | Operator::XNor
        )
    }

    /// Returns true if the operator produces a truth value
    pub fn is_boolean(&self) -> bool {
        self.is_logical() || self.is_comparison()
    }

    /// Operators whose nested chains may be flattened into one n-ary node
    pub fn is_associative(&self) -> bool {
        matches!(
            self,
            Operator::Add | Operator::Mul | Operator::And | Operator::Or
        )
    }

    /// Source-level symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Mod => "%",
            Operator::Power => "^",
            Operator::And => "&",
            Operator::NAnd => "~&",
            Operator::Or => "|",
            Operator::NOr => "~|",
            Operator::Xor => "^^",
            Operator::XNor => "~^",
            Operator::Eq => "=",
            Operator::Neq => "~=",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Ge => ">=",
        }
    }

    /// Binding strength used when printing expressions back as source
    pub fn precedence(&self) -> u8 {
        match self {
            Operator::Or | Operator::NOr | Operator::Xor | Operator::XNor => 1,
            Operator::And | Operator::NAnd => 2,
            Operator::Eq
            | Operator::Neq
            | Operator::Lt
            | Operator::Gt
            | Operator::Le
            | Operator::Ge => 3,
            Operator::Add | Operator::Sub => 4,
            Operator::Mul | Operator::Div | Operator::Mod => 5,
            Operator::Power => 7,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnaryOperator {
    /// Arithmetic negation (-)
    Negate,
    /// Logical NOT (~)
    Not,
    /// Postfix factorial (!)
    Factorial,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Negate => "-",
            UnaryOperator::Not => "~",
            UnaryOperator::Factorial => "!",
        }
    }
}
