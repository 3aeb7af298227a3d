//! Abstract Syntax Tree (AST) definitions for Formula
//!
//! This module contains the AST node definitions for:
//! - Expressions
//! - Binary and unary operators

pub mod expression;
pub mod operator;

pub use expression::Expression;
pub use operator::{Operator, UnaryOperator};
