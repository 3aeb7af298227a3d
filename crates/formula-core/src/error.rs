//! Error types for Formula Core

use thiserror::Error;

/// Core error type
///
/// Raised by the numeric oracle, value operations and conversion operators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Type error: {0}")]
    TypeError(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Left-hand side of a local function definition is malformed
    #[error("Invalid definition: {0}")]
    InvalidDefinition(String),

    /// Argument outside the mathematical domain of an operation (e.g. `ln(-1)`)
    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Division by zero")]
    DivisionByZero,

    /// Result does not fit the target numeric type
    #[error("Numeric overflow: {0}")]
    Overflow(String),

    #[error("Not supported: {0}")]
    NotSupported(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
