//! Compiler error types

use formula_core::ast::Expression;
use formula_core::types::Type;
use formula_core::CoreError;
use formula_parser::{ParseError, Span};
use thiserror::Error;

/// Compiler error
#[derive(Error, Debug)]
pub enum CompileError {
    /// Expression variant this compiler does not know how to handle
    #[error("Unknown expression: {0}")]
    UnknownExpression(String),

    /// No conversion path between two types
    #[error("No conversion from {from} to {to}")]
    NoConversionPath { from: Type, to: Type },

    /// Variable bound to no input slot, parameter or constant
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    /// Call to a name that is neither a builtin nor a local definition
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Known function called with the wrong number of arguments
    #[error("Function '{name}' does not accept {actual} argument(s), expected {expected}")]
    ArityMismatch {
        name: String,
        expected: String,
        actual: usize,
    },

    /// Builtin matched the call but could not lower its arguments
    #[error("Builtin '{0}' cannot be applied to these arguments")]
    BuiltinFailed(String),

    /// Type error
    #[error("Type error: {0}")]
    TypeError(String),

    /// Error raised by the numeric oracle, a value operation or the catalog
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Source text could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Failure while lowering a subtree, carrying the innermost failing node
    #[error("Failed to compile `{expression}`{}: {source}", located(.span))]
    Lowering {
        expression: Expression,
        span: Option<Span>,
        #[source]
        source: Box<CompileError>,
    },

    /// Generic compilation error
    #[error("Compilation error: {0}")]
    CompileError(String),
}

fn located(span: &Option<Span>) -> String {
    span.map(|span| format!(" at {}", span)).unwrap_or_default()
}

impl CompileError {
    /// Attach the failing subtree unless an inner subtree was already attached
    pub fn at(self, expression: &Expression, span: Option<Span>) -> Self {
        match self {
            wrapped @ CompileError::Lowering { .. } => wrapped,
            other => CompileError::Lowering {
                expression: expression.clone(),
                span,
                source: Box::new(other),
            },
        }
    }

    /// Innermost cause, looking through the lowering wrapper
    pub fn cause(&self) -> &CompileError {
        match self {
            CompileError::Lowering { source, .. } => source.cause(),
            other => other,
        }
    }
}

/// Result type for compiler operations
pub type Result<T> = std::result::Result<T, CompileError>;
