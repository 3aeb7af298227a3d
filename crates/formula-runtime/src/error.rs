//! Runtime error types

use formula_core::types::Type;
use formula_core::CoreError;
use thiserror::Error;

/// Runtime error
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// A domain restriction held for the given inputs
    #[error("Domain restriction violated: {restriction}")]
    DomainViolation { restriction: String },

    /// Type error
    #[error("Type error: {0}")]
    TypeError(String),

    /// Program reads an input slot that was not named when binding
    #[error("Input slot not bound: {0}")]
    UnboundSlot(String),

    /// Input value does not have the slot type
    #[error("Input '{name}' expects {expected}, got {actual}")]
    InputType {
        name: String,
        expected: Type,
        actual: Type,
    },

    /// Wrong number of values passed to an entry point
    #[error("Expected {expected} input value(s), got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    /// Call to a function the program does not contain
    #[error("Unknown function #{0}")]
    UnknownFunction(usize),

    /// Nested calls exceeded the executor limit
    #[error("Call depth limit of {0} exceeded")]
    CallDepthExceeded(usize),

    /// Arithmetic or conversion failure
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Generic runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(String),
}

/// Result type for runtime operations
pub type Result<T> = std::result::Result<T, RuntimeError>;
