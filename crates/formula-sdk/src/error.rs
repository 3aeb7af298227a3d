//! SDK error types

use thiserror::Error;

/// SDK error type
#[derive(Error, Debug)]
pub enum SdkError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Parser error
    #[error("Parser error: {0}")]
    ParseError(#[from] formula_parser::ParseError),

    /// Compiler error
    #[error("Compiler error: {0}")]
    CompileError(#[from] formula_compiler::CompileError),

    /// Runtime error
    #[error("Runtime error: {0}")]
    RuntimeError(#[from] formula_runtime::RuntimeError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Malformed YAML configuration
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Malformed JSON configuration
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// No formula registered under this name
    #[error("Formula not found: {0}")]
    FormulaNotFound(String),

    /// Failure while compiling a named formula from the configuration
    #[error("Formula '{name}': {source}")]
    Formula {
        name: String,
        #[source]
        source: Box<SdkError>,
    },
}

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, SdkError>;
