//! Formula SDK
//!
//! High-level API for compiling and evaluating formulas, configured in
//! code or from YAML/JSON files.

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;

// Re-export main types
pub use builder::FormulaEngineBuilder;
pub use config::{EngineConfig, FormulaConfig, Parameter, DEFAULT_PRECISION};
pub use engine::{CompiledFormula, FormulaEngine};
pub use error::{Result, SdkError};

// Re-export commonly used types from dependencies
pub use formula_compiler::{Builtin, CompilerOptions, PowerStrategy};
pub use formula_core::{BigDecimal, Type, Value};
