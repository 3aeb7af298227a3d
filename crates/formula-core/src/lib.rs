//! Formula Core - Core types and definitions for the Formula expression compiler
//!
//! This crate provides the fundamental types used across the Formula workspace:
//! - AST (Abstract Syntax Tree) definitions
//! - Type model, type catalog and runtime values
//! - Executable IR (typed node trees and programs)
//! - The numeric oracle for high-precision decimal math
//! - The scoped data context threaded through compiler traversals
//! - Error types

pub mod ast;
pub mod context;
pub mod error;
pub mod ir;
pub mod numeric;
pub mod types;

// Re-export commonly used types
pub use context::{ScopeTag, ScopedContext};
pub use error::CoreError;
pub use numeric::{DecimalOracle, NumericOracle};
pub use types::{Type, TypeCatalog, Value};

/// Arbitrary-precision decimal used for literals and the decimal numeric type
pub use bigdecimal::BigDecimal;
