//! Formula Runtime - evaluation of compiled Formula programs
//!
//! The [`Executor`] walks the typed IR of a [`Program`](formula_core::ir::Program);
//! an [`EntryPoint`] binds the program's input slots to positional
//! parameter names.

pub mod entry_point;
pub mod error;
pub mod executor;
pub mod math;

// Re-export main types
pub use entry_point::EntryPoint;
pub use error::{Result, RuntimeError};
pub use executor::{Executor, DEFAULT_MAX_CALL_DEPTH};
