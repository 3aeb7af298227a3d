//! Code generation module
//!
//! The backend lowers an optimized expression tree into typed IR nodes.
//! Builtins and power strategies plug into it through traits.

pub mod backend;
mod binary;
pub mod builtins;
pub mod functions;
pub mod hint;
pub mod power;
pub mod restrictions;

pub use backend::Backend;
pub use builtins::{Builtin, BuiltinRegistry, HostBuiltin, IfBuiltin, MathBuiltin};
pub use functions::FunctionTable;
pub use hint::TypeHint;
pub use power::{default_strategies, IntegerExponent, PowerStrategy, SameType, WidestType};
