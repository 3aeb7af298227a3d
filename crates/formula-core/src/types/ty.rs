//! Types known to the compiler

use serde::{Deserialize, Serialize};
use std::fmt;

/// Static type of a lowered expression
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Type {
    /// Native truth value
    Bool,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Arbitrary-precision decimal
    Decimal,
    /// String
    Str,
    /// User-declared type registered in the type catalog
    Named(String),
}

impl Type {
    pub fn named(name: impl Into<String>) -> Self {
        Type::Named(name.into())
    }

    /// Machine numeric types: conversions among them are always a single cast
    pub fn is_primitive_numeric(&self) -> bool {
        matches!(self, Type::I32 | Type::I64 | Type::F32 | Type::F64)
    }

    /// Types supporting arithmetic
    pub fn is_numeric(&self) -> bool {
        self.is_primitive_numeric() || matches!(self, Type::Decimal)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Type::I32 | Type::I64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Type::F32 | Type::F64)
    }

    /// Deterministic size/precision estimate used to pick the widest type
    pub fn width(&self) -> u16 {
        match self {
            Type::Bool => 1,
            Type::I32 => 32,
            Type::F32 => 40,
            Type::I64 => 64,
            Type::F64 => 72,
            Type::Decimal => 256,
            Type::Str | Type::Named(_) => 0,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Type::Bool => "bool",
            Type::I32 => "i32",
            Type::I64 => "i64",
            Type::F32 => "f32",
            Type::F64 => "f64",
            Type::Decimal => "decimal",
            Type::Str => "str",
            Type::Named(name) => name,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
