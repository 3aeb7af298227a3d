//! Type system for Formula
//!
//! This module contains the compile-time and runtime type system including:
//! - Types and their width estimates
//! - Runtime values
//! - The type catalog of declared types, members and conversion operators
//! - Conversion steps and paths

pub mod catalog;
pub mod conversion;
pub mod ty;
pub mod value;

pub use catalog::{ConversionKind, ConversionOperator, TypeCatalog, TypeDeclaration};
pub use conversion::{ConversionPath, ConversionStep};
pub use ty::Type;
pub use value::{ObjectValue, Value};
