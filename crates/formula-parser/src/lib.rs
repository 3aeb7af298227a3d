//! Formula Parser - source text to AST for the Formula expression compiler
//!
//! This crate tokenizes infix formula text and parses it with a
//! recursive-descent parser into `formula_core::ast::Expression` trees,
//! optionally recording the source span of every subtree for diagnostics.

pub mod error;
pub mod expression_parser;
pub mod lexer;
pub mod source_map;

// Re-export main parser types
pub use error::{ParseError, Result};
pub use expression_parser::ExpressionParser;
pub use source_map::{SourceMap, Span};
