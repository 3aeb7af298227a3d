//! Parser error types

use formula_core::CoreError;
use thiserror::Error;

/// Parser error
///
/// Positions are byte offsets into the source text.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Input contains no tokens
    #[error("Empty expression")]
    EmptyExpression,

    /// Character that starts no token
    #[error("Unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: usize },

    /// String literal without closing quote
    #[error("Unterminated string starting at {position}")]
    UnterminatedString { position: usize },

    /// Malformed number literal
    #[error("Invalid number '{text}' at {position}")]
    InvalidNumber { text: String, position: usize },

    /// Token does not fit the grammar
    #[error("Expected {expected}, found {found} at {position}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },

    /// Comparison operators do not chain (`a < b < c`)
    #[error("Comparison operators cannot be chained at {position}")]
    ChainedComparison { position: usize },

    /// Malformed left-hand side of a local definition
    #[error("Invalid definition at {position}: {source}")]
    InvalidDefinition {
        position: usize,
        #[source]
        source: CoreError,
    },
}

impl ParseError {
    /// Byte offset of the error, when known
    pub fn position(&self) -> Option<usize> {
        match self {
            ParseError::EmptyExpression => None,
            ParseError::UnexpectedCharacter { position, .. }
            | ParseError::UnterminatedString { position }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::UnexpectedToken { position, .. }
            | ParseError::ChainedComparison { position }
            | ParseError::InvalidDefinition { position, .. } => Some(*position),
        }
    }
}

/// Result type for parser operations
pub type Result<T> = std::result::Result<T, ParseError>;
