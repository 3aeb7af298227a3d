//! Source locations of parsed subtrees

use formula_core::ast::Expression;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;

/// Half-open byte range in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    pub fn range(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Text covered by this span, if it lies inside `source`
    pub fn slice<'a>(&self, source: &'a str) -> Option<&'a str> {
        source.get(self.range())
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Span of every structurally distinct subtree produced by the parser.
///
/// Expressions compare structurally, so repeated subtrees share one entry:
/// the first occurrence in source order.
#[derive(Debug, Clone, Default)]
pub struct SourceMap {
    spans: HashMap<Expression, Span>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a span unless the subtree was already seen
    pub fn record(&mut self, expression: &Expression, span: Span) {
        self.spans.entry(expression.clone()).or_insert(span);
    }

    pub fn span_of(&self, expression: &Expression) -> Option<Span> {
        self.spans.get(expression).copied()
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}
