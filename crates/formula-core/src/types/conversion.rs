//! Conversion paths between types

use super::catalog::ConversionOperator;
use super::ty::Type;
use super::value::Value;
use crate::error::{CoreError, Result};
use std::fmt;

/// A single conversion applied to a value
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionStep {
    /// Cast between primitive numeric types
    Primitive { from: Type, to: Type },
    /// Catalog-declared operator
    Operator(ConversionOperator),
    /// Numeric value to truth value (`x != 0`)
    NonZero { from: Type },
    /// Truth value to numeric value (`b ? 1 : 0`)
    Select { to: Type },
}

impl ConversionStep {
    /// Type produced by this step
    pub fn target(&self) -> Type {
        match self {
            ConversionStep::Primitive { to, .. } => to.clone(),
            ConversionStep::Operator(op) => op.to.clone(),
            ConversionStep::NonZero { .. } => Type::Bool,
            ConversionStep::Select { to } => to.clone(),
        }
    }

    /// Type consumed by this step
    pub fn source(&self) -> Type {
        match self {
            ConversionStep::Primitive { from, .. } => from.clone(),
            ConversionStep::Operator(op) => op.from.clone(),
            ConversionStep::NonZero { from } => from.clone(),
            ConversionStep::Select { .. } => Type::Bool,
        }
    }

    /// True unless the step is an explicit catalog operator
    pub fn is_implicit(&self) -> bool {
        match self {
            ConversionStep::Operator(op) => op.is_implicit(),
            _ => true,
        }
    }

    pub fn apply(&self, value: &Value) -> Result<Value> {
        match self {
            ConversionStep::Primitive { to, .. } => value.cast_primitive(to),
            ConversionStep::Operator(op) => op.apply(value),
            ConversionStep::NonZero { .. } => value.is_truthy().map(Value::Bool),
            ConversionStep::Select { to } => match value {
                Value::Bool(true) => Value::one(to),
                Value::Bool(false) => Value::zero(to),
                _ => None,
            }
            .ok_or_else(|| {
                CoreError::TypeError(format!("cannot select {} from {}", to, value.ty()))
            }),
        }
    }
}

impl fmt::Display for ConversionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversionStep::Primitive { from, to } => write!(f, "{} as {}", from, to),
            ConversionStep::Operator(op) => write!(f, "{}", op.name),
            ConversionStep::NonZero { from } => write!(f, "{} != 0", from),
            ConversionStep::Select { to } => write!(f, "bool ? 1 : 0 as {}", to),
        }
    }
}

/// Ordered conversion steps; empty means the value is used as is
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConversionPath {
    pub steps: Vec<ConversionStep>,
}

impl ConversionPath {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(steps: Vec<ConversionStep>) -> Self {
        Self { steps }
    }

    pub fn single(step: ConversionStep) -> Self {
        Self { steps: vec![step] }
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of explicit operators along the path
    pub fn explicit_count(&self) -> usize {
        self.steps.iter().filter(|s| !s.is_implicit()).count()
    }

    /// Apply every step in order
    pub fn apply(&self, value: Value) -> Result<Value> {
        self.steps.iter().try_fold(value, |acc, step| step.apply(&acc))
    }
}

impl fmt::Display for ConversionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("identity");
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(" -> ")?;
            }
            write!(f, "{}", step)?;
        }
        Ok(())
    }
}
