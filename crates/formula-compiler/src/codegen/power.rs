//! Lowering strategies for the power operator
//!
//! Strategies are tried in registration order; the first one producing a
//! node wins. A strategy declines with `Ok(None)`; an error also moves on
//! to the next strategy, and the last error is reported when none succeeds.

use super::backend::Backend;
use crate::error::Result;
use bigdecimal::BigDecimal;
use formula_core::ast::{Expression, Operator};
use formula_core::ir::Node;
use formula_core::types::value::is_integral;
use formula_core::types::Value;
use formula_core::ScopedContext;
use num_traits::ToPrimitive;
use std::sync::Arc;

/// One way of lowering `base ^ exponent`
pub trait PowerStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn lower(
        &self,
        base: &Expression,
        exponent: &Expression,
        ctx: &ScopedContext<'_>,
        backend: &Backend<'_>,
    ) -> Result<Option<Node>>;
}

/// Constant integer exponent: the result keeps the base type
pub struct IntegerExponent;

impl PowerStrategy for IntegerExponent {
    fn name(&self) -> &'static str {
        "integer_exponent"
    }

    fn lower(
        &self,
        base: &Expression,
        exponent: &Expression,
        ctx: &ScopedContext<'_>,
        backend: &Backend<'_>,
    ) -> Result<Option<Node>> {
        let Some(n) = exponent
            .as_literal()
            .filter(|value| is_integral(value))
            .and_then(|value| value.to_i32())
        else {
            return Ok(None);
        };

        let base = backend.lower_with_hint(base, ctx, backend.operand_hint(ctx))?;
        let ty = base.ty();
        if !ty.is_numeric() || (n < 0 && ty.is_integer()) {
            return Ok(None);
        }

        let exponent = Node::Constant(Value::from_decimal(&BigDecimal::from(n), &ty)?);
        Ok(Some(Node::arith(Operator::Power, ty, base, exponent)))
    }
}

/// Both operands already lower to the same numeric type
pub struct SameType;

impl PowerStrategy for SameType {
    fn name(&self) -> &'static str {
        "same_type"
    }

    fn lower(
        &self,
        base: &Expression,
        exponent: &Expression,
        ctx: &ScopedContext<'_>,
        backend: &Backend<'_>,
    ) -> Result<Option<Node>> {
        let hint = backend.operand_hint(ctx);
        let base = backend.lower_with_hint(base, ctx, hint.clone())?;
        let exponent = backend.lower_with_hint(exponent, ctx, hint)?;

        let ty = base.ty();
        if ty != exponent.ty() || !ty.is_numeric() {
            return Ok(None);
        }
        Ok(Some(Node::arith(Operator::Power, ty, base, exponent)))
    }
}

/// Both operands converted to the widest type reachable from each
pub struct WidestType;

impl PowerStrategy for WidestType {
    fn name(&self) -> &'static str {
        "widest_type"
    }

    fn lower(
        &self,
        base: &Expression,
        exponent: &Expression,
        ctx: &ScopedContext<'_>,
        backend: &Backend<'_>,
    ) -> Result<Option<Node>> {
        let hint = backend.operand_hint(ctx);
        let operands = [base.clone(), exponent.clone()];
        let nodes = vec![
            backend.lower_with_hint(base, ctx, hint.clone())?,
            backend.lower_with_hint(exponent, ctx, hint)?,
        ];

        let (mut nodes, ty) = backend.unify(&operands, nodes, ctx)?;
        if !ty.is_numeric() {
            return Ok(None);
        }
        let (Some(exponent), Some(base)) = (nodes.pop(), nodes.pop()) else {
            return Ok(None);
        };
        Ok(Some(Node::arith(Operator::Power, ty, base, exponent)))
    }
}

/// Integer exponent, then same type, then widest type
pub fn default_strategies() -> Vec<Arc<dyn PowerStrategy>> {
    vec![
        Arc::new(IntegerExponent),
        Arc::new(SameType),
        Arc::new(WidestType),
    ]
}
