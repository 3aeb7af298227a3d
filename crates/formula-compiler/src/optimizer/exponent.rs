//! Exponential and logarithm simplification
//!
//! - `e ^ x` becomes `exp(x)` unless `e` is bound as an input or as a
//!   parameter of an enclosing definition
//! - `ln(exp(x))` becomes `x`
//! - `exp(ln(x))` becomes `x` only when domain-changing rewrites are
//!   allowed; the rewrite records the restriction `x <= 0`, since the
//!   original fails there and the rewritten form would not. Restrictions
//!   are checked once for the whole program, so `x` must not refer to
//!   parameters of an enclosing definition.

use super::{bind_parameters, bound_parameters, emit_restriction, free_variables, OptimizationPass, Rewrite};
use crate::error::Result;
use formula_core::ast::{Expression, Operator};
use formula_core::ScopedContext;
use std::collections::BTreeSet;
use tracing::debug;

pub struct ExponentSimplifier {
    inputs: BTreeSet<String>,
    allow_domain_changes: bool,
}

impl ExponentSimplifier {
    pub fn new(inputs: BTreeSet<String>, allow_domain_changes: bool) -> Self {
        Self {
            inputs,
            allow_domain_changes,
        }
    }
}

/// Argument of a one-argument builtin call to `name`
fn single_argument<'a>(expression: &'a Expression, name: &str) -> Option<&'a Expression> {
    match expression {
        Expression::Function {
            name: callee,
            args,
            is_user_call: false,
        } if callee == name && args.len() == 1 => args.first(),
        _ => None,
    }
}

impl OptimizationPass for ExponentSimplifier {
    fn name(&self) -> &'static str {
        "exponent_simplifier"
    }

    fn enter(&self, expression: Expression, ctx: &mut ScopedContext<'_>) -> Result<Rewrite> {
        if let Expression::CustomDefinition { parameters, .. } = &expression {
            bind_parameters(ctx, parameters);
        }
        Ok(Rewrite::keep(expression))
    }

    fn exit(&self, expression: Expression, ctx: &mut ScopedContext<'_>) -> Result<Rewrite> {
        match expression {
            Expression::Binary {
                op: Operator::Power,
                mut args,
            } if args.len() == 2
                && args[0].as_variable() == Some("e")
                && !self.inputs.contains("e")
                && !bound_parameters(ctx).contains("e") =>
            {
                let exponent = args.remove(1);
                // revisit so that `e ^ ln(x)` continues as `exp(ln(x))`
                Ok(Rewrite::revisit(Expression::call("exp", vec![exponent])))
            }
            Expression::Function { .. } => {
                if let Some(inner) = single_argument(&expression, "ln").and_then(|arg| single_argument(arg, "exp")) {
                    debug!("Simplifying `{}`", expression);
                    return Ok(Rewrite::keep(inner.clone()));
                }
                if let Some(inner) = single_argument(&expression, "exp").and_then(|arg| single_argument(arg, "ln")) {
                    let bound = bound_parameters(ctx);
                    let local = !free_variables(inner, &BTreeSet::new()).is_disjoint(&bound);
                    if local {
                        debug!("Keeping `{}`: it depends on a function parameter", expression);
                    } else if self.allow_domain_changes {
                        debug!("Simplifying `{}` under restriction `{} <= 0`", expression, inner);
                        emit_restriction(
                            ctx,
                            Expression::binary(inner.clone(), Operator::Le, Expression::literal(0)),
                        );
                        return Ok(Rewrite::keep(inner.clone()));
                    }
                }
                Ok(Rewrite::keep(expression))
            }
            other => Ok(Rewrite::keep(other)),
        }
    }
}
