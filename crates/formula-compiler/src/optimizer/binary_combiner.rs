//! Flattening of associative chains
//!
//! `(a + b) + c` and `a + (b + c)` both become the single three-operand
//! node `a + b + c`. Operators opted out of commutativity stay nested.

use super::{OptimizationPass, Rewrite};
use crate::error::Result;
use formula_core::ast::{Expression, Operator};
use formula_core::ScopedContext;
use std::collections::BTreeSet;

pub struct BinaryCombiner {
    ignore: BTreeSet<Operator>,
}

impl BinaryCombiner {
    pub fn new(ignore: BTreeSet<Operator>) -> Self {
        Self { ignore }
    }

    fn combines(&self, op: Operator) -> bool {
        op.is_associative() && !self.ignore.contains(&op)
    }
}

impl Default for BinaryCombiner {
    fn default() -> Self {
        Self::new(BTreeSet::new())
    }
}

impl OptimizationPass for BinaryCombiner {
    fn name(&self) -> &'static str {
        "binary_combiner"
    }

    fn exit(&self, expression: Expression, _ctx: &mut ScopedContext<'_>) -> Result<Rewrite> {
        let Expression::Binary { op, args } = expression else {
            return Ok(Rewrite::keep(expression));
        };
        if !self.combines(op) {
            return Ok(Rewrite::keep(Expression::Binary { op, args }));
        }

        // children are already flat, so one level of splicing suffices
        let mut flat = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Expression::Binary {
                    op: inner,
                    args: inner_args,
                } if inner == op => flat.extend(inner_args),
                other => flat.push(other),
            }
        }
        Ok(Rewrite::keep(Expression::Binary { op, args: flat }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::OptimizationPipeline;

    fn var(name: &str) -> Expression {
        Expression::variable(name)
    }

    fn combine(combiner: BinaryCombiner, expr: Expression) -> Expression {
        OptimizationPipeline::new()
            .add_pass(combiner)
            .run(expr)
            .unwrap()
            .expression
    }

    #[test]
    fn test_flattens_both_sides() {
        // (a + b) + (c + d)
        let expr = Expression::binary(
            Expression::binary(var("a"), Operator::Add, var("b")),
            Operator::Add,
            Expression::binary(var("c"), Operator::Add, var("d")),
        );

        let combined = combine(BinaryCombiner::default(), expr);
        assert_eq!(
            combined,
            Expression::nary(Operator::Add, vec![var("a"), var("b"), var("c"), var("d")])
        );
    }

    #[test]
    fn test_flattens_deep_chains() {
        // a * (b * (c * d))
        let expr = Expression::binary(
            var("a"),
            Operator::Mul,
            Expression::binary(var("b"), Operator::Mul, Expression::binary(var("c"), Operator::Mul, var("d"))),
        );

        let combined = combine(BinaryCombiner::default(), expr);
        assert_eq!(
            combined,
            Expression::nary(Operator::Mul, vec![var("a"), var("b"), var("c"), var("d")])
        );
    }

    #[test]
    fn test_mixed_operators_stay_nested() {
        // (a - b) - c and (a + b) * c are not flattened
        let sub = Expression::binary(Expression::binary(var("a"), Operator::Sub, var("b")), Operator::Sub, var("c"));
        assert_eq!(combine(BinaryCombiner::default(), sub.clone()), sub);

        let mixed = Expression::binary(Expression::binary(var("a"), Operator::Add, var("b")), Operator::Mul, var("c"));
        assert_eq!(combine(BinaryCombiner::default(), mixed.clone()), mixed);
    }

    #[test]
    fn test_logical_chains() {
        let expr = Expression::binary(
            Expression::binary(var("p"), Operator::And, var("q")),
            Operator::And,
            var("r"),
        );
        let combined = combine(BinaryCombiner::default(), expr);
        assert_eq!(combined, Expression::nary(Operator::And, vec![var("p"), var("q"), var("r")]));
    }

    #[test]
    fn test_opted_out_operator() {
        let expr = Expression::binary(Expression::binary(var("a"), Operator::Add, var("b")), Operator::Add, var("c"));
        let combiner = BinaryCombiner::new([Operator::Add].into_iter().collect());
        assert_eq!(combine(combiner, expr.clone()), expr);
    }

    #[test]
    fn test_idempotent() {
        let expr = Expression::binary(
            Expression::binary(var("a"), Operator::Or, Expression::binary(var("b"), Operator::Or, var("c"))),
            Operator::Or,
            Expression::binary(Expression::binary(var("d"), Operator::Add, var("e")), Operator::Add, var("f")),
        );

        let once = combine(BinaryCombiner::default(), expr);
        let twice = combine(BinaryCombiner::default(), once.clone());
        assert_eq!(once, twice);
    }
}
