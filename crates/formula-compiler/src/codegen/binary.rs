//! Lowering of binary operators

use super::backend::Backend;
use crate::error::{CompileError, Result};
use formula_core::ast::{Expression, Operator};
use formula_core::ir::Node;
use formula_core::types::Type;
use formula_core::ScopedContext;
use tracing::trace;

impl Backend<'_> {
    pub(crate) fn binary(
        &self,
        op: Operator,
        args: &[Expression],
        ctx: &ScopedContext<'_>,
    ) -> Result<Node> {
        match args {
            [] => Err(CompileError::TypeError(format!("`{}` without operands", op))),
            [single] => self.lower(single, ctx),
            _ if op == Operator::Power => self.power(args, ctx),
            _ if op.is_comparison() => self.comparison(op, args, ctx),
            _ if op.is_logical() => self.logic(op, args, ctx),
            _ => self.arithmetic(op, args, ctx),
        }
    }

    /// Left fold at the common operand type
    fn arithmetic(&self, op: Operator, args: &[Expression], ctx: &ScopedContext<'_>) -> Result<Node> {
        let hint = self.operand_hint(ctx);
        let nodes = args
            .iter()
            .map(|arg| {
                let node = self.lower_with_hint(arg, ctx, hint.clone())?;
                self.numeric(node, ctx)
                    .map_err(|err| err.at(arg, self.span_of(arg)))
            })
            .collect::<Result<Vec<_>>>()?;

        let (nodes, ty) = self.unify(args, nodes, ctx)?;
        if !ty.is_numeric() {
            return Err(CompileError::TypeError(format!("`{}` is not defined on {}", op, ty)));
        }

        fold(nodes, |left, right| Node::arith(op, ty.clone(), left, right))
    }

    fn comparison(&self, op: Operator, args: &[Expression], ctx: &ScopedContext<'_>) -> Result<Node> {
        let [left, right] = args else {
            return Err(CompileError::TypeError(format!(
                "`{}` compares exactly two operands, found {}",
                op,
                args.len()
            )));
        };

        let nodes = vec![
            self.lower_with_hint(left, ctx, None)?,
            self.lower_with_hint(right, ctx, None)?,
        ];
        let (nodes, _) = self.unify(args, nodes, ctx)?;
        let node = fold(nodes, |left, right| Node::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })?;
        self.materialize_truth(node, ctx)
    }

    fn logic(&self, op: Operator, args: &[Expression], ctx: &ScopedContext<'_>) -> Result<Node> {
        let nodes = args
            .iter()
            .map(|arg| {
                let node = self.lower_with_hint(arg, ctx, None)?;
                self.coerce(node, &Type::Bool)
                    .map_err(|err| err.at(arg, self.span_of(arg)))
            })
            .collect::<Result<Vec<_>>>()?;

        let node = fold(nodes, |left, right| Node::Logic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })?;
        self.materialize_truth(node, ctx)
    }

    /// `a ^ b ^ c` with more than two operands folds left
    fn power(&self, args: &[Expression], ctx: &ScopedContext<'_>) -> Result<Node> {
        let Some((exponent, bases)) = args.split_last() else {
            return Err(CompileError::TypeError("`^` without operands".to_string()));
        };
        let base = Expression::nary(Operator::Power, bases.to_vec());

        let mut last_error = None;
        for strategy in self.power_strategies() {
            match strategy.lower(&base, exponent, ctx, self) {
                Ok(Some(node)) => {
                    trace!("Power `{} ^ {}` lowered by {}", base, exponent, strategy.name());
                    return Ok(node);
                }
                Ok(None) => {}
                Err(err) => {
                    trace!("Power strategy {} failed: {}", strategy.name(), err);
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            CompileError::TypeError(format!("no power strategy accepts `{} ^ {}`", base, exponent))
        }))
    }
}

fn fold(nodes: Vec<Node>, combine: impl Fn(Node, Node) -> Node) -> Result<Node> {
    nodes
        .into_iter()
        .reduce(combine)
        .ok_or_else(|| CompileError::TypeError("operation without operands".to_string()))
}
