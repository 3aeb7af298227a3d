//! Domain restriction guards

use super::backend::Backend;
use crate::error::Result;
use formula_core::ast::Expression;
use formula_core::ir::Node;
use formula_core::types::Type;
use formula_core::ScopedContext;

/// Wrap `node` in one guard per restriction, the first restriction
/// outermost. A guard fails evaluation when its restriction holds.
pub fn guard(
    backend: &Backend<'_>,
    node: Node,
    restrictions: &[Expression],
    ctx: &ScopedContext<'_>,
) -> Result<Node> {
    restrictions.iter().rev().try_fold(node, |body, restriction| {
        let condition = backend.lower_as(restriction, ctx, &Type::Bool)?;
        Ok(Node::Guard {
            condition: Box::new(condition),
            restriction: restriction.to_string(),
            body: Box::new(body),
        })
    })
}
