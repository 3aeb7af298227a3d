//! Optimization module
//!
//! Passes are total rewrites of the expression tree. Each pass is driven
//! top-down over the tree by [`run_pass`]: `enter` sees a node before its
//! children, `exit` after. Either hook may ask for the returned node to be
//! walked again, which is how a rewrite exposes new opportunities to the
//! same pass.

pub mod binary_combiner;
pub mod exponent;
pub mod inliner;
pub mod literal_combiner;

pub use binary_combiner::BinaryCombiner;
pub use exponent::ExponentSimplifier;
pub use inliner::FunctionInliner;
pub use literal_combiner::LiteralCombiner;

use crate::error::Result;
use crate::options::CompilerOptions;
use formula_core::ast::Expression;
use formula_core::{NumericOracle, ScopeTag, ScopedContext};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Domain restrictions emitted by passes, stored once in the root scope
pub const RESTRICTIONS: ScopeTag = ScopeTag::new("restrictions");

/// Parameters of the local definitions enclosing the current node
pub const BOUND_PARAMETERS: ScopeTag = ScopeTag::new("bound_parameters");

/// Result of a pass hook
#[derive(Debug, Clone, PartialEq)]
pub struct Rewrite {
    pub expression: Expression,
    /// Walk `expression` again with the same pass
    pub revisit: bool,
}

impl Rewrite {
    pub fn keep(expression: Expression) -> Self {
        Self {
            expression,
            revisit: false,
        }
    }

    pub fn revisit(expression: Expression) -> Self {
        Self {
            expression,
            revisit: true,
        }
    }
}

/// One stage of the optimization pipeline
pub trait OptimizationPass {
    fn name(&self) -> &'static str;

    /// Called before the children of `expression` are visited
    fn enter(&self, expression: Expression, _ctx: &mut ScopedContext<'_>) -> Result<Rewrite> {
        Ok(Rewrite::keep(expression))
    }

    /// Called after the children of `expression` are visited
    fn exit(&self, expression: Expression, _ctx: &mut ScopedContext<'_>) -> Result<Rewrite> {
        Ok(Rewrite::keep(expression))
    }
}

/// Record a domain restriction in the shared root scope
pub fn emit_restriction(ctx: &ScopedContext<'_>, restriction: Expression) {
    if let Some(restrictions) = ctx.get::<RefCell<Vec<Expression>>>(RESTRICTIONS) {
        debug!("Recording domain restriction `{}`", restriction);
        restrictions.borrow_mut().push(restriction);
    }
}

/// Record the parameters of a definition for the nodes below it. The
/// driver shares one scope between a definition's body and its
/// continuation, so the continuation sees them as bound too.
pub fn bind_parameters(ctx: &mut ScopedContext<'_>, parameters: &[String]) {
    let mut bound = bound_parameters(ctx);
    bound.extend(parameters.iter().cloned());
    ctx.set(BOUND_PARAMETERS, bound);
}

/// Parameters recorded by [`bind_parameters`] in enclosing scopes
pub fn bound_parameters(ctx: &ScopedContext<'_>) -> BTreeSet<String> {
    ctx.get::<BTreeSet<String>>(BOUND_PARAMETERS)
        .cloned()
        .unwrap_or_default()
}

/// Variables of `expression` not in `bound`.
///
/// The body of a nested definition sees only its own parameters, so its
/// free variables are collected whatever `bound` holds.
pub fn free_variables(expression: &Expression, bound: &BTreeSet<String>) -> BTreeSet<String> {
    fn collect(expression: &Expression, bound: &BTreeSet<String>, free: &mut BTreeSet<String>) {
        match expression {
            Expression::Variable(name) => {
                if !bound.contains(name) {
                    free.insert(name.clone());
                }
            }
            Expression::CustomDefinition {
                parameters,
                body,
                value,
                ..
            } => {
                let own: BTreeSet<String> = parameters.iter().cloned().collect();
                collect(body, &own, free);
                collect(value, bound, free);
            }
            other => {
                for child in other.children() {
                    collect(child, bound, free);
                }
            }
        }
    }

    let mut free = BTreeSet::new();
    collect(expression, bound, &mut free);
    free
}

/// Drive one pass over a tree. Every node gets its own scope nested in
/// `parent`; values a hook stores there are visible to the node's subtree
/// only.
pub fn run_pass(
    pass: &dyn OptimizationPass,
    expression: Expression,
    parent: &ScopedContext<'_>,
) -> Result<Expression> {
    let mut scope = parent.child();

    let entered = pass.enter(expression, &mut scope)?;
    if entered.revisit {
        return run_pass(pass, entered.expression, parent);
    }

    let expression = entered
        .expression
        .map_children(|child| run_pass(pass, child, &scope))?;

    let exited = pass.exit(expression, &mut scope)?;
    if exited.revisit {
        run_pass(pass, exited.expression, parent)
    } else {
        Ok(exited.expression)
    }
}

/// Output of the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    pub expression: Expression,
    /// Restrictions emitted by domain-changing rewrites, in emission order
    pub restrictions: Vec<Expression>,
}

/// Ordered list of passes
#[derive(Default)]
pub struct OptimizationPipeline {
    passes: Vec<Box<dyn OptimizationPass>>,
}

impl OptimizationPipeline {
    /// Empty pipeline
    pub fn new() -> Self {
        Self::default()
    }

    /// The passes enabled by `options`: inlining, exponent
    /// simplification, binary combining, then literal folding
    pub fn for_options(options: &CompilerOptions, oracle: Arc<dyn NumericOracle>) -> Self {
        let mut pipeline = Self::new();
        if options.inlining.enabled {
            pipeline = pipeline.add_pass(FunctionInliner::new(options.inlining.clone()));
        }
        if options.enable_exponent_simplification {
            pipeline = pipeline.add_pass(ExponentSimplifier::new(
                options.inputs.keys().cloned().collect(),
                options.allow_domain_changing_optimizations,
            ));
        }
        if options.enable_binary_combining {
            pipeline = pipeline.add_pass(BinaryCombiner::new(options.ignore_commutativity_for.clone()));
        }
        if options.enable_literal_folding {
            pipeline = pipeline.add_pass(LiteralCombiner::new(
                oracle,
                options.ignore_commutativity_for.clone(),
            ));
        }
        pipeline
    }

    /// Builder method to append a pass
    pub fn add_pass(mut self, pass: impl OptimizationPass + 'static) -> Self {
        self.passes.push(Box::new(pass));
        self
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|pass| pass.name()).collect()
    }

    /// Apply every pass in order, each to the output of the previous one
    pub fn run(&self, expression: Expression) -> Result<Optimized> {
        let root = ScopedContext::new().with(RESTRICTIONS, RefCell::new(Vec::<Expression>::new()));

        let mut expression = expression;
        for pass in &self.passes {
            let before = expression.node_count();
            expression = run_pass(pass.as_ref(), expression, &root)?;
            debug!(
                "Pass {} finished: {} -> {} nodes",
                pass.name(),
                before,
                expression.node_count()
            );
        }

        let restrictions = root
            .get::<RefCell<Vec<Expression>>>(RESTRICTIONS)
            .map(|restrictions| restrictions.borrow().clone())
            .unwrap_or_default();

        Ok(Optimized {
            expression,
            restrictions,
        })
    }
}
