//! Inlining of local function definitions
//!
//! For `f'(x) = body; value`, every prime call `f'(a)` in `value` is
//! replaced by `body` with `x` bound to `a`. When no call to `f` is left
//! the definition itself disappears. Definitions that call themselves,
//! are too large or are nested too deeply are left for the backend, which
//! compiles them as closures.
//!
//! Inlining keeps the scoping of closures: a body sees its own parameters
//! and the inputs, never the parameters of enclosing definitions. A call is
//! therefore only replaced where no enclosing parameter would capture a
//! free variable of the body, and where no nested definition would capture
//! a function the body or the arguments call.

use super::{bind_parameters, bound_parameters, free_variables, OptimizationPass, Rewrite};
use crate::error::Result;
use crate::options::InliningOptions;
use formula_core::ast::Expression;
use formula_core::{ScopeTag, ScopedContext};
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

/// Number of enclosing definitions kept as closures
const INLINE_DEPTH: ScopeTag = ScopeTag::new("inline_depth");

pub struct FunctionInliner {
    options: InliningOptions,
}

impl FunctionInliner {
    pub fn new(options: InliningOptions) -> Self {
        Self { options }
    }
}

impl Default for FunctionInliner {
    fn default() -> Self {
        Self::new(InliningOptions::default())
    }
}

/// Definition being inlined
struct Inlining<'a> {
    name: &'a str,
    parameters: &'a [String],
    body: &'a Expression,
    /// Variables of the body other than its parameters
    free: BTreeSet<String>,
    /// Functions the body calls
    callees: BTreeSet<String>,
    /// Functions the body defines
    defined: BTreeSet<String>,
}

impl<'a> Inlining<'a> {
    fn new(name: &'a str, parameters: &'a [String], body: &'a Expression) -> Self {
        let own: BTreeSet<String> = parameters.iter().cloned().collect();
        Self {
            name,
            parameters,
            body,
            free: free_variables(body, &own),
            callees: called_functions(body),
            defined: defined_functions(body),
        }
    }

    /// Replace prime calls to the definition inside `expression`
    fn inline_calls(&self, expression: Expression) -> Result<Expression> {
        match expression {
            Expression::Function {
                name,
                args,
                is_user_call: true,
            } if name == self.name && args.len() == self.parameters.len() => {
                let args = args
                    .into_iter()
                    .map(|arg| self.inline_calls(arg))
                    .collect::<Result<Vec<_>>>()?;
                let captured = args
                    .iter()
                    .any(|arg| !called_functions(arg).is_disjoint(&self.defined));
                if captured {
                    debug!("Not inlining a call to {}': its body redefines a called function", name);
                    return Ok(Expression::Function {
                        name,
                        args,
                        is_user_call: true,
                    });
                }
                let bindings: HashMap<String, Expression> =
                    self.parameters.iter().cloned().zip(args).collect();
                substitute(self.body.clone(), &bindings)
            }
            // a redefinition shadows this one, or a function the body calls,
            // for its whole extent
            Expression::CustomDefinition {
                function_name,
                parameters,
                body,
                value,
            } if function_name == self.name || self.callees.contains(&function_name) => {
                Ok(Expression::CustomDefinition {
                    function_name,
                    parameters,
                    body,
                    value,
                })
            }
            // parameters that would capture free variables of the body
            Expression::CustomDefinition {
                function_name,
                parameters,
                body,
                value,
            } if parameters.iter().any(|parameter| self.free.contains(parameter)) => {
                Ok(Expression::CustomDefinition {
                    function_name,
                    parameters,
                    body,
                    value: Box::new(self.inline_calls(*value)?),
                })
            }
            other => other.map_children(|child| self.inline_calls(child)),
        }
    }
}

/// Replace variables bound in `bindings`. Bodies of nested definitions
/// only see their own parameters and are left alone.
fn substitute(expression: Expression, bindings: &HashMap<String, Expression>) -> Result<Expression> {
    match expression {
        Expression::Variable(name) => Ok(bindings
            .get(&name)
            .cloned()
            .unwrap_or(Expression::Variable(name))),
        Expression::CustomDefinition {
            function_name,
            parameters,
            body,
            value,
        } => Ok(Expression::CustomDefinition {
            function_name,
            parameters,
            body,
            value: Box::new(substitute(*value, bindings)?),
        }),
        other => other.map_children(|child| substitute(child, bindings)),
    }
}

fn called_functions(expression: &Expression) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_names(expression, &mut names, &|expression| match expression {
        Expression::Function { name, .. } => Some(name),
        _ => None,
    });
    names
}

fn defined_functions(expression: &Expression) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_names(expression, &mut names, &|expression| match expression {
        Expression::CustomDefinition { function_name, .. } => Some(function_name),
        _ => None,
    });
    names
}

fn collect_names<'e>(
    expression: &'e Expression,
    names: &mut BTreeSet<String>,
    pick: &dyn Fn(&'e Expression) -> Option<&'e String>,
) {
    if let Some(name) = pick(expression) {
        names.insert(name.clone());
    }
    for child in expression.children() {
        collect_names(child, names, pick);
    }
}

impl OptimizationPass for FunctionInliner {
    fn name(&self) -> &'static str {
        "function_inliner"
    }

    fn enter(&self, expression: Expression, ctx: &mut ScopedContext<'_>) -> Result<Rewrite> {
        let Expression::CustomDefinition {
            function_name,
            parameters,
            body,
            value,
        } = expression
        else {
            return Ok(Rewrite::keep(expression));
        };

        let depth = ctx.get::<usize>(INLINE_DEPTH).copied().unwrap_or(0);
        let keep = |ctx: &mut ScopedContext<'_>, function_name, parameters: Vec<String>, body, value| {
            ctx.set(INLINE_DEPTH, depth + 1);
            bind_parameters(ctx, &parameters);
            Ok(Rewrite::keep(Expression::CustomDefinition {
                function_name,
                parameters,
                body,
                value,
            }))
        };

        if depth >= self.options.max_depth {
            debug!("Not inlining {}': nested {} definitions deep", function_name, depth);
            return keep(ctx, function_name, parameters, body, value);
        }
        if body.node_count() > self.options.max_size {
            debug!(
                "Not inlining {}': body has {} nodes, limit is {}",
                function_name,
                body.node_count(),
                self.options.max_size
            );
            return keep(ctx, function_name, parameters, body, value);
        }
        if body.count_calls(&function_name) > 0 {
            debug!("Not inlining recursive {}'", function_name);
            return keep(ctx, function_name, parameters, body, value);
        }

        let inlining = Inlining::new(&function_name, &parameters, &body);
        let bound = bound_parameters(ctx);
        if !inlining.free.is_disjoint(&bound) {
            debug!(
                "Not inlining {}': its body refers to an input shadowed by a parameter here",
                function_name
            );
            return keep(ctx, function_name, parameters, body, value);
        }
        let value = inlining.inline_calls(*value)?;

        let remaining = value.count_calls(&function_name);
        if remaining == 0 {
            debug!("Inlined every call to {}'", function_name);
            return Ok(Rewrite::revisit(value));
        }

        debug!("{} call(s) to {}' remain after inlining", remaining, function_name);
        keep(ctx, function_name, parameters, body, Box::new(value))
    }
}
