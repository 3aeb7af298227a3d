//! Builtin function registry
//!
//! Builtins receive the raw argument subtrees and lower them themselves,
//! using the backend for type hints and conversions.

use super::backend::Backend;
use crate::error::{CompileError, Result};
use formula_core::ast::Expression;
use formula_core::ir::{HostFunction, MathFunction, NativeFunction, Node};
use formula_core::types::Type;
use formula_core::ScopedContext;
use std::sync::Arc;
use tracing::trace;

/// A function callable by name from formulas
pub trait Builtin: Send + Sync {
    fn name(&self) -> &str;

    fn arity(&self) -> usize;

    fn accepts_arity(&self, arity: usize) -> bool {
        arity == self.arity()
    }

    /// Lower a call; `Ok(None)` means the builtin cannot handle these
    /// arguments
    fn lower(
        &self,
        args: &[Expression],
        ctx: &ScopedContext<'_>,
        backend: &Backend<'_>,
    ) -> Result<Option<Node>>;
}

/// Ordered set of builtins; the first matching one handles a call
#[derive(Clone, Default)]
pub struct BuiltinRegistry {
    builtins: Vec<Arc<dyn Builtin>>,
}

impl BuiltinRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// `if` and the math functions
    pub fn with_defaults() -> Self {
        let mut registry = Self::new().with(IfBuiltin);
        for function in [
            MathFunction::Exp,
            MathFunction::Ln,
            MathFunction::Log,
            MathFunction::Sqrt,
            MathFunction::Sin,
            MathFunction::Cos,
            MathFunction::Tan,
            MathFunction::Asin,
            MathFunction::Acos,
            MathFunction::Atan,
            MathFunction::Abs,
            MathFunction::Min,
            MathFunction::Max,
            MathFunction::Floor,
            MathFunction::Ceil,
            MathFunction::Round,
        ] {
            registry.register(MathBuiltin::new(function));
        }
        registry
    }

    pub fn with(mut self, builtin: impl Builtin + 'static) -> Self {
        self.register(builtin);
        self
    }

    pub fn register(&mut self, builtin: impl Builtin + 'static) {
        self.builtins.push(Arc::new(builtin));
    }

    pub fn register_arc(&mut self, builtin: Arc<dyn Builtin>) {
        self.builtins.push(builtin);
    }

    /// Append every builtin of `other`, after the ones already registered
    pub fn extend(&mut self, other: BuiltinRegistry) {
        self.builtins.extend(other.builtins);
    }

    pub fn names(&self) -> Vec<&str> {
        self.builtins.iter().map(|builtin| builtin.name()).collect()
    }

    pub fn lower(
        &self,
        name: &str,
        args: &[Expression],
        ctx: &ScopedContext<'_>,
        backend: &Backend<'_>,
    ) -> Result<Node> {
        let named: Vec<&Arc<dyn Builtin>> = self
            .builtins
            .iter()
            .filter(|builtin| builtin.name() == name)
            .collect();
        if named.is_empty() {
            return Err(CompileError::UnknownFunction(name.to_string()));
        }

        let Some(builtin) = named.iter().find(|builtin| builtin.accepts_arity(args.len())) else {
            let expected = named
                .iter()
                .map(|builtin| builtin.arity().to_string())
                .collect::<Vec<_>>()
                .join(" or ");
            return Err(CompileError::ArityMismatch {
                name: name.to_string(),
                expected,
                actual: args.len(),
            });
        };

        trace!("Lowering builtin {}/{}", name, args.len());
        builtin
            .lower(args, ctx, backend)?
            .ok_or_else(|| CompileError::BuiltinFailed(name.to_string()))
    }
}

impl std::fmt::Debug for BuiltinRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// `if(condition, then, otherwise)`, evaluating only the selected branch
pub struct IfBuiltin;

impl Builtin for IfBuiltin {
    fn name(&self) -> &str {
        "if"
    }

    fn arity(&self) -> usize {
        3
    }

    fn lower(
        &self,
        args: &[Expression],
        ctx: &ScopedContext<'_>,
        backend: &Backend<'_>,
    ) -> Result<Option<Node>> {
        let [condition, then, otherwise] = args else {
            return Ok(None);
        };

        let condition = backend.lower_as(condition, ctx, &Type::Bool)?;
        let hint = backend.hint(ctx);
        let branches = vec![
            backend.lower_with_hint(then, ctx, hint.clone())?,
            backend.lower_with_hint(otherwise, ctx, hint)?,
        ];
        let (mut branches, ty) = backend.unify(&args[1..], branches, ctx)?;

        let (Some(otherwise), Some(then)) = (branches.pop(), branches.pop()) else {
            return Ok(None);
        };
        Ok(Some(Node::condition(condition, then, otherwise, ty)))
    }
}

/// Math function evaluated natively by the runtime
pub struct MathBuiltin {
    function: MathFunction,
}

impl MathBuiltin {
    pub fn new(function: MathFunction) -> Self {
        Self { function }
    }

    fn is_trigonometric(&self) -> bool {
        matches!(
            self.function,
            MathFunction::Sin
                | MathFunction::Cos
                | MathFunction::Tan
                | MathFunction::Asin
                | MathFunction::Acos
                | MathFunction::Atan
        )
    }
}

impl Builtin for MathBuiltin {
    fn name(&self) -> &str {
        self.function.name()
    }

    fn arity(&self) -> usize {
        self.function.arity()
    }

    fn lower(
        &self,
        args: &[Expression],
        ctx: &ScopedContext<'_>,
        backend: &Backend<'_>,
    ) -> Result<Option<Node>> {
        let (args, ty) = if self.function.preserves_integers() {
            let hint = backend.operand_hint(ctx);
            let nodes = args
                .iter()
                .map(|arg| {
                    let node = backend.lower_with_hint(arg, ctx, hint.clone())?;
                    backend.numeric(node, ctx)
                })
                .collect::<Result<Vec<_>>>()?;
            backend.unify(args, nodes, ctx)?
        } else {
            // the oracle has no trigonometry
            let ty = match backend.hint(ctx) {
                Some(ty) if ty.is_float() => ty,
                Some(Type::Decimal) if !self.is_trigonometric() => Type::Decimal,
                _ => Type::F64,
            };
            let nodes = args
                .iter()
                .map(|arg| backend.lower_as(arg, ctx, &ty))
                .collect::<Result<Vec<_>>>()?;
            (nodes, ty)
        };

        if !ty.is_numeric() {
            return Ok(None);
        }
        Ok(Some(Node::Native {
            function: NativeFunction::Math(self.function),
            args,
            ty,
        }))
    }
}

/// Function supplied by the embedding application, with a fixed signature
pub struct HostBuiltin {
    function: HostFunction,
    parameters: Vec<Type>,
    return_type: Type,
}

impl HostBuiltin {
    pub fn new(function: HostFunction, parameters: Vec<Type>, return_type: Type) -> Self {
        Self {
            function,
            parameters,
            return_type,
        }
    }
}

impl Builtin for HostBuiltin {
    fn name(&self) -> &str {
        &self.function.name
    }

    fn arity(&self) -> usize {
        self.parameters.len()
    }

    fn lower(
        &self,
        args: &[Expression],
        ctx: &ScopedContext<'_>,
        backend: &Backend<'_>,
    ) -> Result<Option<Node>> {
        let args = args
            .iter()
            .zip(&self.parameters)
            .map(|(arg, ty)| backend.lower_as(arg, ctx, ty))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Node::Native {
            function: NativeFunction::Host(self.function.clone()),
            args,
            ty: self.return_type.clone(),
        }))
    }
}
