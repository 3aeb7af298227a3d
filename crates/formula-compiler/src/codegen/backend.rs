//! Type-directed lowering of expressions to IR nodes
//!
//! The backend walks the optimized tree top-down. The expected type of the
//! current node travels in the scoped context as a [`TypeHint`]: literals
//! embed themselves at the hinted type, arithmetic passes the hint on to its
//! operands, and boolean operators lower their operands without a hint and
//! retarget only their result.

use super::builtins::BuiltinRegistry;
use super::functions::{self, Definition, Definitions, FunctionTable, Parameters};
use super::hint::{TypeHint, DEFINITIONS, FUNCTIONS, HINT, PARAMETERS, SLOTS};
use super::power::PowerStrategy;
use crate::conversion::ConversionResolver;
use crate::error::{CompileError, Result};
use crate::options::CompilerOptions;
use bigdecimal::BigDecimal;
use formula_core::ast::{Expression, UnaryOperator};
use formula_core::ir::{Node, SlotInfo};
use formula_core::types::value::is_integral;
use formula_core::types::{Type, TypeCatalog, Value};
use formula_core::{CoreError, NumericOracle, ScopedContext};
use formula_parser::{SourceMap, Span};
use num_traits::ToPrimitive;
use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;

const E: &str = "2.71828182845904523536028747135266249775724709369995957496696762772407663035354759";
const PI: &str = "3.14159265358979323846264338327950288419716939937510582097494459230781640628620899";

/// Lowering state borrowed from a [`Compiler`](crate::Compiler) for one compilation
pub struct Backend<'c> {
    pub options: &'c CompilerOptions,
    resolver: &'c ConversionResolver,
    builtins: &'c BuiltinRegistry,
    power_strategies: &'c [Arc<dyn PowerStrategy>],
    oracle: &'c Arc<dyn NumericOracle>,
    source_map: Option<&'c SourceMap>,
}

impl<'c> Backend<'c> {
    pub fn new(
        options: &'c CompilerOptions,
        resolver: &'c ConversionResolver,
        builtins: &'c BuiltinRegistry,
        power_strategies: &'c [Arc<dyn PowerStrategy>],
        oracle: &'c Arc<dyn NumericOracle>,
        source_map: Option<&'c SourceMap>,
    ) -> Self {
        Self {
            options,
            resolver,
            builtins,
            power_strategies,
            oracle,
            source_map,
        }
    }

    /// Root scope for one compilation, hinting the expected return type
    pub fn root_context(&self) -> ScopedContext<'static> {
        ScopedContext::new()
            .with(HINT, TypeHint::of(self.options.expect_return.clone()))
            .with(SLOTS, RefCell::new(Vec::<SlotInfo>::new()))
            .with(FUNCTIONS, RefCell::new(FunctionTable::default()))
    }

    pub fn resolver(&self) -> &ConversionResolver {
        self.resolver
    }

    pub fn catalog(&self) -> &TypeCatalog {
        self.resolver.catalog()
    }

    pub fn oracle(&self) -> &Arc<dyn NumericOracle> {
        self.oracle
    }

    pub fn span_of(&self, expression: &Expression) -> Option<Span> {
        self.source_map.and_then(|map| map.span_of(expression))
    }

    /// Lower `expression` under the hint of `ctx`.
    ///
    /// Failures are wrapped with the innermost failing subtree.
    pub fn lower(&self, expression: &Expression, ctx: &ScopedContext<'_>) -> Result<Node> {
        self.lower_node(expression, ctx)
            .map_err(|err| err.at(expression, self.span_of(expression)))
    }

    /// Lower `expression` in a child scope hinting `hint`
    pub fn lower_with_hint(
        &self,
        expression: &Expression,
        ctx: &ScopedContext<'_>,
        hint: Option<Type>,
    ) -> Result<Node> {
        let scope = ctx.child().with(HINT, TypeHint(hint));
        self.lower(expression, &scope)
    }

    /// Lower `expression` under `ty` and convert the result to it
    pub fn lower_as(&self, expression: &Expression, ctx: &ScopedContext<'_>, ty: &Type) -> Result<Node> {
        let node = self.lower_with_hint(expression, ctx, Some(ty.clone()))?;
        self.coerce(node, ty)
            .map_err(|err| err.at(expression, self.span_of(expression)))
    }

    /// Current hint
    pub fn hint(&self, ctx: &ScopedContext<'_>) -> Option<Type> {
        ctx.get::<TypeHint>(HINT).and_then(|hint| hint.0.clone())
    }

    /// Hint passed to arithmetic operands: numeric hints only
    pub fn operand_hint(&self, ctx: &ScopedContext<'_>) -> Option<Type> {
        self.hint(ctx).filter(Type::is_numeric)
    }

    /// Convert `node` to `to` along the cheapest conversion path.
    ///
    /// Constants are converted at compile time when the conversion succeeds.
    pub fn coerce(&self, node: Node, to: &Type) -> Result<Node> {
        let from = node.ty();
        if &from == to {
            return Ok(node);
        }
        let path = self.resolver.require_path(&from, to)?;
        if let Node::Constant(value) = &node {
            if let Ok(converted) = path.apply(value.clone()) {
                return Ok(Node::Constant(converted));
            }
        }
        Ok(node.converted(&path.steps))
    }

    /// Widest type every node can be converted to
    pub fn widest(&self, nodes: &[Node]) -> Result<Type> {
        let types: Vec<Type> = nodes.iter().map(Node::ty).collect();
        self.resolver.widest(&types).ok_or_else(|| {
            CompileError::TypeError(format!(
                "no common type for {}",
                types
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            ))
        })
    }

    /// Bring lowered operands to one type.
    ///
    /// Operands already agreeing are kept as they are; otherwise every
    /// operand not at the widest reachable type is lowered again under that
    /// type and converted.
    pub fn unify(
        &self,
        expressions: &[Expression],
        nodes: Vec<Node>,
        ctx: &ScopedContext<'_>,
    ) -> Result<(Vec<Node>, Type)> {
        let first = nodes.first().map(Node::ty).ok_or_else(|| {
            CompileError::TypeError("operation without operands".to_string())
        })?;
        if nodes.iter().all(|node| node.ty() == first) {
            return Ok((nodes, first));
        }

        let widest = self.widest(&nodes)?;
        let nodes = expressions
            .iter()
            .zip(nodes)
            .map(|(expression, node)| {
                if node.ty() == widest {
                    Ok(node)
                } else {
                    self.lower_as(expression, ctx, &widest)
                }
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((nodes, widest))
    }

    /// Retarget a native truth value to the current hint: kept when the
    /// hint is `bool`, otherwise 1 or 0 at the hinted numeric type (`i32`
    /// without a numeric hint)
    pub fn materialize_truth(&self, node: Node, ctx: &ScopedContext<'_>) -> Result<Node> {
        match self.hint(ctx) {
            Some(Type::Bool) => Ok(node),
            Some(ty) if ty.is_numeric() => self.coerce(node, &ty),
            _ => self.coerce(node, &Type::I32),
        }
    }

    /// Make sure an operand is a number; truth values become 1 or 0
    pub(crate) fn numeric(&self, node: Node, ctx: &ScopedContext<'_>) -> Result<Node> {
        match node.ty() {
            ty if ty.is_numeric() => Ok(node),
            Type::Bool => {
                let target = self.operand_hint(ctx).unwrap_or(Type::I32);
                self.coerce(node, &target)
            }
            other => Err(CompileError::TypeError(format!("{} is not a number", other))),
        }
    }

    pub(crate) fn power_strategies(&self) -> &[Arc<dyn PowerStrategy>] {
        self.power_strategies
    }

    fn lower_node(&self, expression: &Expression, ctx: &ScopedContext<'_>) -> Result<Node> {
        match expression {
            Expression::Literal(value) => self.literal(value, ctx),
            Expression::StringLiteral(value) => Ok(Node::Constant(Value::Str(value.clone()))),
            Expression::Variable(name) => self.variable(name, ctx),
            Expression::Unary { op, operand } => self.unary(*op, operand, ctx),
            Expression::Binary { op, args } => self.binary(*op, args, ctx),
            Expression::Member { target, name } => {
                let target = self.lower_with_hint(target, ctx, None)?;
                let ty = self
                    .catalog()
                    .member_type(&target.ty(), name)
                    .ok_or_else(|| CoreError::MemberNotFound(format!("{}.{}", target.ty(), name)))?;
                Ok(Node::Member {
                    target: Box::new(target),
                    name: name.clone(),
                    ty,
                })
            }
            Expression::Function {
                name,
                args,
                is_user_call,
            } => {
                let defined = ctx
                    .get::<Definitions>(DEFINITIONS)
                    .map_or(false, |definitions| definitions.contains_key(name));
                if *is_user_call || defined {
                    functions::lower_call(self, name, args, ctx)
                } else {
                    self.builtins.lower(name, args, ctx, self)
                }
            }
            Expression::CustomDefinition {
                function_name,
                parameters,
                body,
                value,
            } => {
                let id = self.with_functions(ctx, FunctionTable::next_definition)?;
                let enclosing = ctx.get::<Definitions>(DEFINITIONS).cloned().unwrap_or_default();
                let mut definitions = enclosing.clone();
                definitions.insert(
                    function_name.clone(),
                    Rc::new(Definition {
                        id,
                        name: function_name.clone(),
                        parameters: parameters.clone(),
                        body: (**body).clone(),
                        enclosing,
                    }),
                );
                let scope = ctx.child().with(DEFINITIONS, definitions);
                self.lower(value, &scope)
            }
            other => Err(CompileError::UnknownExpression(format!("{:?}", other))),
        }
    }

    /// Run `f` on the function table of the root scope
    pub(crate) fn with_functions<T>(
        &self,
        ctx: &ScopedContext<'_>,
        f: impl FnOnce(&mut FunctionTable) -> T,
    ) -> Result<T> {
        let table = ctx
            .get::<RefCell<FunctionTable>>(FUNCTIONS)
            .ok_or_else(|| CompileError::CompileError("no function table in scope".to_string()))?;
        let mut table = table.borrow_mut();
        Ok(f(&mut table))
    }

    fn literal(&self, value: &BigDecimal, ctx: &ScopedContext<'_>) -> Result<Node> {
        if let Some(hint) = self.hint(ctx) {
            if hint == Type::Bool || hint.is_numeric() {
                if let Ok(embedded) = Value::from_decimal(value, &hint) {
                    return Ok(Node::Constant(embedded));
                }
            }
        }

        let natural = if is_integral(value) {
            match (value.to_i32(), value.to_i64()) {
                (Some(small), _) => Value::I32(small),
                (None, Some(large)) => Value::I64(large),
                (None, None) => Value::Decimal(value.clone()),
            }
        } else {
            Value::Decimal(value.clone())
        };
        Ok(Node::Constant(natural))
    }

    fn variable(&self, name: &str, ctx: &ScopedContext<'_>) -> Result<Node> {
        if let Some((index, ty)) = ctx
            .get::<Parameters>(PARAMETERS)
            .and_then(|parameters| parameters.get(name))
        {
            return Ok(Node::Local {
                index: *index,
                ty: ty.clone(),
            });
        }

        if let Some(ty) = self.options.inputs.get(name) {
            let slots = ctx
                .get::<RefCell<Vec<SlotInfo>>>(SLOTS)
                .ok_or_else(|| CompileError::CompileError("no slot table in scope".to_string()))?;
            let mut slots = slots.borrow_mut();
            let index = match slots.iter().position(|slot| slot.name == name) {
                Some(index) => index,
                None => {
                    slots.push(SlotInfo {
                        name: name.to_string(),
                        ty: ty.clone(),
                    });
                    slots.len() - 1
                }
            };
            return Ok(Node::Slot {
                index,
                ty: ty.clone(),
            });
        }

        let digits = match name {
            "e" => E,
            "pi" => PI,
            _ => return Err(CompileError::UnknownVariable(name.to_string())),
        };
        let value = BigDecimal::from_str(digits)
            .map_err(|err| CompileError::CompileError(err.to_string()))?
            .with_prec(self.oracle.precision());
        let ty = match self.hint(ctx) {
            Some(ty) if ty.is_float() || ty == Type::Decimal => ty,
            _ => Type::F64,
        };
        Ok(Node::Constant(Value::from_decimal(&value, &ty)?))
    }

    fn unary(&self, op: UnaryOperator, operand: &Expression, ctx: &ScopedContext<'_>) -> Result<Node> {
        match op {
            UnaryOperator::Negate => {
                let operand = self.lower_with_hint(operand, ctx, self.operand_hint(ctx))?;
                let operand = self.numeric(operand, ctx)?;
                Ok(Node::Negate {
                    ty: operand.ty(),
                    operand: Box::new(operand),
                })
            }
            UnaryOperator::Factorial => {
                let operand = self.lower_with_hint(operand, ctx, self.operand_hint(ctx))?;
                let operand = self.numeric(operand, ctx)?;
                Ok(Node::Factorial {
                    ty: operand.ty(),
                    operand: Box::new(operand),
                })
            }
            UnaryOperator::Not => {
                let operand = self.lower_with_hint(operand, ctx, None)?;
                let operand = self.coerce(operand, &Type::Bool)?;
                self.materialize_truth(
                    Node::Not {
                        operand: Box::new(operand),
                    },
                    ctx,
                )
            }
        }
    }
}
