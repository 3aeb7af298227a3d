//! IR executor
//!
//! Evaluates typed node trees recursively. Both operands of an `Arith` or
//! `Compare` node are already at the same type; integer arithmetic is
//! checked, decimal arithmetic goes through the numeric oracle.

use crate::error::{Result, RuntimeError};
use crate::math;
use bigdecimal::BigDecimal;
use formula_core::ast::{Operator, UnaryOperator};
use formula_core::ir::{NativeFunction, Node, Program};
use formula_core::numeric::divide;
use formula_core::types::{Type, Value};
use formula_core::{CoreError, DecimalOracle, NumericOracle};
use num_traits::{checked_pow, CheckedRem, Float, PrimInt, Zero};
use std::cmp::Ordering;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, trace};

/// Default limit on nested user function calls
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// IR program executor
#[derive(Debug, Clone)]
pub struct Executor {
    oracle: Arc<dyn NumericOracle>,
    max_call_depth: usize,
}

/// Values visible to the node being evaluated
struct Frame<'a> {
    program: &'a Program,
    slots: &'a [Value],
    locals: &'a [Value],
    depth: usize,
}

impl Executor {
    pub fn new(oracle: Arc<dyn NumericOracle>) -> Self {
        Self {
            oracle,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn oracle(&self) -> &Arc<dyn NumericOracle> {
        &self.oracle
    }

    /// Evaluate `program` with one value per input slot, in slot order
    pub fn evaluate(&self, program: &Program, slots: &[Value]) -> Result<Value> {
        if slots.len() != program.slots.len() {
            return Err(RuntimeError::ArgumentCount {
                expected: program.slots.len(),
                actual: slots.len(),
            });
        }

        let frame = Frame {
            program,
            slots,
            locals: &[],
            depth: 0,
        };
        self.eval(&program.root, &frame)
    }

    fn eval(&self, node: &Node, frame: &Frame<'_>) -> Result<Value> {
        match node {
            Node::Constant(value) => Ok(value.clone()),

            Node::Slot { index, .. } => frame
                .slots
                .get(*index)
                .cloned()
                .ok_or_else(|| RuntimeError::RuntimeError(format!("slot {} out of range", index))),

            Node::Local { index, .. } => frame
                .locals
                .get(*index)
                .cloned()
                .ok_or_else(|| RuntimeError::RuntimeError(format!("local {} out of range", index))),

            Node::Convert { step, operand } => {
                let value = self.eval(operand, frame)?;
                Ok(step.apply(&value)?)
            }

            Node::Negate { operand, .. } => {
                let value = self.eval(operand, frame)?;
                Self::negate(value)
            }

            Node::Not { operand } => {
                let value = self.eval(operand, frame)?;
                Ok(Value::Bool(!value.is_truthy()?))
            }

            Node::Factorial { ty, operand } => {
                let value = self.eval(operand, frame)?;
                self.factorial(&value, ty)
            }

            Node::Arith { op, left, right, .. } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                self.arith(*op, left, right)
            }

            Node::Compare { op, left, right } => {
                let left = self.eval(left, frame)?;
                let right = self.eval(right, frame)?;
                Self::compare(*op, &left, &right).map(Value::Bool)
            }

            Node::Logic { op, left, right } => self.logic(*op, left, right, frame).map(Value::Bool),

            Node::Condition {
                condition,
                then,
                otherwise,
                ..
            } => {
                if self.eval(condition, frame)?.is_truthy()? {
                    self.eval(then, frame)
                } else {
                    self.eval(otherwise, frame)
                }
            }

            Node::Member { target, name, .. } => {
                let target = self.eval(target, frame)?;
                Ok(target.member(name)?)
            }

            Node::Native { function, args, ty } => {
                let args = self.eval_all(args, frame)?;
                let value = match function {
                    NativeFunction::Math(function) => math::apply(*function, &args, self.oracle.as_ref())?,
                    NativeFunction::Host(host) => host.call(&args)?,
                };
                if &value.ty() != ty {
                    return Err(RuntimeError::TypeError(format!(
                        "{} returned {}, expected {}",
                        function.name(),
                        value.ty(),
                        ty
                    )));
                }
                Ok(value)
            }

            Node::Call { function, args, .. } => {
                let args = self.eval_all(args, frame)?;
                self.call(function.0, &args, frame)
            }

            Node::Guard {
                condition,
                restriction,
                body,
            } => {
                if self.eval(condition, frame)?.is_truthy()? {
                    debug!("Domain restriction `{}` violated", restriction);
                    return Err(RuntimeError::DomainViolation {
                        restriction: restriction.clone(),
                    });
                }
                self.eval(body, frame)
            }
        }
    }

    fn eval_all(&self, nodes: &[Node], frame: &Frame<'_>) -> Result<Vec<Value>> {
        nodes.iter().map(|node| self.eval(node, frame)).collect()
    }

    fn call(&self, id: usize, args: &[Value], frame: &Frame<'_>) -> Result<Value> {
        let function = frame
            .program
            .functions
            .get(id)
            .ok_or(RuntimeError::UnknownFunction(id))?;
        if frame.depth >= self.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded(self.max_call_depth));
        }
        trace!("Calling {}' at depth {}", function.name, frame.depth + 1);

        let callee = Frame {
            program: frame.program,
            slots: frame.slots,
            locals: args,
            depth: frame.depth + 1,
        };
        self.eval(&function.body, &callee)
    }

    /// `And` and `Or` families short-circuit; `Xor` families need both sides
    fn logic(&self, op: Operator, left: &Node, right: &Node, frame: &Frame<'_>) -> Result<bool> {
        let left = self.eval(left, frame)?.is_truthy()?;
        let second = || -> Result<bool> { Ok(self.eval(right, frame)?.is_truthy()?) };

        Ok(match op {
            Operator::And => left && second()?,
            Operator::NAnd => !(left && second()?),
            Operator::Or => left || second()?,
            Operator::NOr => !(left || second()?),
            Operator::Xor => left != second()?,
            Operator::XNor => left == second()?,
            other => {
                return Err(RuntimeError::TypeError(format!(
                    "`{}` is not a logical operator",
                    other
                )))
            }
        })
    }

    fn arith(&self, op: Operator, left: Value, right: Value) -> Result<Value> {
        match (left, right) {
            (Value::I32(a), Value::I32(b)) => Self::int_arith(op, a, b).map(Value::I32),
            (Value::I64(a), Value::I64(b)) => Self::int_arith(op, a, b).map(Value::I64),
            (Value::F32(a), Value::F32(b)) => Self::float_arith(op, a, b).map(Value::F32),
            (Value::F64(a), Value::F64(b)) => Self::float_arith(op, a, b).map(Value::F64),
            (Value::Decimal(a), Value::Decimal(b)) => self.decimal_arith(op, &a, &b).map(Value::Decimal),
            (left, right) => Err(RuntimeError::TypeError(format!(
                "`{}` applied to {} and {}",
                op,
                left.ty(),
                right.ty()
            ))),
        }
    }

    fn int_arith<T>(op: Operator, a: T, b: T) -> Result<T>
    where
        T: PrimInt + CheckedRem + Display,
    {
        let overflow = || CoreError::Overflow(format!("{} {} {}", a, op, b));
        let value = match op {
            Operator::Add => a.checked_add(&b),
            Operator::Sub => a.checked_sub(&b),
            Operator::Mul => a.checked_mul(&b),
            Operator::Div | Operator::Mod if b.is_zero() => return Err(CoreError::DivisionByZero.into()),
            Operator::Div => a.checked_div(&b),
            Operator::Mod => a.checked_rem(&b),
            Operator::Power => {
                if b < T::zero() {
                    return Err(CoreError::Domain(format!("integer {} ^ {}", a, b)).into());
                }
                b.to_usize().and_then(|exponent| checked_pow(a, exponent))
            }
            other => {
                return Err(RuntimeError::TypeError(format!(
                    "`{}` is not an arithmetic operator",
                    other
                )))
            }
        };
        value.ok_or_else(|| overflow().into())
    }

    fn float_arith<T: Float>(op: Operator, a: T, b: T) -> Result<T> {
        Ok(match op {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div => a / b,
            Operator::Mod => a % b,
            Operator::Power => a.powf(b),
            other => {
                return Err(RuntimeError::TypeError(format!(
                    "`{}` is not an arithmetic operator",
                    other
                )))
            }
        })
    }

    fn decimal_arith(&self, op: Operator, a: &BigDecimal, b: &BigDecimal) -> Result<BigDecimal> {
        Ok(match op {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
            Operator::Div => divide(a, b, self.oracle.precision())?,
            Operator::Mod if b.is_zero() => return Err(CoreError::DivisionByZero.into()),
            Operator::Mod => a % b,
            Operator::Power => self.oracle.pow(a, b)?,
            other => {
                return Err(RuntimeError::TypeError(format!(
                    "`{}` is not an arithmetic operator",
                    other
                )))
            }
        })
    }

    fn compare(op: Operator, left: &Value, right: &Value) -> Result<bool> {
        let ordering = match (left, right) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::I32(a), Value::I32(b)) => Some(a.cmp(b)),
            (Value::I64(a), Value::I64(b)) => Some(a.cmp(b)),
            (Value::F32(a), Value::F32(b)) => a.partial_cmp(b),
            (Value::F64(a), Value::F64(b)) => a.partial_cmp(b),
            (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::Object(_), Value::Object(_)) if matches!(op, Operator::Eq | Operator::Neq) => {
                return Ok((left == right) == (op == Operator::Eq));
            }
            (left, right) => {
                return Err(RuntimeError::TypeError(format!(
                    "cannot compare {} with {}",
                    left.ty(),
                    right.ty()
                )))
            }
        };

        // unordered (NaN) operands are only ever unequal
        Ok(match op {
            Operator::Eq => ordering == Some(Ordering::Equal),
            Operator::Neq => ordering != Some(Ordering::Equal),
            Operator::Lt => ordering == Some(Ordering::Less),
            Operator::Gt => ordering == Some(Ordering::Greater),
            Operator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            Operator::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            other => {
                return Err(RuntimeError::TypeError(format!(
                    "`{}` is not a comparison",
                    other
                )))
            }
        })
    }

    fn negate(value: Value) -> Result<Value> {
        match value {
            Value::I32(v) => v
                .checked_neg()
                .map(Value::I32)
                .ok_or_else(|| CoreError::Overflow(format!("-({})", v)).into()),
            Value::I64(v) => v
                .checked_neg()
                .map(Value::I64)
                .ok_or_else(|| CoreError::Overflow(format!("-({})", v)).into()),
            Value::F32(v) => Ok(Value::F32(-v)),
            Value::F64(v) => Ok(Value::F64(-v)),
            Value::Decimal(v) => Ok(Value::Decimal(-v)),
            other => Err(RuntimeError::TypeError(format!(
                "`{}` applied to {}",
                UnaryOperator::Negate.symbol(),
                other.ty()
            ))),
        }
    }

    /// Computed on decimals by the oracle, then narrowed back to `ty`
    fn factorial(&self, value: &Value, ty: &Type) -> Result<Value> {
        let decimal = value
            .to_decimal()
            .ok_or_else(|| RuntimeError::TypeError(format!("factorial of {}", value.ty())))?;
        let result = self.oracle.factorial(&decimal)?;
        Ok(Value::from_decimal(&result, ty)?)
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(Arc::new(DecimalOracle::default()))
    }
}
