//! Typed executable nodes
//!
//! Every node carries (or implies) the static type of the value it produces.
//! The compiler backend emits nodes; the runtime evaluates them.

use crate::ast::Operator;
use crate::error::Result;
use crate::types::{ConversionStep, Type, Value};
use std::fmt;
use std::sync::Arc;

/// Index of a compiled user function inside a program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FunctionId(pub usize);

/// Built-in math functions evaluated natively by the runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MathFunction {
    Exp,
    Ln,
    /// Logarithm with explicit base: `log(base, x)`
    Log,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Abs,
    Floor,
    Ceil,
    Round,
    Min,
    Max,
}

impl MathFunction {
    pub fn name(&self) -> &'static str {
        match self {
            MathFunction::Exp => "exp",
            MathFunction::Ln => "ln",
            MathFunction::Log => "log",
            MathFunction::Sqrt => "sqrt",
            MathFunction::Sin => "sin",
            MathFunction::Cos => "cos",
            MathFunction::Tan => "tan",
            MathFunction::Asin => "asin",
            MathFunction::Acos => "acos",
            MathFunction::Atan => "atan",
            MathFunction::Abs => "abs",
            MathFunction::Floor => "floor",
            MathFunction::Ceil => "ceil",
            MathFunction::Round => "round",
            MathFunction::Min => "min",
            MathFunction::Max => "max",
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            MathFunction::Log | MathFunction::Min | MathFunction::Max => 2,
            _ => 1,
        }
    }

    /// Functions whose result keeps an integer argument type
    pub fn preserves_integers(&self) -> bool {
        matches!(
            self,
            MathFunction::Abs
                | MathFunction::Floor
                | MathFunction::Ceil
                | MathFunction::Round
                | MathFunction::Min
                | MathFunction::Max
        )
    }
}

/// Host callback invoked with already-evaluated arguments
pub type HostFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;

/// Function supplied by the embedding application
#[derive(Clone)]
pub struct HostFunction {
    pub name: String,
    pub func: HostFn,
}

impl HostFunction {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(func),
        }
    }

    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.func)(args)
    }
}

impl fmt::Debug for HostFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostFunction")
            .field("name", &self.name)
            .finish()
    }
}

impl PartialEq for HostFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && Arc::ptr_eq(&self.func, &other.func)
    }
}

/// Natively evaluated function
#[derive(Debug, Clone, PartialEq)]
pub enum NativeFunction {
    Math(MathFunction),
    Host(HostFunction),
}

impl NativeFunction {
    pub fn name(&self) -> &str {
        match self {
            NativeFunction::Math(math) => math.name(),
            NativeFunction::Host(host) => &host.name,
        }
    }
}

/// Executable node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Embedded constant
    Constant(Value),

    /// Input slot, bound when the program is specialised into an entry point
    Slot { index: usize, ty: Type },

    /// Parameter of the enclosing compiled function
    Local { index: usize, ty: Type },

    /// Single conversion step applied to the operand
    Convert {
        step: ConversionStep,
        operand: Box<Node>,
    },

    Negate { ty: Type, operand: Box<Node> },

    /// Logical negation of a native truth value
    Not { operand: Box<Node> },

    Factorial { ty: Type, operand: Box<Node> },

    /// Binary arithmetic with both operands already at `ty`
    Arith {
        op: Operator,
        ty: Type,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Comparison producing a native truth value
    Compare {
        op: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Logical connective over native truth values
    Logic {
        op: Operator,
        left: Box<Node>,
        right: Box<Node>,
    },

    /// Lazy conditional: only the selected branch is evaluated
    Condition {
        condition: Box<Node>,
        then: Box<Node>,
        otherwise: Box<Node>,
        ty: Type,
    },

    Member {
        target: Box<Node>,
        name: String,
        ty: Type,
    },

    Native {
        function: NativeFunction,
        args: Vec<Node>,
        ty: Type,
    },

    /// Invocation of a compiled user function
    Call {
        function: FunctionId,
        args: Vec<Node>,
        ty: Type,
    },

    /// Domain restriction: fail when `condition` holds, else evaluate `body`
    Guard {
        condition: Box<Node>,
        restriction: String,
        body: Box<Node>,
    },
}

impl Node {
    pub fn constant(value: impl Into<Value>) -> Self {
        Node::Constant(value.into())
    }

    pub fn convert(step: ConversionStep, operand: Node) -> Self {
        Node::Convert {
            step,
            operand: Box::new(operand),
        }
    }

    pub fn arith(op: Operator, ty: Type, left: Node, right: Node) -> Self {
        Node::Arith {
            op,
            ty,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn condition(condition: Node, then: Node, otherwise: Node, ty: Type) -> Self {
        Node::Condition {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
            ty,
        }
    }

    /// Static type of the value this node produces
    pub fn ty(&self) -> Type {
        match self {
            Node::Constant(value) => value.ty(),
            Node::Slot { ty, .. }
            | Node::Local { ty, .. }
            | Node::Negate { ty, .. }
            | Node::Factorial { ty, .. }
            | Node::Arith { ty, .. }
            | Node::Condition { ty, .. }
            | Node::Member { ty, .. }
            | Node::Native { ty, .. }
            | Node::Call { ty, .. } => ty.clone(),
            Node::Convert { step, .. } => step.target(),
            Node::Not { .. } | Node::Compare { .. } | Node::Logic { .. } => Type::Bool,
            Node::Guard { body, .. } => body.ty(),
        }
    }

    pub fn as_constant(&self) -> Option<&Value> {
        match self {
            Node::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// Wrap the node in conversion steps, in order
    pub fn converted(self, steps: &[ConversionStep]) -> Self {
        steps
            .iter()
            .cloned()
            .fold(self, |node, step| Node::convert(step, node))
    }

    /// Total number of nodes in the tree
    pub fn node_count(&self) -> usize {
        1 + match self {
            Node::Constant(_) | Node::Slot { .. } | Node::Local { .. } => 0,
            Node::Convert { operand, .. }
            | Node::Negate { operand, .. }
            | Node::Not { operand }
            | Node::Factorial { operand, .. } => operand.node_count(),
            Node::Member { target, .. } => target.node_count(),
            Node::Arith { left, right, .. }
            | Node::Compare { left, right, .. }
            | Node::Logic { left, right, .. } => left.node_count() + right.node_count(),
            Node::Condition {
                condition,
                then,
                otherwise,
                ..
            } => condition.node_count() + then.node_count() + otherwise.node_count(),
            Node::Native { args, .. } | Node::Call { args, .. } => {
                args.iter().map(Node::node_count).sum()
            }
            Node::Guard {
                condition, body, ..
            } => condition.node_count() + body.node_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_types() {
        let sum = Node::arith(
            Operator::Add,
            Type::I64,
            Node::Slot {
                index: 0,
                ty: Type::I64,
            },
            Node::constant(2i64),
        );
        assert_eq!(sum.ty(), Type::I64);

        let cmp = Node::Compare {
            op: Operator::Lt,
            left: Box::new(Node::constant(1)),
            right: Box::new(Node::constant(2)),
        };
        assert_eq!(cmp.ty(), Type::Bool);

        let selected = Node::convert(ConversionStep::Select { to: Type::F64 }, cmp);
        assert_eq!(selected.ty(), Type::F64);
    }

    #[test]
    fn test_guard_takes_body_type() {
        let guard = Node::Guard {
            condition: Box::new(Node::constant(false)),
            restriction: "x = 0".to_string(),
            body: Box::new(Node::constant(1.5)),
        };
        assert_eq!(guard.ty(), Type::F64);
        assert_eq!(guard.node_count(), 3);
    }

    #[test]
    fn test_converted_applies_steps_in_order() {
        let node = Node::constant(1).converted(&[
            ConversionStep::Primitive {
                from: Type::I32,
                to: Type::I64,
            },
            ConversionStep::NonZero { from: Type::I64 },
        ]);

        assert_eq!(node.ty(), Type::Bool);
        match node {
            Node::Convert { step, operand } => {
                assert_eq!(step, ConversionStep::NonZero { from: Type::I64 });
                assert_eq!(operand.ty(), Type::I64);
            }
            other => panic!("Expected Convert, got {:?}", other),
        }
    }

    #[test]
    fn test_host_function_equality() {
        let double = HostFunction::new("double", |args| match args {
            [Value::F64(v)] => Ok(Value::F64(v * 2.0)),
            _ => Ok(Value::F64(0.0)),
        });
        let copy = double.clone();
        let other = HostFunction::new("double", |_| Ok(Value::F64(0.0)));

        assert_eq!(double, copy);
        assert_ne!(double, other);
        assert_eq!(double.call(&[Value::F64(4.0)]).unwrap(), Value::F64(8.0));
    }

    #[test]
    fn test_math_function_arity() {
        assert_eq!(MathFunction::Log.arity(), 2);
        assert_eq!(MathFunction::Sqrt.arity(), 1);
        assert_eq!(MathFunction::Atan.name(), "atan");
        assert!(MathFunction::Floor.preserves_integers());
        assert!(!MathFunction::Exp.preserves_integers());
    }
}
