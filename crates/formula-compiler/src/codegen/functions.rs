//! Compilation of local function definitions
//!
//! A definition that survives inlining is compiled once per combination of
//! argument types into a [`FunctionBody`] and invoked through `Node::Call`.
//! The memo entry is reserved before the body is lowered, so a call to the
//! function from its own body resolves to the same compiled function.
//!
//! Bodies see their parameters, the input slots and the definitions visible
//! where they were defined; parameters of enclosing functions are not
//! captured.

use super::backend::Backend;
use super::hint::{DEFINITIONS, PARAMETERS};
use crate::error::{CompileError, Result};
use formula_core::ast::Expression;
use formula_core::ir::{FunctionBody, FunctionId, Node};
use formula_core::types::Type;
use formula_core::ScopedContext;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::debug;

/// Function defined by a `CustomDefinition`
#[derive(Debug)]
pub struct Definition {
    /// Unique per compilation
    pub id: usize,
    pub name: String,
    pub parameters: Vec<String>,
    pub body: Expression,
    /// Definitions visible where this one was defined
    pub enclosing: Definitions,
}

/// Definitions in scope, by name
pub type Definitions = HashMap<String, Rc<Definition>>;

/// Parameter slots of the body being lowered: name to (index, type)
pub type Parameters = HashMap<String, (usize, Type)>;

type Signature = (usize, Vec<Type>);

/// Compiled functions of one compilation
#[derive(Debug, Default)]
pub struct FunctionTable {
    bodies: Vec<Option<FunctionBody>>,
    memo: HashMap<Signature, (FunctionId, Type)>,
    next_definition: usize,
}

impl FunctionTable {
    /// Allocate an id for a new definition
    pub fn next_definition(&mut self) -> usize {
        let id = self.next_definition;
        self.next_definition += 1;
        id
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    fn lookup(&self, signature: &Signature) -> Option<(FunctionId, Type)> {
        self.memo.get(signature).cloned()
    }

    fn reserve(&mut self, signature: Signature, return_type: Type) -> FunctionId {
        let id = FunctionId(self.bodies.len());
        self.bodies.push(None);
        self.memo.insert(signature, (id, return_type));
        id
    }

    fn store(&mut self, id: FunctionId, body: FunctionBody) {
        if let Some(slot) = self.bodies.get_mut(id.0) {
            *slot = Some(body);
        }
    }

    /// Drop every function reserved from `id` on
    fn rollback(&mut self, id: FunctionId) {
        self.bodies.truncate(id.0);
        self.memo.retain(|_, (function, _)| function.0 < id.0);
    }

    /// Compiled bodies indexed by [`FunctionId`]
    pub fn finish(self) -> Result<Vec<FunctionBody>> {
        self.bodies
            .into_iter()
            .enumerate()
            .map(|(index, body)| {
                body.ok_or_else(|| CompileError::CompileError(format!("function #{} was never compiled", index)))
            })
            .collect()
    }
}

/// Lower a call to a local definition
pub fn lower_call(
    backend: &Backend<'_>,
    name: &str,
    args: &[Expression],
    ctx: &ScopedContext<'_>,
) -> Result<Node> {
    let definition = ctx
        .get::<Definitions>(DEFINITIONS)
        .and_then(|definitions| definitions.get(name))
        .cloned()
        .ok_or_else(|| CompileError::UnknownFunction(name.to_string()))?;

    if args.len() != definition.parameters.len() {
        return Err(CompileError::ArityMismatch {
            name: name.to_string(),
            expected: definition.parameters.len().to_string(),
            actual: args.len(),
        });
    }

    let hint = backend.operand_hint(ctx);
    let args = args
        .iter()
        .map(|arg| backend.lower_with_hint(arg, ctx, hint.clone()))
        .collect::<Result<Vec<_>>>()?;
    let types: Vec<Type> = args.iter().map(Node::ty).collect();
    let signature = (definition.id, types.clone());

    if let Some((function, ty)) = backend.with_functions(ctx, |table| table.lookup(&signature))? {
        return Ok(Node::Call { function, args, ty });
    }

    let return_type = backend
        .hint(ctx)
        .unwrap_or_else(|| backend.options.expect_return.clone());
    let function = backend.with_functions(ctx, |table| table.reserve(signature, return_type.clone()))?;
    debug!(
        "Compiling {}'({}) -> {} as function #{}",
        name,
        types.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "),
        return_type,
        function.0
    );

    let parameters: Parameters = definition
        .parameters
        .iter()
        .cloned()
        .zip(types.iter().cloned().enumerate())
        .collect();
    let mut visible = definition.enclosing.clone();
    visible.insert(definition.name.clone(), Rc::clone(&definition));
    let scope = ctx
        .child()
        .with(PARAMETERS, parameters)
        .with(DEFINITIONS, visible);

    let body = match backend.lower_as(&definition.body, &scope, &return_type) {
        Ok(body) => body,
        Err(err) => {
            backend.with_functions(ctx, |table| table.rollback(function))?;
            return Err(err);
        }
    };
    backend.with_functions(ctx, |table| {
        table.store(
            function,
            FunctionBody {
                name: definition.name.clone(),
                parameters: types,
                return_type: return_type.clone(),
                body,
            },
        )
    })?;

    Ok(Node::Call {
        function,
        args,
        ty: return_type,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::builtins::BuiltinRegistry;
    use crate::codegen::hint::FUNCTIONS;
    use crate::codegen::power::default_strategies;
    use crate::conversion::ConversionResolver;
    use crate::options::CompilerOptions;
    use formula_core::ast::Operator;
    use formula_core::types::TypeCatalog;
    use formula_core::{DecimalOracle, NumericOracle};
    use std::cell::RefCell;
    use std::sync::Arc;

    fn var(name: &str) -> Expression {
        Expression::variable(name)
    }

    fn lit(value: i64) -> Expression {
        Expression::literal(value)
    }

    /// Lower `expression` and return the root node with the compiled functions
    fn compile(expression: &Expression, expect: Type) -> Result<(Node, Vec<FunctionBody>)> {
        let options = CompilerOptions::new().expect_return(expect).with_input("y", Type::I32);
        let resolver = ConversionResolver::new(Arc::new(TypeCatalog::standard()));
        let builtins = BuiltinRegistry::with_defaults();
        let strategies = default_strategies();
        let oracle: Arc<dyn NumericOracle> = Arc::new(DecimalOracle::default());
        let backend = Backend::new(&options, &resolver, &builtins, &strategies, &oracle, None);

        let mut root = backend.root_context();
        let node = backend.lower(expression, &root)?;
        let table = root
            .remove::<RefCell<FunctionTable>>(FUNCTIONS)
            .expect("function table")
            .into_inner();
        Ok((node, table.finish()?))
    }

    fn factorial(value: Expression) -> Expression {
        // fact'(n) = if(n <= 1, 1, n * fact'(n - 1))
        let body = Expression::call(
            "if",
            vec![
                Expression::binary(var("n"), Operator::Le, lit(1)),
                lit(1),
                Expression::binary(
                    var("n"),
                    Operator::Mul,
                    Expression::prime_call("fact", vec![Expression::binary(var("n"), Operator::Sub, lit(1))]),
                ),
            ],
        );
        Expression::custom_definition("fact", vec![var("n")], body, value).unwrap()
    }

    #[test]
    fn test_recursive_function_compiled_once() {
        let (node, functions) = compile(&factorial(Expression::prime_call("fact", vec![lit(5)])), Type::F64).unwrap();

        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].name, "fact");
        assert_eq!(functions[0].parameters, vec![Type::F64]);
        assert_eq!(functions[0].return_type, Type::F64);
        assert!(matches!(node, Node::Call { function: FunctionId(0), ty: Type::F64, .. }));
    }

    #[test]
    fn test_specialised_per_argument_types() {
        // fact'(5) + fact'(y): y is an i32 input, 5 embeds as f64
        let value = Expression::binary(
            Expression::prime_call("fact", vec![lit(5)]),
            Operator::Add,
            Expression::prime_call("fact", vec![var("y")]),
        );
        let (_, functions) = compile(&factorial(value), Type::F64).unwrap();

        let signatures: Vec<&Vec<Type>> = functions.iter().map(|function| &function.parameters).collect();
        assert_eq!(signatures, vec![&vec![Type::F64], &vec![Type::I32]]);
    }

    #[test]
    fn test_parameters_become_locals() {
        let (_, functions) = compile(&factorial(Expression::prime_call("fact", vec![lit(5)])), Type::F64).unwrap();

        fn has_local(node: &Node) -> bool {
            match node {
                Node::Local { index: 0, .. } => true,
                Node::Condition {
                    condition,
                    then,
                    otherwise,
                    ..
                } => has_local(condition) || has_local(then) || has_local(otherwise),
                Node::Arith { left, right, .. } | Node::Compare { left, right, .. } => {
                    has_local(left) || has_local(right)
                }
                Node::Convert { operand, .. } => has_local(operand),
                _ => false,
            }
        }
        assert!(has_local(&functions[0].body));
    }

    #[test]
    fn test_arity_mismatch() {
        let expr = factorial(Expression::prime_call("fact", vec![lit(1), lit(2)]));
        let err = compile(&expr, Type::F64).unwrap_err();
        assert!(matches!(
            err.cause(),
            CompileError::ArityMismatch { actual: 2, .. }
        ));
    }

    #[test]
    fn test_undefined_prime_call() {
        let err = compile(&Expression::prime_call("g", vec![lit(1)]), Type::F64).unwrap_err();
        assert!(matches!(err.cause(), CompileError::UnknownFunction(name) if name == "g"));
    }

    #[test]
    fn test_failed_body_is_rolled_back() {
        let mut table = FunctionTable::default();
        let kept = table.reserve((0, vec![Type::F64]), Type::F64);
        table.store(
            kept,
            FunctionBody {
                name: "f".to_string(),
                parameters: vec![Type::F64],
                return_type: Type::F64,
                body: Node::constant(1.0),
            },
        );
        let failed = table.reserve((1, vec![Type::F64]), Type::F64);
        table.reserve((2, vec![Type::I32]), Type::I32);

        table.rollback(failed);
        assert_eq!(table.len(), 1);
        assert!(table.lookup(&(1, vec![Type::F64])).is_none());
        assert!(table.lookup(&(0, vec![Type::F64])).is_some());
        assert_eq!(table.finish().unwrap().len(), 1);
    }
}
