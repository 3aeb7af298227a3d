//! Main compiler
//!
//! Runs the optimization pipeline over an expression, lowers the result
//! with the backend and wraps it in the domain restriction guards.

use crate::codegen::hint::{FUNCTIONS, SLOTS};
use crate::codegen::power::{default_strategies, PowerStrategy};
use crate::codegen::{restrictions, Backend, Builtin, BuiltinRegistry, FunctionTable};
use crate::conversion::{ConversionCache, ConversionResolver};
use crate::error::Result;
use crate::optimizer::OptimizationPipeline;
use crate::options::CompilerOptions;
use formula_core::ast::Expression;
use formula_core::ir::{Program, ProgramMetadata, SlotInfo};
use formula_core::types::TypeCatalog;
use formula_core::{DecimalOracle, NumericOracle};
use formula_parser::{ExpressionParser, SourceMap};
use std::cell::RefCell;
use std::sync::Arc;
use tracing::debug;

/// The Formula compiler
///
/// Options can only change between compilations; `compile` borrows the
/// compiler immutably for its whole duration.
pub struct Compiler {
    options: CompilerOptions,
    resolver: ConversionResolver,
    builtins: BuiltinRegistry,
    power_strategies: Vec<Arc<dyn PowerStrategy>>,
    oracle: Arc<dyn NumericOracle>,
}

impl Compiler {
    /// Create a new compiler instance with default options
    pub fn new() -> Self {
        Self::with_options(CompilerOptions::default())
    }

    /// Create a new compiler instance with custom options
    pub fn with_options(options: CompilerOptions) -> Self {
        Self {
            options,
            resolver: ConversionResolver::new(Arc::new(TypeCatalog::standard())),
            builtins: BuiltinRegistry::with_defaults(),
            power_strategies: default_strategies(),
            oracle: Arc::new(DecimalOracle::default()),
        }
    }

    /// Replace the type catalog; conversion paths are resolved afresh
    pub fn with_catalog(mut self, catalog: TypeCatalog) -> Self {
        self.resolver = ConversionResolver::new(Arc::new(catalog));
        self
    }

    /// Share a conversion cache with other compilers using the same catalog
    pub fn with_cache(mut self, cache: Arc<ConversionCache>) -> Self {
        self.resolver = ConversionResolver::with_cache(Arc::clone(self.resolver.catalog()), cache);
        self
    }

    /// Use an existing resolver, sharing its catalog and cache
    pub fn with_resolver(mut self, resolver: ConversionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_builtin(mut self, builtin: impl Builtin + 'static) -> Self {
        self.builtins.register(builtin);
        self
    }

    pub fn with_builtins(mut self, builtins: BuiltinRegistry) -> Self {
        self.builtins = builtins;
        self
    }

    /// Append a power strategy, tried after the ones already registered
    pub fn with_power_strategy(mut self, strategy: impl PowerStrategy + 'static) -> Self {
        self.power_strategies.push(Arc::new(strategy));
        self
    }

    pub fn with_power_strategies(mut self, strategies: Vec<Arc<dyn PowerStrategy>>) -> Self {
        self.power_strategies = strategies;
        self
    }

    pub fn with_oracle(mut self, oracle: Arc<dyn NumericOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut CompilerOptions {
        &mut self.options
    }

    pub fn resolver(&self) -> &ConversionResolver {
        &self.resolver
    }

    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    pub fn oracle(&self) -> &Arc<dyn NumericOracle> {
        &self.oracle
    }

    /// Parse and compile source text
    pub fn compile_source(&self, source: &str) -> Result<Program> {
        let (expression, source_map) = ExpressionParser::parse_with_source_map(source)?;
        self.compile_with(&expression, Some(&source_map), ProgramMetadata::for_source(source))
    }

    /// Compile an expression tree into an IR program
    pub fn compile(&self, expression: &Expression) -> Result<Program> {
        self.compile_with(expression, None, ProgramMetadata::default())
    }

    fn compile_with(
        &self,
        expression: &Expression,
        source_map: Option<&SourceMap>,
        mut metadata: ProgramMetadata,
    ) -> Result<Program> {
        debug!("Compiling `{}` to {}", expression, self.options.expect_return);

        let pipeline = OptimizationPipeline::for_options(&self.options, Arc::clone(&self.oracle));
        let optimized = pipeline.run(expression.clone())?;
        debug!("Optimized to `{}`", optimized.expression);

        let backend = Backend::new(
            &self.options,
            &self.resolver,
            &self.builtins,
            &self.power_strategies,
            &self.oracle,
            source_map,
        );
        let mut root = backend.root_context();

        let node = backend.lower(&optimized.expression, &root)?;
        let node = backend
            .coerce(node, &self.options.expect_return)
            .map_err(|err| err.at(&optimized.expression, backend.span_of(&optimized.expression)))?;

        let restrictions: Vec<Expression> = if self.options.ignore_domain_restrictions {
            Vec::new()
        } else {
            self.options
                .domain_restrictions
                .iter()
                .cloned()
                .chain(optimized.restrictions)
                .collect()
        };
        let node = restrictions::guard(&backend, node, &restrictions, &root)?;
        metadata.restrictions = restrictions.iter().map(ToString::to_string).collect();

        let slots = root
            .remove::<RefCell<Vec<SlotInfo>>>(SLOTS)
            .map(RefCell::into_inner)
            .unwrap_or_default();
        let functions = root
            .remove::<RefCell<FunctionTable>>(FUNCTIONS)
            .map(RefCell::into_inner)
            .unwrap_or_default()
            .finish()?;

        debug!(
            "Compiled {} nodes, {} function(s), {} slot(s), {} restriction(s)",
            node.node_count(),
            functions.len(),
            slots.len(),
            metadata.restrictions.len()
        );

        Ok(Program::new(node, metadata)
            .with_slots(slots)
            .with_functions(functions))
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use formula_core::ir::Node;
    use formula_core::types::{Type, Value};

    #[test]
    fn test_compile_source_records_metadata() {
        let compiler = Compiler::with_options(
            CompilerOptions::new()
                .expect_return(Type::F64)
                .with_input("x", Type::F64),
        );

        let program = compiler.compile_source("x * 2 + 1").unwrap();
        assert_eq!(program.metadata.source.as_deref(), Some("x * 2 + 1"));
        assert_eq!(program.slot_names(), vec!["x"]);
        assert_eq!(program.return_type, Type::F64);
        assert!(program.functions.is_empty());
    }

    #[test]
    fn test_constant_program_folds() {
        let compiler = Compiler::with_options(CompilerOptions::new().expect_return(Type::I64));
        let program = compiler.compile_source("2 * 3 + 4").unwrap();
        assert_eq!(program.root, Node::Constant(Value::I64(10)));
    }

    #[test]
    fn test_result_converted_to_expected_type() {
        let compiler = Compiler::with_options(
            CompilerOptions::new()
                .expect_return(Type::Decimal)
                .with_input("n", Type::I32),
        );
        let program = compiler.compile_source("abs(n)").unwrap();
        assert_eq!(program.return_type, Type::Decimal);
        assert!(matches!(program.root, Node::Convert { .. }));
    }

    #[test]
    fn test_restrictions_guard_the_program() {
        let options = CompilerOptions::new()
            .expect_return(Type::Decimal)
            .with_input("x", Type::Decimal)
            .with_domain_restriction(
                ExpressionParser::parse("x = 0").unwrap(),
            );
        let compiler = Compiler::with_options(options);

        let program = compiler.compile_source("1 / (2 * x)").unwrap();
        assert_eq!(program.metadata.restrictions, vec!["x = 0"]);
        assert!(matches!(program.root, Node::Guard { .. }));

        let mut compiler = compiler;
        compiler.options_mut().ignore_domain_restrictions = true;
        let program = compiler.compile_source("1 / (2 * x)").unwrap();
        assert!(program.metadata.restrictions.is_empty());
        assert!(!matches!(program.root, Node::Guard { .. }));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = Compiler::new().compile_source("1 +").unwrap_err();
        assert!(matches!(err, CompileError::Parse(_)));
    }

    #[test]
    fn test_lowering_error_has_span() {
        let err = Compiler::new().compile_source("1 + zz").unwrap_err();
        match err {
            CompileError::Lowering { expression, span, .. } => {
                assert_eq!(expression, Expression::variable("zz"));
                assert_eq!(span.map(|span| span.range()), Some(4..6));
            }
            other => panic!("Expected Lowering, got {:?}", other),
        }
    }
}
