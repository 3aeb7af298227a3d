//! FormulaEngine - Main API for compiling and evaluating formulas

use crate::config::{EngineConfig, FormulaConfig, Parameter};
use crate::error::{Result, SdkError};
use formula_compiler::{BuiltinRegistry, Compiler, CompilerOptions, ConversionResolver, PowerStrategy};
use formula_core::ir::Program;
use formula_core::types::{Type, Value};
use formula_core::NumericOracle;
use formula_parser::ExpressionParser;
use formula_runtime::{EntryPoint, Executor};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// A compiled formula, callable with one value per parameter
#[derive(Debug, Clone)]
pub struct CompiledFormula {
    source: String,
    entry: EntryPoint,
}

impl CompiledFormula {
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Parameter names, in call order
    pub fn parameters(&self) -> &[String] {
        self.entry.parameters()
    }

    pub fn return_type(&self) -> &Type {
        self.entry.return_type()
    }

    pub fn program(&self) -> &Program {
        self.entry.program()
    }

    /// Evaluate with one value per parameter, in parameter order
    pub fn evaluate(&self, args: &[Value]) -> Result<Value> {
        Ok(self.entry.invoke(args)?)
    }

    /// Evaluate with values looked up by parameter name
    pub fn evaluate_named(&self, inputs: &HashMap<String, Value>) -> Result<Value> {
        Ok(self.entry.invoke_named(inputs)?)
    }
}

/// Main formula engine
///
/// Holds everything compilation needs (builtins, power strategies, the
/// conversion resolver and the numeric oracle) and the formulas named in
/// the configuration. Ad-hoc formulas can be compiled at any time with
/// [`FormulaEngine::compile`].
pub struct FormulaEngine {
    config: EngineConfig,
    resolver: ConversionResolver,
    builtins: BuiltinRegistry,
    power_strategies: Vec<Arc<dyn PowerStrategy>>,
    oracle: Arc<dyn NumericOracle>,
    executor: Executor,
    formulas: BTreeMap<String, CompiledFormula>,
}

impl FormulaEngine {
    pub(crate) fn new(
        config: EngineConfig,
        resolver: ConversionResolver,
        builtins: BuiltinRegistry,
        power_strategies: Vec<Arc<dyn PowerStrategy>>,
        oracle: Arc<dyn NumericOracle>,
    ) -> Result<Self> {
        config.validate()?;
        let executor = Executor::new(Arc::clone(&oracle)).with_max_call_depth(config.max_call_depth);

        let mut engine = Self {
            config,
            resolver,
            builtins,
            power_strategies,
            oracle,
            executor,
            formulas: BTreeMap::new(),
        };

        let configured = engine.config.formulas.clone();
        for (name, formula) in configured {
            let compiled = engine
                .compile_formula(&formula)
                .map_err(|err| SdkError::Formula {
                    name: name.clone(),
                    source: Box::new(err),
                })?;
            debug!("Compiled formula '{}': {}", name, formula.source);
            engine.formulas.insert(name, compiled);
        }

        info!(
            "Formula engine ready with {} formula(s), {} builtin(s), precision {}",
            engine.formulas.len(),
            engine.builtins.names().len(),
            engine.oracle.precision()
        );
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn oracle(&self) -> &Arc<dyn NumericOracle> {
        &self.oracle
    }

    /// Compile `source` with the engine-wide return type
    pub fn compile<P: Into<Parameter> + Clone>(&self, source: &str, parameters: &[P]) -> Result<CompiledFormula> {
        self.compile_formula(&FormulaConfig {
            source: source.to_string(),
            parameters: parameters.iter().cloned().map(Into::into).collect(),
            expect_return: None,
            restrictions: Vec::new(),
        })
    }

    /// Compile `source` to produce a value of type `expect_return`
    pub fn compile_as<P: Into<Parameter> + Clone>(
        &self,
        source: &str,
        parameters: &[P],
        expect_return: Type,
    ) -> Result<CompiledFormula> {
        self.compile_formula(&FormulaConfig {
            source: source.to_string(),
            parameters: parameters.iter().cloned().map(Into::into).collect(),
            expect_return: Some(expect_return),
            restrictions: Vec::new(),
        })
    }

    pub fn compile_formula(&self, formula: &FormulaConfig) -> Result<CompiledFormula> {
        let compiler = self.compiler_for(formula)?;
        let program = compiler.compile_source(&formula.source)?;

        let names: Vec<&str> = formula.parameters.iter().map(|p| p.name.as_str()).collect();
        let entry = EntryPoint::bind_with(Arc::new(program), &names, self.executor.clone())?;

        Ok(CompiledFormula {
            source: formula.source.clone(),
            entry,
        })
    }

    /// Formula named in the configuration
    pub fn formula(&self, name: &str) -> Result<&CompiledFormula> {
        self.formulas
            .get(name)
            .ok_or_else(|| SdkError::FormulaNotFound(name.to_string()))
    }

    pub fn formula_names(&self) -> impl Iterator<Item = &str> {
        self.formulas.keys().map(String::as_str)
    }

    /// Evaluate a configured formula with positional arguments
    pub fn evaluate(&self, name: &str, args: &[Value]) -> Result<Value> {
        self.formula(name)?.evaluate(args)
    }

    /// Evaluate a configured formula with named arguments
    pub fn evaluate_named(&self, name: &str, inputs: &HashMap<String, Value>) -> Result<Value> {
        self.formula(name)?.evaluate_named(inputs)
    }

    /// Compiler for one formula: the engine options with the formula's
    /// parameters, return type and restrictions added
    fn compiler_for(&self, formula: &FormulaConfig) -> Result<Compiler> {
        let mut options: CompilerOptions = self.config.compiler.clone();
        for parameter in &formula.parameters {
            options = options.with_input(parameter.name.clone(), parameter.ty.clone());
        }
        if let Some(ty) = &formula.expect_return {
            options = options.expect_return(ty.clone());
        }
        for restriction in &formula.restrictions {
            options = options.with_domain_restriction(ExpressionParser::parse(restriction)?);
        }

        Ok(Compiler::with_options(options)
            .with_resolver(self.resolver.clone())
            .with_builtins(self.builtins.clone())
            .with_power_strategies(self.power_strategies.clone())
            .with_oracle(Arc::clone(&self.oracle)))
    }
}

impl std::fmt::Debug for FormulaEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormulaEngine")
            .field("formulas", &self.formulas.keys().collect::<Vec<_>>())
            .field("builtins", &self.builtins)
            .field("oracle", &self.oracle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::FormulaEngineBuilder;
    use formula_core::types::{Type, Value};

    #[test]
    fn test_compile_and_evaluate() {
        let engine = FormulaEngineBuilder::new().build().unwrap();
        let formula = engine
            .compile("x * 2 + y", &[("x", Type::F64), ("y", Type::F64)])
            .unwrap();

        assert_eq!(formula.parameters(), &["x", "y"]);
        assert_eq!(formula.return_type(), &Type::F64);
        assert_eq!(
            formula.evaluate(&[Value::F64(1.5), Value::F64(1.0)]).unwrap(),
            Value::F64(4.0)
        );
    }

    #[test]
    fn test_compile_as() {
        let engine = FormulaEngineBuilder::new().build().unwrap();
        let formula = engine
            .compile_as("n > 3", &[("n", Type::I32)], Type::I64)
            .unwrap();

        assert_eq!(formula.evaluate(&[Value::I32(5)]).unwrap(), Value::I64(1));
        assert_eq!(formula.evaluate(&[Value::I32(2)]).unwrap(), Value::I64(0));
    }

    #[test]
    fn test_unknown_formula() {
        let engine = FormulaEngineBuilder::new().build().unwrap();
        let err = engine.evaluate("missing", &[]).unwrap_err();
        assert!(matches!(err, crate::SdkError::FormulaNotFound(name) if name == "missing"));
    }
}
