//! Builder pattern for FormulaEngine

use crate::config::{EngineConfig, FormulaConfig};
use crate::engine::FormulaEngine;
use crate::error::Result;
use formula_compiler::codegen::default_strategies;
use formula_compiler::{Builtin, BuiltinRegistry, CompilerOptions, ConversionCache, ConversionResolver, PowerStrategy};
use formula_core::types::{Type, TypeCatalog};
use formula_core::{DecimalOracle, NumericOracle};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Builder for FormulaEngine
///
/// # Example
///
/// ```rust,ignore
/// use formula_sdk::{FormulaConfig, FormulaEngineBuilder};
/// use formula_core::Type;
///
/// // From a configuration file
/// let engine = FormulaEngineBuilder::new()
///     .with_config_file("formulas.yaml")?
///     .build()?;
///
/// // Manual configuration
/// let engine = FormulaEngineBuilder::new()
///     .expect_return(Type::Decimal)
///     .add_formula("area", FormulaConfig::new("pi * r ^ 2").with_parameter("r", Type::Decimal))
///     .build()?;
/// ```
pub struct FormulaEngineBuilder {
    config: EngineConfig,
    builtins: BuiltinRegistry,
    power_strategies: Vec<Arc<dyn PowerStrategy>>,
    catalog: Option<TypeCatalog>,
    cache: Option<Arc<ConversionCache>>,
    oracle: Option<Arc<dyn NumericOracle>>,
}

impl FormulaEngineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            config: EngineConfig::new(),
            builtins: BuiltinRegistry::new(),
            power_strategies: Vec::new(),
            catalog: None,
            cache: None,
            oracle: None,
        }
    }

    // ========== Configuration ==========

    /// Replace the whole configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Load the configuration from a YAML or JSON file
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        self.config = EngineConfig::from_file(path)?;
        info!(
            "Loaded engine configuration from {} ({} formula(s))",
            path.display(),
            self.config.formulas.len()
        );
        Ok(self)
    }

    pub fn with_compiler_options(mut self, options: CompilerOptions) -> Self {
        self.config.compiler = options;
        self
    }

    /// Set the engine-wide return type
    pub fn expect_return(mut self, ty: Type) -> Self {
        self.config.compiler.expect_return = ty;
        self
    }

    /// Allow rewrites that narrow a formula's domain behind a restriction
    pub fn allow_domain_changing_optimizations(mut self, allow: bool) -> Self {
        self.config.compiler.allow_domain_changing_optimizations = allow;
        self
    }

    /// Set significant digits of decimal results
    pub fn with_precision(mut self, precision: u64) -> Self {
        self.config.precision = precision;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.config.max_call_depth = depth;
        self
    }

    /// Add a named formula, compiled by `build`
    pub fn add_formula(mut self, name: impl Into<String>, formula: FormulaConfig) -> Self {
        self.config.formulas.insert(name.into(), formula);
        self
    }

    // ========== Extension Points ==========

    /// Register a builtin; it takes precedence over the default builtins
    pub fn with_builtin(mut self, builtin: impl Builtin + 'static) -> Self {
        self.builtins.register(builtin);
        self
    }

    /// Register a power strategy, tried before the default ones
    pub fn with_power_strategy(mut self, strategy: impl PowerStrategy + 'static) -> Self {
        self.power_strategies.push(Arc::new(strategy));
        self
    }

    /// Use a custom type catalog instead of the standard one
    pub fn with_catalog(mut self, catalog: TypeCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Share a conversion cache with other engines using the same catalog
    pub fn with_cache(mut self, cache: Arc<ConversionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use a custom numeric oracle; the configured precision is ignored
    pub fn with_oracle(mut self, oracle: Arc<dyn NumericOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Build the formula engine, compiling every configured formula
    pub fn build(self) -> Result<FormulaEngine> {
        self.config.validate()?;

        let catalog = Arc::new(self.catalog.unwrap_or_else(TypeCatalog::standard));
        let resolver = match self.cache {
            Some(cache) => ConversionResolver::with_cache(catalog, cache),
            None => ConversionResolver::new(catalog),
        };

        let mut builtins = self.builtins;
        builtins.extend(BuiltinRegistry::with_defaults());

        let mut power_strategies = self.power_strategies;
        power_strategies.extend(default_strategies());

        let precision = self.config.precision;
        let oracle = self
            .oracle
            .unwrap_or_else(|| Arc::new(DecimalOracle::new(precision)) as Arc<dyn NumericOracle>);

        FormulaEngine::new(self.config, resolver, builtins, power_strategies, oracle)
    }
}

impl Default for FormulaEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
