//! Configuration types for FormulaEngine
//!
//! An [`EngineConfig`] can be written in YAML or JSON:
//!
//! ```yaml
//! precision: 40
//! compiler:
//!   expect_return: decimal
//! formulas:
//!   area:
//!     source: "pi * r ^ 2"
//!     parameters:
//!       - { name: r, type: decimal }
//! ```

use crate::error::{Result, SdkError};
use formula_compiler::CompilerOptions;
use formula_core::types::Type;
use formula_runtime::DEFAULT_MAX_CALL_DEPTH;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default number of significant digits for decimal math
pub const DEFAULT_PRECISION: u64 = 50;

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Options shared by every formula
    pub compiler: CompilerOptions,

    /// Significant digits of decimal results
    pub precision: u64,

    /// Deepest nesting of local function calls at evaluation time
    pub max_call_depth: usize,

    /// Formulas compiled when the engine is built, by name
    pub formulas: BTreeMap<String, FormulaConfig>,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            compiler: CompilerOptions::default(),
            precision: DEFAULT_PRECISION,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            formulas: BTreeMap::new(),
        }
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file; `.json` files are read as JSON, anything
    /// else as YAML
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Add a named formula
    pub fn with_formula(mut self, name: impl Into<String>, formula: FormulaConfig) -> Self {
        self.formulas.insert(name.into(), formula);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.precision == 0 {
            return Err(SdkError::ConfigError("precision must be at least 1".to_string()));
        }
        if self.max_call_depth == 0 {
            return Err(SdkError::ConfigError("max_call_depth must be at least 1".to_string()));
        }
        for (name, formula) in &self.formulas {
            formula
                .validate()
                .map_err(|err| SdkError::ConfigError(format!("formula '{}': {}", name, err)))?;
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A formula and the parameters it is called with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaConfig {
    pub source: String,

    /// Call order of the formula's inputs
    #[serde(default)]
    pub parameters: Vec<Parameter>,

    /// Overrides the engine-wide return type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_return: Option<Type>,

    /// Predicates, in source form, under which evaluation fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub restrictions: Vec<String>,
}

impl FormulaConfig {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            parameters: Vec::new(),
            expect_return: None,
            restrictions: Vec::new(),
        }
    }

    /// Builder method to append a parameter
    pub fn with_parameter(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.parameters.push(Parameter::new(name, ty));
        self
    }

    pub fn expect_return(mut self, ty: Type) -> Self {
        self.expect_return = Some(ty);
        self
    }

    pub fn with_restriction(mut self, restriction: impl Into<String>) -> Self {
        self.restrictions.push(restriction.into());
        self
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.source.trim().is_empty() {
            return Err("empty source".to_string());
        }
        for (index, parameter) in self.parameters.iter().enumerate() {
            if self.parameters[..index]
                .iter()
                .any(|earlier| earlier.name == parameter.name)
            {
                return Err(format!("duplicate parameter '{}'", parameter.name));
            }
        }
        Ok(())
    }
}

/// A named, typed formula input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl<S: Into<String>> From<(S, Type)> for Parameter {
    fn from((name, ty): (S, Type)) -> Self {
        Self::new(name, ty)
    }
}
