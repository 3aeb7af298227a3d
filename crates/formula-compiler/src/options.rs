//! Compiler options
//!
//! Options are plain data: they are set between compilations and read
//! while compiling. Every field has a default so partial YAML/JSON
//! documents deserialize.

use formula_core::ast::{Expression, Operator};
use formula_core::types::Type;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Thresholds for the function inlining pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InliningOptions {
    pub enabled: bool,
    /// Definitions whose body has more nodes than this are compiled as closures
    pub max_size: usize,
    /// Deepest nesting of local definitions that is still inlined
    pub max_depth: usize,
}

impl Default for InliningOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 64,
            max_depth: 16,
        }
    }
}

/// Compiler options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerOptions {
    /// Type of the value produced by compiled programs
    pub expect_return: Type,

    /// Input slots by name
    pub inputs: BTreeMap<String, Type>,

    /// Skip every domain restriction guard
    pub ignore_domain_restrictions: bool,

    /// Allow rewrites that narrow the domain of the expression
    /// (`exp(ln(x))` to `x`); each one adds a restriction
    pub allow_domain_changing_optimizations: bool,

    /// Predicates that abort evaluation when they hold, outermost first
    pub domain_restrictions: Vec<Expression>,

    /// Operators whose chains are neither flattened nor reordered
    pub ignore_commutativity_for: BTreeSet<Operator>,

    pub inlining: InliningOptions,

    /// Enable folding of literal operands
    pub enable_literal_folding: bool,

    /// Enable flattening of associative chains
    pub enable_binary_combining: bool,

    /// Enable `e^x` and `exp`/`ln` simplifications
    pub enable_exponent_simplification: bool,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            expect_return: Type::F64,
            inputs: BTreeMap::new(),
            ignore_domain_restrictions: false,
            allow_domain_changing_optimizations: false,
            domain_restrictions: Vec::new(),
            ignore_commutativity_for: BTreeSet::new(),
            inlining: InliningOptions::default(),
            enable_literal_folding: true,
            enable_binary_combining: true,
            enable_exponent_simplification: true,
        }
    }
}

impl CompilerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the return type
    pub fn expect_return(mut self, ty: Type) -> Self {
        self.expect_return = ty;
        self
    }

    /// Builder method to declare an input slot
    pub fn with_input(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.inputs.insert(name.into(), ty);
        self
    }

    /// Builder method to add a domain restriction
    pub fn with_domain_restriction(mut self, restriction: Expression) -> Self {
        self.domain_restrictions.push(restriction);
        self
    }

    pub fn allow_domain_changing_optimizations(mut self, allow: bool) -> Self {
        self.allow_domain_changing_optimizations = allow;
        self
    }

    pub fn ignore_domain_restrictions(mut self, ignore: bool) -> Self {
        self.ignore_domain_restrictions = ignore;
        self
    }

    /// Builder method to exclude an operator from flattening and reordering
    pub fn ignore_commutativity(mut self, op: Operator) -> Self {
        self.ignore_commutativity_for.insert(op);
        self
    }

    pub fn with_inlining(mut self, inlining: InliningOptions) -> Self {
        self.inlining = inlining;
        self
    }

    /// Disable every optimization pass
    pub fn without_optimizations(mut self) -> Self {
        self.inlining.enabled = false;
        self.enable_literal_folding = false;
        self.enable_binary_combining = false;
        self.enable_exponent_simplification = false;
        self
    }

    /// Whether `op` may be flattened and have its operands reordered
    pub fn is_commutative(&self, op: Operator) -> bool {
        op.is_associative() && !self.ignore_commutativity_for.contains(&op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = CompilerOptions::default();
        assert_eq!(options.expect_return, Type::F64);
        assert!(options.inlining.enabled);
        assert_eq!(options.inlining.max_size, 64);
        assert!(options.is_commutative(Operator::Add));
        assert!(!options.is_commutative(Operator::Sub));
    }

    #[test]
    fn test_ignore_commutativity() {
        let options = CompilerOptions::new().ignore_commutativity(Operator::Mul);
        assert!(!options.is_commutative(Operator::Mul));
        assert!(options.is_commutative(Operator::Add));
    }

    #[test]
    fn test_partial_yaml() {
        let yaml = r#"
expect_return: decimal
inputs:
  x: decimal
  n: i32
ignore_commutativity_for: [add]
inlining:
  max_size: 8
"#;
        let options: CompilerOptions = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(options.expect_return, Type::Decimal);
        assert_eq!(options.inputs.get("n"), Some(&Type::I32));
        assert!(!options.is_commutative(Operator::Add));
        assert_eq!(options.inlining.max_size, 8);
        assert_eq!(options.inlining.max_depth, 16);
        assert!(options.enable_literal_folding);
    }

    #[test]
    fn test_json_round_trip() {
        let options = CompilerOptions::new()
            .expect_return(Type::I64)
            .with_input("y", Type::I64)
            .with_domain_restriction(Expression::binary(
                Expression::variable("y"),
                Operator::Eq,
                Expression::literal(0),
            ));

        let json = serde_json::to_string(&options).unwrap();
        let parsed: CompilerOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, options);
    }
}
