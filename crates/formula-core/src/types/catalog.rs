//! Type catalog: declared types, subtyping and conversion operators

use super::ty::Type;
use super::value::Value;
use crate::error::{CoreError, Result};
use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Function applying a single conversion operator
pub type ConversionFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;

/// Whether an operator may be applied without the user asking for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConversionKind {
    Implicit,
    Explicit,
}

/// A declared conversion from one type to another
#[derive(Clone)]
pub struct ConversionOperator {
    pub name: String,
    pub from: Type,
    pub to: Type,
    pub kind: ConversionKind,
    pub func: ConversionFn,
}

impl ConversionOperator {
    pub fn new<F>(name: impl Into<String>, from: Type, to: Type, kind: ConversionKind, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            from,
            to,
            kind,
            func: Arc::new(func),
        }
    }

    pub fn implicit<F>(name: impl Into<String>, from: Type, to: Type, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(name, from, to, ConversionKind::Implicit, func)
    }

    pub fn explicit<F>(name: impl Into<String>, from: Type, to: Type, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self::new(name, from, to, ConversionKind::Explicit, func)
    }

    pub fn is_implicit(&self) -> bool {
        self.kind == ConversionKind::Implicit
    }

    pub fn apply(&self, value: &Value) -> Result<Value> {
        (self.func)(value)
    }
}

impl fmt::Debug for ConversionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionOperator")
            .field("name", &self.name)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("kind", &self.kind)
            .finish()
    }
}

impl PartialEq for ConversionOperator {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.from == other.from
            && self.to == other.to
            && self.kind == other.kind
    }
}

/// Declaration of a catalog type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    pub name: Type,
    pub supertype: Option<Type>,
    pub members: BTreeMap<String, Type>,
    pub conversions: Vec<ConversionOperator>,
}

impl TypeDeclaration {
    pub fn new(name: Type) -> Self {
        Self {
            name,
            supertype: None,
            members: BTreeMap::new(),
            conversions: Vec::new(),
        }
    }

    pub fn with_supertype(mut self, supertype: Type) -> Self {
        self.supertype = Some(supertype);
        self
    }

    pub fn with_member(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.members.insert(name.into(), ty);
        self
    }

    pub fn with_conversion(mut self, conversion: ConversionOperator) -> Self {
        self.conversions.push(conversion);
        self
    }
}

/// Registry of declared types and the conversion operators between them
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    declarations: Vec<TypeDeclaration>,
}

impl TypeCatalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with the built-in decimal conversions
    pub fn standard() -> Self {
        let decimal = TypeDeclaration::new(Type::Decimal)
            .with_conversion(ConversionOperator::implicit(
                "i32_to_decimal",
                Type::I32,
                Type::Decimal,
                |value| match value {
                    Value::I32(v) => Ok(Value::Decimal(BigDecimal::from(*v))),
                    other => Err(unexpected(other, &Type::I32)),
                },
            ))
            .with_conversion(ConversionOperator::implicit(
                "i64_to_decimal",
                Type::I64,
                Type::Decimal,
                |value| match value {
                    Value::I64(v) => Ok(Value::Decimal(BigDecimal::from(*v))),
                    other => Err(unexpected(other, &Type::I64)),
                },
            ))
            .with_conversion(ConversionOperator::implicit(
                "f64_to_decimal",
                Type::F64,
                Type::Decimal,
                |value| match value {
                    Value::F64(v) => value.to_decimal().map(Value::Decimal).ok_or_else(|| {
                        CoreError::InvalidValue(format!("{} has no decimal representation", v))
                    }),
                    other => Err(unexpected(other, &Type::F64)),
                },
            ))
            .with_conversion(ConversionOperator::explicit(
                "decimal_to_f64",
                Type::Decimal,
                Type::F64,
                |value| match value {
                    Value::Decimal(v) => v
                        .to_f64()
                        .filter(|f| f.is_finite())
                        .map(Value::F64)
                        .ok_or_else(|| CoreError::Overflow(format!("{} does not fit f64", v))),
                    other => Err(unexpected(other, &Type::Decimal)),
                },
            ))
            .with_conversion(ConversionOperator::explicit(
                "decimal_to_i64",
                Type::Decimal,
                Type::I64,
                |value| match value {
                    Value::Decimal(v) => v
                        .with_scale(0)
                        .to_i64()
                        .map(Value::I64)
                        .ok_or_else(|| CoreError::Overflow(format!("{} does not fit i64", v))),
                    other => Err(unexpected(other, &Type::Decimal)),
                },
            ));

        let mut catalog = Self::new();
        catalog.declare(decimal);
        catalog
    }

    /// Register a type declaration, replacing an earlier one with the same name
    pub fn declare(&mut self, declaration: TypeDeclaration) {
        tracing::debug!("Declaring type {}", declaration.name);
        self.declarations.retain(|d| d.name != declaration.name);
        self.declarations.push(declaration);
    }

    pub fn declaration(&self, ty: &Type) -> Option<&TypeDeclaration> {
        self.declarations.iter().find(|d| &d.name == ty)
    }

    pub fn declarations(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.declarations.iter()
    }

    /// True when `sub` equals `sup` or reaches it through declared supertypes
    pub fn is_subtype(&self, sub: &Type, sup: &Type) -> bool {
        let mut seen = HashSet::new();
        let mut current = sub.clone();
        loop {
            if &current == sup {
                return true;
            }
            if !seen.insert(current.clone()) {
                return false;
            }
            match self.declaration(&current).and_then(|d| d.supertype.clone()) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Type of a member, searching supertypes
    pub fn member_type(&self, ty: &Type, member: &str) -> Option<Type> {
        let mut seen = HashSet::new();
        let mut current = ty.clone();
        while seen.insert(current.clone()) {
            let declaration = self.declaration(&current)?;
            if let Some(member_ty) = declaration.members.get(member) {
                return Some(member_ty.clone());
            }
            current = declaration.supertype.clone()?;
        }
        None
    }

    /// Every declared operator whose source or target is `ty`, in declaration order
    pub fn operators_on(&self, ty: &Type) -> Vec<ConversionOperator> {
        self.declarations
            .iter()
            .flat_map(|d| d.conversions.iter())
            .filter(|op| &op.from == ty || &op.to == ty)
            .cloned()
            .collect()
    }
}

fn unexpected(value: &Value, expected: &Type) -> CoreError {
    CoreError::TypeError(format!("expected {}, found {}", expected, value.ty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn point_catalog() -> TypeCatalog {
        let mut catalog = TypeCatalog::standard();
        catalog.declare(
            TypeDeclaration::new(Type::named("Shape")).with_member("area", Type::F64),
        );
        catalog.declare(
            TypeDeclaration::new(Type::named("Circle"))
                .with_supertype(Type::named("Shape"))
                .with_member("radius", Type::F64),
        );
        catalog
    }

    #[test]
    fn test_standard_operators() {
        let catalog = TypeCatalog::standard();
        let names: Vec<String> = catalog
            .operators_on(&Type::Decimal)
            .into_iter()
            .map(|op| op.name)
            .collect();

        assert_eq!(
            names,
            vec![
                "i32_to_decimal",
                "i64_to_decimal",
                "f64_to_decimal",
                "decimal_to_f64",
                "decimal_to_i64"
            ]
        );
        assert_eq!(catalog.operators_on(&Type::I32).len(), 1);
        assert!(catalog.operators_on(&Type::Bool).is_empty());
    }

    #[test]
    fn test_decimal_to_i64_truncates() {
        let catalog = TypeCatalog::standard();
        let op = catalog
            .operators_on(&Type::Decimal)
            .into_iter()
            .find(|op| op.name == "decimal_to_i64")
            .unwrap();

        let value = Value::Decimal(BigDecimal::from_str("41.9").unwrap());
        assert_eq!(op.apply(&value).unwrap(), Value::I64(41));

        let huge = Value::Decimal(BigDecimal::from_str("1e30").unwrap());
        assert!(matches!(op.apply(&huge), Err(CoreError::Overflow(_))));
    }

    #[test]
    fn test_subtyping() {
        let catalog = point_catalog();
        let circle = Type::named("Circle");
        let shape = Type::named("Shape");

        assert!(catalog.is_subtype(&circle, &shape));
        assert!(catalog.is_subtype(&circle, &circle));
        assert!(!catalog.is_subtype(&shape, &circle));
        assert!(!catalog.is_subtype(&Type::I32, &Type::I64));
    }

    #[test]
    fn test_subtype_cycle_terminates() {
        let mut catalog = TypeCatalog::new();
        catalog.declare(TypeDeclaration::new(Type::named("A")).with_supertype(Type::named("B")));
        catalog.declare(TypeDeclaration::new(Type::named("B")).with_supertype(Type::named("A")));

        assert!(catalog.is_subtype(&Type::named("A"), &Type::named("B")));
        assert!(!catalog.is_subtype(&Type::named("A"), &Type::named("C")));
    }

    #[test]
    fn test_member_type_inherited() {
        let catalog = point_catalog();
        let circle = Type::named("Circle");

        assert_eq!(catalog.member_type(&circle, "radius"), Some(Type::F64));
        assert_eq!(catalog.member_type(&circle, "area"), Some(Type::F64));
        assert_eq!(catalog.member_type(&circle, "volume"), None);
    }

    #[test]
    fn test_redeclare_replaces() {
        let mut catalog = point_catalog();
        catalog.declare(TypeDeclaration::new(Type::named("Shape")));
        assert_eq!(catalog.member_type(&Type::named("Shape"), "area"), None);
    }
}
