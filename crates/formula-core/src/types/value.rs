//! Runtime value types for Formula programs
//!
//! The `Value` enum represents every value an executable program can
//! produce or receive through an input slot. Each variant maps to exactly
//! one [`Type`].

use super::ty::Type;
use crate::error::{CoreError, Result};
use bigdecimal::BigDecimal;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Runtime value type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Decimal(BigDecimal),
    Str(String),
    /// Instance of a catalog-declared type
    Object(ObjectValue),
}

/// Instance of a declared type with named fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectValue {
    pub type_name: String,
    pub fields: BTreeMap<String, Value>,
}

impl ObjectValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder method to add a field
    pub fn with_field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

impl Value {
    /// Static type of this value
    pub fn ty(&self) -> Type {
        match self {
            Value::Bool(_) => Type::Bool,
            Value::I32(_) => Type::I32,
            Value::I64(_) => Type::I64,
            Value::F32(_) => Type::F32,
            Value::F64(_) => Type::F64,
            Value::Decimal(_) => Type::Decimal,
            Value::Str(_) => Type::Str,
            Value::Object(object) => Type::Named(object.type_name.clone()),
        }
    }

    pub fn decimal(value: BigDecimal) -> Self {
        Value::Decimal(value)
    }

    /// Zero of a numeric type
    pub fn zero(ty: &Type) -> Option<Value> {
        Some(match ty {
            Type::I32 => Value::I32(0),
            Type::I64 => Value::I64(0),
            Type::F32 => Value::F32(0.0),
            Type::F64 => Value::F64(0.0),
            Type::Decimal => Value::Decimal(BigDecimal::zero()),
            _ => return None,
        })
    }

    /// One of a numeric type
    pub fn one(ty: &Type) -> Option<Value> {
        Some(match ty {
            Type::I32 => Value::I32(1),
            Type::I64 => Value::I64(1),
            Type::F32 => Value::F32(1.0),
            Type::F64 => Value::F64(1.0),
            Type::Decimal => Value::Decimal(BigDecimal::from(1)),
            _ => return None,
        })
    }

    /// Truth value: zero is false, nonzero is true
    pub fn is_truthy(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::I32(v) => Ok(*v != 0),
            Value::I64(v) => Ok(*v != 0),
            Value::F32(v) => Ok(*v != 0.0),
            Value::F64(v) => Ok(*v != 0.0),
            Value::Decimal(v) => Ok(!v.is_zero()),
            other => Err(CoreError::TypeError(format!(
                "{} has no truth value",
                other.ty()
            ))),
        }
    }

    /// Embed a decimal constant as a value of `ty`.
    ///
    /// Integer targets require an integral value that fits; float targets
    /// accept any finite approximation.
    pub fn from_decimal(value: &BigDecimal, ty: &Type) -> Result<Value> {
        let out_of_range = || CoreError::Overflow(format!("{} does not fit {}", value, ty));
        match ty {
            Type::Bool => Ok(Value::Bool(!value.is_zero())),
            Type::I32 | Type::I64 if !is_integral(value) => Err(CoreError::InvalidValue(format!(
                "{} is not an integer",
                value
            ))),
            Type::I32 => value.to_i32().map(Value::I32).ok_or_else(out_of_range),
            Type::I64 => value.to_i64().map(Value::I64).ok_or_else(out_of_range),
            Type::F32 => value
                .to_f32()
                .filter(|v| v.is_finite())
                .map(Value::F32)
                .ok_or_else(out_of_range),
            Type::F64 => value
                .to_f64()
                .filter(|v| v.is_finite())
                .map(Value::F64)
                .ok_or_else(out_of_range),
            Type::Decimal => Ok(Value::Decimal(value.clone())),
            other => Err(CoreError::TypeError(format!(
                "cannot embed number {} as {}",
                value, other
            ))),
        }
    }

    /// Exact decimal view of a numeric or boolean value
    pub fn to_decimal(&self) -> Option<BigDecimal> {
        match self {
            Value::Bool(b) => Some(BigDecimal::from(*b as i32)),
            Value::I32(v) => Some(BigDecimal::from(*v)),
            Value::I64(v) => Some(BigDecimal::from(*v)),
            Value::F32(v) => BigDecimal::from_f32(*v),
            Value::F64(v) => BigDecimal::from_f64(*v),
            Value::Decimal(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// Cast between primitive numeric types.
    ///
    /// Narrowing that does not fit the target raises `Overflow`; float to
    /// integer truncates toward zero.
    pub fn cast_primitive(&self, to: &Type) -> Result<Value> {
        let overflow = || CoreError::Overflow(format!("{} does not fit {}", self, to));
        let value = match (self, to) {
            (Value::I32(v), Type::I32) => Value::I32(*v),
            (Value::I32(v), Type::I64) => Value::I64(*v as i64),
            (Value::I32(v), Type::F32) => Value::F32(*v as f32),
            (Value::I32(v), Type::F64) => Value::F64(*v as f64),
            (Value::I64(v), Type::I32) => Value::I32(i32::try_from(*v).map_err(|_| overflow())?),
            (Value::I64(v), Type::I64) => Value::I64(*v),
            (Value::I64(v), Type::F32) => Value::F32(*v as f32),
            (Value::I64(v), Type::F64) => Value::F64(*v as f64),
            (Value::F32(v), Type::F32) => Value::F32(*v),
            (Value::F32(v), Type::F64) => Value::F64(*v as f64),
            (Value::F32(v), Type::I32) => Value::I32(float_to_int(*v as f64).ok_or_else(overflow)?),
            (Value::F32(v), Type::I64) => Value::I64(float_to_int(*v as f64).ok_or_else(overflow)?),
            (Value::F64(v), Type::F64) => Value::F64(*v),
            (Value::F64(v), Type::F32) => {
                let narrowed = *v as f32;
                if v.is_finite() && !narrowed.is_finite() {
                    return Err(overflow());
                }
                Value::F32(narrowed)
            }
            (Value::F64(v), Type::I32) => Value::I32(float_to_int(*v).ok_or_else(overflow)?),
            (Value::F64(v), Type::I64) => Value::I64(float_to_int(*v).ok_or_else(overflow)?),
            (value, to) => {
                return Err(CoreError::TypeError(format!(
                    "no primitive cast from {} to {}",
                    value.ty(),
                    to
                )))
            }
        };
        Ok(value)
    }

    /// Project a field of an object value
    pub fn member(&self, name: &str) -> Result<Value> {
        match self {
            Value::Object(object) => object.fields.get(name).cloned().ok_or_else(|| {
                CoreError::MemberNotFound(format!("{}.{}", object.type_name, name))
            }),
            other => Err(CoreError::MemberNotFound(format!(
                "{} has no member {}",
                other.ty(),
                name
            ))),
        }
    }
}

fn float_to_int<T: FromPrimitive>(value: f64) -> Option<T> {
    let truncated = value.trunc();
    if !truncated.is_finite() {
        return None;
    }
    T::from_f64(truncated)
}

/// True when the decimal has no fractional part
pub fn is_integral(value: &BigDecimal) -> bool {
    value.with_scale(0) == *value
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Object(object) => {
                write!(f, "{} {{", object.type_name)?;
                for (i, (name, value)) in object.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, " {}: {}", name, value)?;
                }
                f.write_str(" }")
            }
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::I32(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::I64(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::F64(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<BigDecimal> for Value {
    fn from(value: BigDecimal) -> Self {
        Value::Decimal(value)
    }
}
