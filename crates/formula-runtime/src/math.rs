//! Builtin math functions
//!
//! Floats use the platform functions; decimals use the numeric oracle.
//! Arguments outside a function's domain raise `CoreError::Domain` instead
//! of producing NaN.

use bigdecimal::BigDecimal;
use formula_core::error::Result;
use formula_core::ir::MathFunction;
use formula_core::numeric::divide;
use formula_core::types::Value;
use formula_core::{CoreError, NumericOracle};
use num_traits::{One, Signed};

/// Apply `function` to arguments that all have the same type
pub fn apply(function: MathFunction, args: &[Value], oracle: &dyn NumericOracle) -> Result<Value> {
    if args.len() != function.arity() {
        return Err(CoreError::InvalidOperation(format!(
            "{} takes {} argument(s), got {}",
            function.name(),
            function.arity(),
            args.len()
        )));
    }

    match args {
        [Value::F64(x)] => unary_float(function, *x).map(Value::F64),
        [Value::F32(x)] => unary_float(function, *x as f64).map(|v| Value::F32(v as f32)),
        [Value::F64(a), Value::F64(b)] => binary_float(function, *a, *b).map(Value::F64),
        [Value::F32(a), Value::F32(b)] => {
            binary_float(function, *a as f64, *b as f64).map(|v| Value::F32(v as f32))
        }
        [Value::Decimal(x)] => unary_decimal(function, x, oracle).map(Value::Decimal),
        [Value::Decimal(a), Value::Decimal(b)] => binary_decimal(function, a, b, oracle).map(Value::Decimal),
        [Value::I32(x)] => integer(function, *x as i64).and_then(|v| {
            i32::try_from(v)
                .map(Value::I32)
                .map_err(|_| CoreError::Overflow(format!("{}({})", function.name(), x)))
        }),
        [Value::I64(x)] => integer(function, *x).map(Value::I64),
        [Value::I32(a), Value::I32(b)] => integer_pair(function, *a, *b).map(Value::I32),
        [Value::I64(a), Value::I64(b)] => integer_pair(function, *a, *b).map(Value::I64),
        _ => Err(CoreError::TypeError(format!(
            "{} is not defined on ({})",
            function.name(),
            args.iter()
                .map(|arg| arg.ty().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

fn domain(function: MathFunction, x: impl std::fmt::Display) -> CoreError {
    CoreError::Domain(format!("{}({})", function.name(), x))
}

fn unary_float(function: MathFunction, x: f64) -> Result<f64> {
    Ok(match function {
        MathFunction::Exp => x.exp(),
        MathFunction::Ln if x <= 0.0 => return Err(domain(function, x)),
        MathFunction::Ln => x.ln(),
        MathFunction::Sqrt if x < 0.0 => return Err(domain(function, x)),
        MathFunction::Sqrt => x.sqrt(),
        MathFunction::Sin => x.sin(),
        MathFunction::Cos => x.cos(),
        MathFunction::Tan => x.tan(),
        MathFunction::Asin | MathFunction::Acos if !(-1.0..=1.0).contains(&x) => {
            return Err(domain(function, x))
        }
        MathFunction::Asin => x.asin(),
        MathFunction::Acos => x.acos(),
        MathFunction::Atan => x.atan(),
        MathFunction::Abs => x.abs(),
        MathFunction::Floor => x.floor(),
        MathFunction::Ceil => x.ceil(),
        MathFunction::Round => x.round(),
        MathFunction::Log | MathFunction::Min | MathFunction::Max => {
            return Err(CoreError::InvalidOperation(format!("{} takes two arguments", function.name())))
        }
    })
}

fn binary_float(function: MathFunction, a: f64, b: f64) -> Result<f64> {
    match function {
        MathFunction::Log => {
            if a <= 0.0 || a == 1.0 || b <= 0.0 {
                return Err(CoreError::Domain(format!("log({}, {})", a, b)));
            }
            Ok(b.ln() / a.ln())
        }
        MathFunction::Min => Ok(a.min(b)),
        MathFunction::Max => Ok(a.max(b)),
        other => Err(CoreError::InvalidOperation(format!("{} takes one argument", other.name()))),
    }
}

fn unary_decimal(function: MathFunction, x: &BigDecimal, oracle: &dyn NumericOracle) -> Result<BigDecimal> {
    match function {
        MathFunction::Exp => oracle.exp(x),
        MathFunction::Ln => oracle.ln(x),
        MathFunction::Sqrt => oracle.sqrt(x),
        MathFunction::Abs => Ok(x.abs()),
        MathFunction::Floor => Ok(floor(x)),
        MathFunction::Ceil => Ok(-floor(&-x)),
        MathFunction::Round => Ok(round_half_away(x)),
        other => Err(CoreError::NotSupported(format!("decimal {}", other.name()))),
    }
}

fn binary_decimal(
    function: MathFunction,
    a: &BigDecimal,
    b: &BigDecimal,
    oracle: &dyn NumericOracle,
) -> Result<BigDecimal> {
    match function {
        MathFunction::Log => {
            if *a == BigDecimal::one() {
                return Err(CoreError::Domain(format!("log({}, {})", a, b)));
            }
            let numerator = oracle.ln(b)?;
            let denominator = oracle.ln(a)?;
            divide(&numerator, &denominator, oracle.precision())
        }
        MathFunction::Min => Ok(a.min(b).clone()),
        MathFunction::Max => Ok(a.max(b).clone()),
        other => Err(CoreError::InvalidOperation(format!("{} takes one argument", other.name()))),
    }
}

fn integer(function: MathFunction, x: i64) -> Result<i64> {
    match function {
        MathFunction::Abs => x
            .checked_abs()
            .ok_or_else(|| CoreError::Overflow(format!("abs({})", x))),
        MathFunction::Floor | MathFunction::Ceil | MathFunction::Round => Ok(x),
        other => Err(CoreError::TypeError(format!("{} is not defined on integers", other.name()))),
    }
}

fn integer_pair<T: Ord>(function: MathFunction, a: T, b: T) -> Result<T> {
    match function {
        MathFunction::Min => Ok(a.min(b)),
        MathFunction::Max => Ok(a.max(b)),
        other => Err(CoreError::TypeError(format!("{} is not defined on integers", other.name()))),
    }
}

/// Largest integer not above `x`
fn floor(x: &BigDecimal) -> BigDecimal {
    let truncated = x.with_scale(0);
    if x.is_negative() && truncated != *x {
        truncated - BigDecimal::one()
    } else {
        truncated
    }
}

fn round_half_away(x: &BigDecimal) -> BigDecimal {
    let half = BigDecimal::one() / BigDecimal::from(2);
    if x.is_negative() {
        -floor(&(-x + &half))
    } else {
        floor(&(x + &half))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formula_core::DecimalOracle;
    use std::str::FromStr;

    fn dec(text: &str) -> BigDecimal {
        BigDecimal::from_str(text).unwrap()
    }

    fn apply_default(function: MathFunction, args: &[Value]) -> Result<Value> {
        apply(function, args, &DecimalOracle::default())
    }

    #[test]
    fn test_float_functions() {
        assert_eq!(apply_default(MathFunction::Sqrt, &[Value::F64(9.0)]).unwrap(), Value::F64(3.0));
        assert_eq!(apply_default(MathFunction::Round, &[Value::F64(-2.5)]).unwrap(), Value::F64(-3.0));
        assert_eq!(
            apply_default(MathFunction::Max, &[Value::F64(1.0), Value::F64(2.0)]).unwrap(),
            Value::F64(2.0)
        );
        match apply_default(MathFunction::Log, &[Value::F64(2.0), Value::F64(8.0)]).unwrap() {
            Value::F64(v) => assert!((v - 3.0).abs() < 1e-12),
            other => panic!("Expected f64, got {:?}", other),
        }
    }

    #[test]
    fn test_domain_errors() {
        for (function, x) in [
            (MathFunction::Ln, 0.0),
            (MathFunction::Sqrt, -1.0),
            (MathFunction::Asin, 1.5),
        ] {
            let err = apply_default(function, &[Value::F64(x)]).unwrap_err();
            assert!(matches!(err, CoreError::Domain(_)), "{:?}", err);
        }
    }

    #[test]
    fn test_decimal_rounding() {
        let cases = [
            (MathFunction::Floor, "-1.5", "-2"),
            (MathFunction::Floor, "1.5", "1"),
            (MathFunction::Ceil, "1.2", "2"),
            (MathFunction::Ceil, "-1.2", "-1"),
            (MathFunction::Round, "2.5", "3"),
            (MathFunction::Round, "-2.5", "-3"),
            (MathFunction::Round, "2.4", "2"),
        ];
        for (function, input, expected) in cases {
            assert_eq!(
                apply_default(function, &[Value::Decimal(dec(input))]).unwrap(),
                Value::Decimal(dec(expected)),
                "{}({})",
                function.name(),
                input
            );
        }
    }

    #[test]
    fn test_decimal_sqrt_and_log() {
        match apply_default(MathFunction::Sqrt, &[Value::Decimal(dec("2.25"))]).unwrap() {
            Value::Decimal(v) => assert!((v - dec("1.5")).abs() < dec("1e-40")),
            other => panic!("Expected decimal, got {:?}", other),
        }
        match apply_default(MathFunction::Log, &[Value::Decimal(dec("10")), Value::Decimal(dec("1000"))]).unwrap() {
            Value::Decimal(v) => assert!((v - dec("3")).abs() < dec("1e-40")),
            other => panic!("Expected decimal, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_functions() {
        assert_eq!(apply_default(MathFunction::Abs, &[Value::I32(-4)]).unwrap(), Value::I32(4));
        assert_eq!(
            apply_default(MathFunction::Min, &[Value::I64(3), Value::I64(-7)]).unwrap(),
            Value::I64(-7)
        );
        assert!(apply_default(MathFunction::Abs, &[Value::I32(i32::MIN)]).is_err());
        assert!(apply_default(MathFunction::Exp, &[Value::I32(1)]).is_err());
    }

    #[test]
    fn test_mixed_types_rejected() {
        let err = apply_default(MathFunction::Min, &[Value::I32(1), Value::F64(2.0)]).unwrap_err();
        assert!(matches!(err, CoreError::TypeError(_)));
    }
}
