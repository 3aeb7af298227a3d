//! Constant folding
//!
//! Literal operands are combined at compile time with exact decimal
//! arithmetic. A fold only happens when its result is exactly what the
//! lowered program would compute at run time, whatever numeric type the
//! operation ends up lowered to: operands and result must be exact in
//! `f32` and the result must not need a wider integer type than the
//! operands. Operations that would round, overflow, divide by zero or leave
//! the mathematical domain stay in the tree.

use super::{OptimizationPass, Rewrite};
use crate::error::Result;
use bigdecimal::BigDecimal;
use formula_core::ast::{Expression, Operator, UnaryOperator};
use formula_core::numeric::divide;
use formula_core::types::value::is_integral;
use formula_core::{NumericOracle, ScopedContext};
use num_bigint::BigUint;
use num_traits::{Signed, ToPrimitive, Zero};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::warn;

pub struct LiteralCombiner {
    oracle: Arc<dyn NumericOracle>,
    ignore: BTreeSet<Operator>,
}

impl LiteralCombiner {
    pub fn new(oracle: Arc<dyn NumericOracle>, ignore: BTreeSet<Operator>) -> Self {
        Self { oracle, ignore }
    }

    fn reorders(&self, op: Operator) -> bool {
        op.is_associative() && !self.ignore.contains(&op)
    }

    /// Fold every literal operand into the position of the first one
    fn fold_all(&self, op: Operator, args: Vec<Expression>) -> Vec<Expression> {
        let mut folded: Vec<Expression> = Vec::with_capacity(args.len());
        let mut literal_at: Option<usize> = None;

        for arg in args {
            let Expression::Literal(value) = arg else {
                folded.push(arg);
                continue;
            };
            match literal_at {
                None => {
                    literal_at = Some(folded.len());
                    folded.push(Expression::Literal(value));
                }
                Some(index) => {
                    let combined = folded[index]
                        .as_literal()
                        .and_then(|acc| self.fold_pair(op, acc, &value));
                    match combined {
                        Some(combined) => folded[index] = Expression::Literal(combined),
                        None => folded.push(Expression::Literal(value)),
                    }
                }
            }
        }
        folded
    }

    /// Fold the leading run of literal operands, left to right
    fn fold_leading(&self, op: Operator, args: Vec<Expression>) -> Vec<Expression> {
        let mut rest = args.into_iter().peekable();
        let mut acc = match rest.next() {
            Some(first) => first,
            None => return Vec::new(),
        };

        while let (Some(left), Some(right)) = (acc.as_literal(), rest.peek().and_then(Expression::as_literal)) {
            match self.fold_pair(op, left, right) {
                Some(value) => {
                    acc = Expression::Literal(value);
                    rest.next();
                }
                None => break,
            }
        }

        std::iter::once(acc).chain(rest).collect()
    }

    fn fold_pair(&self, op: Operator, a: &BigDecimal, b: &BigDecimal) -> Option<BigDecimal> {
        let truth = |holds: bool| Some(BigDecimal::from(holds as i32));
        let (p, q) = (!a.is_zero(), !b.is_zero());
        match op {
            Operator::Add => exact_everywhere(&[a, b], a + b),
            Operator::Sub => exact_everywhere(&[a, b], a - b),
            Operator::Mul => exact_everywhere(&[a, b], a * b),
            Operator::Div => {
                let quotient = divide(a, b, self.oracle.precision()).ok()?;
                if !is_integral(&quotient) || &quotient * b != *a {
                    return None;
                }
                exact_everywhere(&[a, b], quotient.with_scale(0))
            }
            Operator::Mod if is_integral(a) && is_integral(b) && !b.is_zero() => {
                exact_everywhere(&[a, b], a % b)
            }
            Operator::Mod => None,
            Operator::Power => self
                .fold_power(a, b)
                .and_then(|value| exact_everywhere(&[a, b], value)),
            Operator::Eq => truth(a == b),
            Operator::Neq => truth(a != b),
            Operator::Lt => truth(a < b),
            Operator::Gt => truth(a > b),
            Operator::Le => truth(a <= b),
            Operator::Ge => truth(a >= b),
            Operator::And => truth(p && q),
            Operator::NAnd => truth(!(p && q)),
            Operator::Or => truth(p || q),
            Operator::NOr => truth(!(p || q)),
            Operator::Xor => truth(p != q),
            Operator::XNor => truth(p == q),
        }
    }

    /// Integral powers whose result fits the oracle precision
    fn fold_power(&self, base: &BigDecimal, exponent: &BigDecimal) -> Option<BigDecimal> {
        if !is_integral(base) || !is_integral(exponent) || exponent.is_negative() {
            return None;
        }
        let n = exponent.to_u64()?;
        let estimate = digit_count(base).checked_mul(n)?;
        if estimate > self.oracle.precision() {
            return None;
        }
        match self.oracle.pow(base, exponent) {
            Ok(value) => Some(value.with_scale(0)),
            Err(err) => {
                warn!("Leaving {} ^ {} unfolded: {}", base, exponent, err);
                None
            }
        }
    }

    fn fold_unary(&self, op: UnaryOperator, value: &BigDecimal) -> Option<BigDecimal> {
        match op {
            // negation is exact in every type; only the integer range can change
            UnaryOperator::Negate => {
                let negated = -value;
                (integer_range(&negated) <= integer_range(value)).then_some(negated)
            }
            UnaryOperator::Not => Some(BigDecimal::from(value.is_zero() as i32)),
            UnaryOperator::Factorial => match self.oracle.factorial(value) {
                Ok(result) if digit_count(&result) <= self.oracle.precision() => {
                    exact_everywhere(&[value], result)
                }
                Ok(_) => None,
                Err(err) => {
                    warn!("Leaving {}! unfolded: {}", value, err);
                    None
                }
            },
        }
    }
}

/// Smallest literal type holding `value`: 0 for `i32`, 1 for `i64`,
/// 2 for decimal
fn integer_range(value: &BigDecimal) -> u8 {
    if !is_integral(value) {
        2
    } else if value.to_i32().is_some() {
        0
    } else if value.to_i64().is_some() {
        1
    } else {
        2
    }
}

/// `result` when folding `operands` into it gives the same value in every
/// numeric type the operation may be lowered to
fn exact_everywhere(operands: &[&BigDecimal], result: BigDecimal) -> Option<BigDecimal> {
    let widest = operands.iter().map(|v| integer_range(v)).max().unwrap_or(0);
    let any_fraction = operands.iter().any(|v| !is_integral(v));

    // an integral result of fractional operands would switch integer
    // contexts from decimal to integer arithmetic
    if any_fraction && is_integral(&result) {
        return None;
    }
    if is_integral(&result) && integer_range(&result) > widest {
        return None;
    }
    if !operands.iter().all(|v| exact_in_f32(v)) || !exact_in_f32(&result) {
        return None;
    }
    Some(result)
}

/// Whether `value` converts to `f32`, and so to `f64`, without rounding
fn exact_in_f32(value: &BigDecimal) -> bool {
    let (digits, scale) = value.normalized().as_bigint_and_exponent();
    if digits.is_zero() {
        return true;
    }
    if scale.unsigned_abs() > 160 {
        return false;
    }

    // value = mantissa * 2^exponent
    let mut mantissa: BigUint = digits.magnitude().clone();
    let mut exponent = 0i64;
    if scale > 0 {
        let fives = BigUint::from(5u32).pow(scale as u32);
        if !(&mantissa % &fives).is_zero() {
            return false;
        }
        mantissa /= fives;
        exponent -= scale;
    } else {
        mantissa *= BigUint::from(5u32).pow(scale.unsigned_abs() as u32);
        exponent -= scale;
    }
    let twos = mantissa.trailing_zeros().unwrap_or(0);
    mantissa >>= twos;
    exponent += twos as i64;

    mantissa.bits() <= 24 && exponent >= -149 && exponent + mantissa.bits() as i64 <= 128
}

/// Digits in the integer part
fn digit_count(value: &BigDecimal) -> u64 {
    let (digits, _) = value.with_scale(0).as_bigint_and_exponent();
    digits.magnitude().to_string().len() as u64
}

impl OptimizationPass for LiteralCombiner {
    fn name(&self) -> &'static str {
        "literal_combiner"
    }

    fn exit(&self, expression: Expression, _ctx: &mut ScopedContext<'_>) -> Result<Rewrite> {
        let folded = match expression {
            Expression::Binary { op, args } => {
                let args = if self.reorders(op) {
                    self.fold_all(op, args)
                } else {
                    self.fold_leading(op, args)
                };
                Expression::nary(op, args)
            }
            Expression::Unary { op, operand } => match operand.as_literal().and_then(|v| self.fold_unary(op, v)) {
                Some(value) => Expression::Literal(value),
                None => Expression::Unary { op, operand },
            },
            other => other,
        };
        Ok(Rewrite::keep(folded))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::OptimizationPipeline;
    use formula_core::DecimalOracle;
    use std::str::FromStr;

    fn fold(expr: Expression) -> Expression {
        fold_with(expr, BTreeSet::new())
    }

    fn fold_with(expr: Expression, ignore: BTreeSet<Operator>) -> Expression {
        OptimizationPipeline::new()
            .add_pass(LiteralCombiner::new(Arc::new(DecimalOracle::default()), ignore))
            .run(expr)
            .unwrap()
            .expression
    }

    fn lit(value: &str) -> Expression {
        Expression::Literal(BigDecimal::from_str(value).unwrap())
    }

    fn var(name: &str) -> Expression {
        Expression::variable(name)
    }

    #[test]
    fn test_folds_exact_arithmetic() {
        let expr = Expression::binary(lit("0.5"), Operator::Add, lit("0.25"));
        assert_eq!(fold(expr), lit("0.75"));

        // (2 * 3) - 1
        let expr = Expression::binary(
            Expression::binary(lit("2"), Operator::Mul, lit("3")),
            Operator::Sub,
            lit("1"),
        );
        assert_eq!(fold(expr), lit("5"));
    }

    #[test]
    fn test_binary_fractions_are_kept() {
        // 0.1 and 0.2 round when lowered to a float type
        let expr = Expression::binary(lit("0.1"), Operator::Add, lit("0.2"));
        assert_eq!(fold(expr.clone()), expr);

        // fractional operands with an integral sum would turn decimal
        // arithmetic into integer arithmetic
        let expr = Expression::binary(lit("0.5"), Operator::Add, lit("0.5"));
        assert_eq!(fold(expr.clone()), expr);
    }

    #[test]
    fn test_integer_range_is_preserved() {
        // overflows i32 at run time when lowered as i32
        let expr = Expression::binary(lit("2147483647"), Operator::Add, lit("1"));
        assert_eq!(fold(expr.clone()), expr);

        let expr = Expression::binary(lit("2"), Operator::Power, lit("40"));
        assert_eq!(fold(expr.clone()), expr);

        let expr = Expression::unary(UnaryOperator::Negate, lit("-2147483648"));
        assert_eq!(fold(expr.clone()), expr);

        // exceeds the f32 mantissa
        let expr = Expression::binary(lit("16777216"), Operator::Add, lit("1"));
        assert_eq!(fold(expr.clone()), expr);
    }

    #[test]
    fn test_exact_in_f32() {
        for exact in ["0", "0.75", "-3.5", "1024", "16777216", "1099511627776", "0.000030517578125"] {
            assert!(exact_in_f32(&BigDecimal::from_str(exact).unwrap()), "{}", exact);
        }
        for inexact in ["0.1", "16777217", "1e40", "0.3"] {
            assert!(!exact_in_f32(&BigDecimal::from_str(inexact).unwrap()), "{}", inexact);
        }
    }

    #[test]
    fn test_commutative_folds_anywhere() {
        let expr = Expression::nary(Operator::Add, vec![lit("2"), var("x"), lit("3"), var("y")]);
        assert_eq!(
            fold(expr),
            Expression::nary(Operator::Add, vec![lit("5"), var("x"), var("y")])
        );

        let expr = Expression::nary(Operator::Mul, vec![var("x"), lit("2"), lit("4")]);
        assert_eq!(fold(expr), Expression::nary(Operator::Mul, vec![var("x"), lit("8")]));
    }

    #[test]
    fn test_opted_out_operator_folds_leading_run_only() {
        let expr = Expression::nary(Operator::Add, vec![lit("1"), lit("2"), var("x"), lit("3")]);
        let folded = fold_with(expr, [Operator::Add].into_iter().collect());
        assert_eq!(folded, Expression::nary(Operator::Add, vec![lit("3"), var("x"), lit("3")]));
    }

    #[test]
    fn test_non_commutative_leading_run() {
        // 10 - 4 - x - 1 folds to 6 - x - 1
        let expr = Expression::nary(Operator::Sub, vec![lit("10"), lit("4"), var("x"), lit("1")]);
        assert_eq!(
            fold(expr),
            Expression::nary(Operator::Sub, vec![lit("6"), var("x"), lit("1")])
        );
    }

    #[test]
    fn test_inexact_division_is_kept() {
        let third = Expression::binary(lit("1"), Operator::Div, lit("3"));
        assert_eq!(fold(third.clone()), third);

        let half = Expression::binary(lit("1"), Operator::Div, lit("2"));
        assert_eq!(fold(half.clone()), half);

        let exact = Expression::binary(lit("12"), Operator::Div, lit("4"));
        assert_eq!(fold(exact), lit("3"));
    }

    #[test]
    fn test_division_by_zero_is_kept() {
        let expr = Expression::binary(lit("1"), Operator::Div, lit("0"));
        assert_eq!(fold(expr.clone()), expr);

        let expr = Expression::binary(lit("7"), Operator::Mod, lit("0"));
        assert_eq!(fold(expr.clone()), expr);

        let expr = Expression::binary(lit("7"), Operator::Mod, lit("3"));
        assert_eq!(fold(expr), lit("1"));
    }

    #[test]
    fn test_power() {
        let expr = Expression::binary(lit("2"), Operator::Power, lit("10"));
        assert_eq!(fold(expr), lit("1024"));

        // fractional and negative exponents are evaluated at run time
        let root = Expression::binary(lit("2"), Operator::Power, lit("0.5"));
        assert_eq!(fold(root.clone()), root);
        let inverse = Expression::binary(lit("2"), Operator::Power, lit("-1"));
        assert_eq!(fold(inverse.clone()), inverse);

        // too many digits for the oracle precision
        let huge = Expression::binary(lit("123456789"), Operator::Power, lit("100"));
        assert_eq!(fold(huge.clone()), huge);
    }

    #[test]
    fn test_boolean_folds_to_one_or_zero() {
        let expr = Expression::binary(lit("3"), Operator::Lt, lit("4"));
        assert_eq!(fold(expr), lit("1"));

        let expr = Expression::binary(lit("3"), Operator::Xor, lit("4"));
        assert_eq!(fold(expr), lit("0"));

        let expr = Expression::binary(lit("0"), Operator::NOr, lit("0"));
        assert_eq!(fold(expr), lit("1"));
    }

    #[test]
    fn test_unary_folding() {
        assert_eq!(fold(Expression::unary(UnaryOperator::Negate, lit("2.5"))), lit("-2.5"));
        assert_eq!(fold(Expression::unary(UnaryOperator::Not, lit("0"))), lit("1"));
        assert_eq!(fold(Expression::unary(UnaryOperator::Factorial, lit("5"))), lit("120"));

        // non-integral factorial needs the gamma extension at run time
        let expr = Expression::unary(UnaryOperator::Factorial, lit("0.5"));
        assert_eq!(fold(expr.clone()), expr);
    }

    #[test]
    fn test_nested_folding_inside_calls() {
        let expr = Expression::call("sin", vec![Expression::binary(lit("1"), Operator::Add, lit("1"))]);
        assert_eq!(fold(expr), Expression::call("sin", vec![lit("2")]));
    }

    #[test]
    fn test_idempotent() {
        let expr = Expression::nary(
            Operator::Add,
            vec![
                Expression::binary(lit("2"), Operator::Power, lit("3")),
                var("x"),
                Expression::binary(lit("1"), Operator::Div, lit("3")),
                lit("4"),
            ],
        );
        let once = fold(expr);
        let twice = fold(once.clone());
        assert_eq!(once, twice);
    }
}
