//! High-precision decimal math

use crate::error::{CoreError, Result};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};
use std::fmt;
use std::sync::Arc;

/// Extra digits carried through intermediate computations
const GUARD_DIGITS: u64 = 10;

/// Largest argument accepted by `exp`
const MAX_EXP_ARGUMENT: i64 = 100_000;

/// Largest integer exponent computed by repeated squaring
const MAX_INTEGER_EXPONENT: i64 = 1_000_000;

/// Largest argument accepted by `factorial`
const MAX_FACTORIAL: u64 = 10_000;

const MAX_ITERATIONS: usize = 200;

/// Gamma function extension used for non-integral factorials
pub type GammaFn = Arc<dyn Fn(&BigDecimal) -> Result<BigDecimal> + Send + Sync>;

/// Transcendental functions on decimals
///
/// Implementations must be thread-safe: compiled programs share one
/// oracle across every evaluation.
pub trait NumericOracle: Send + Sync + fmt::Debug {
    /// Natural exponential
    fn exp(&self, x: &BigDecimal) -> Result<BigDecimal>;

    /// Natural logarithm, defined for `x > 0`
    fn ln(&self, x: &BigDecimal) -> Result<BigDecimal>;

    /// `x` raised to `y`
    fn pow(&self, x: &BigDecimal, y: &BigDecimal) -> Result<BigDecimal>;

    /// `x!` for non-negative integers
    fn factorial(&self, x: &BigDecimal) -> Result<BigDecimal>;

    /// Significant digits of every result
    fn precision(&self) -> u64;

    fn sqrt(&self, x: &BigDecimal) -> Result<BigDecimal> {
        if x.is_negative() {
            return Err(CoreError::Domain(format!("sqrt({})", x)));
        }
        if x.is_zero() {
            return Ok(BigDecimal::zero());
        }
        self.pow(x, &BigDecimal::new(BigInt::from(5), 1))
    }
}

/// Precision-bounded decimal oracle
#[derive(Clone)]
pub struct DecimalOracle {
    precision: u64,
    gamma: Option<GammaFn>,
}

impl DecimalOracle {
    pub fn new(precision: u64) -> Self {
        Self {
            precision: precision.max(1),
            gamma: None,
        }
    }

    /// Builder method to install a gamma function for non-integral factorials
    pub fn with_gamma<F>(mut self, gamma: F) -> Self
    where
        F: Fn(&BigDecimal) -> Result<BigDecimal> + Send + Sync + 'static,
    {
        self.gamma = Some(Arc::new(gamma));
        self
    }

    fn working_digits(&self) -> u64 {
        self.precision + GUARD_DIGITS
    }

    fn exp_with(&self, x: &BigDecimal, digits: u64) -> Result<BigDecimal> {
        if x.is_zero() {
            return Ok(BigDecimal::one());
        }
        if x.abs() > BigDecimal::from(MAX_EXP_ARGUMENT) {
            if x.is_negative() {
                return Ok(BigDecimal::zero());
            }
            return Err(CoreError::Overflow(format!("exp({})", x)));
        }
        if x.is_negative() {
            let positive = self.exp_with(&-x, digits)?;
            return divide(&BigDecimal::one(), &positive, digits);
        }

        // Halve until the series converges quickly, then square back
        let half = BigDecimal::new(BigInt::from(5), 1);
        let limit = half.clone();
        let mut reduced = x.clone();
        let mut halvings = 0u64;
        while reduced > limit {
            reduced = &reduced * &half;
            halvings += 1;
        }

        let working = digits + GUARD_DIGITS + halvings;
        let epsilon = BigDecimal::new(BigInt::one(), working as i64);
        let mut sum = BigDecimal::one();
        let mut term = BigDecimal::one();
        for n in 1..=MAX_ITERATIONS {
            term = divide(&(&term * &reduced), &BigDecimal::from(n as u64), working)?;
            sum = (&sum + &term).with_prec(working);
            if term.abs() < epsilon {
                break;
            }
        }

        for _ in 0..halvings {
            sum = (&sum * &sum).with_prec(working);
        }
        Ok(sum.with_prec(digits))
    }

    fn ln_with(&self, x: &BigDecimal, digits: u64) -> Result<BigDecimal> {
        if !x.is_positive() {
            return Err(CoreError::Domain(format!("ln({})", x)));
        }
        if x.is_one() {
            return Ok(BigDecimal::zero());
        }

        let working = digits + GUARD_DIGITS;
        let epsilon = BigDecimal::new(BigInt::one(), working as i64);
        let two = BigDecimal::from(2);
        let mut y = initial_ln_estimate(x)?;
        for _ in 0..MAX_ITERATIONS {
            let e = self.exp_with(&y, working)?;
            let delta = divide(&(&two * &(x - &e)), &(x + &e), working)?;
            y = (&y + &delta).with_prec(working);
            if delta.abs() < epsilon {
                break;
            }
        }
        Ok(y.with_prec(digits))
    }
}

impl Default for DecimalOracle {
    fn default() -> Self {
        Self::new(50)
    }
}

impl fmt::Debug for DecimalOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecimalOracle")
            .field("precision", &self.precision)
            .field("gamma", &self.gamma.is_some())
            .finish()
    }
}

impl NumericOracle for DecimalOracle {
    fn exp(&self, x: &BigDecimal) -> Result<BigDecimal> {
        self.exp_with(x, self.precision)
    }

    fn ln(&self, x: &BigDecimal) -> Result<BigDecimal> {
        self.ln_with(x, self.precision)
    }

    fn pow(&self, x: &BigDecimal, y: &BigDecimal) -> Result<BigDecimal> {
        let working = self.working_digits();

        if is_integral(y) {
            if let Some(n) = y.to_i64().filter(|n| n.abs() <= MAX_INTEGER_EXPONENT) {
                if n == 0 {
                    return Ok(BigDecimal::one());
                }
                if x.is_zero() {
                    return if n < 0 {
                        Err(CoreError::DivisionByZero)
                    } else {
                        Ok(BigDecimal::zero())
                    };
                }
                let magnitude = integer_power(x, n.unsigned_abs(), working);
                let result = if n < 0 {
                    divide(&BigDecimal::one(), &magnitude, working)?
                } else {
                    magnitude
                };
                return Ok(result.with_prec(self.precision));
            }
        }

        if x.is_zero() {
            return if y.is_negative() {
                Err(CoreError::DivisionByZero)
            } else {
                Ok(BigDecimal::zero())
            };
        }
        if x.is_negative() {
            return Err(CoreError::Domain(format!("{} ^ {}", x, y)));
        }

        let log = self.ln_with(x, working)?;
        let product = (y * &log).with_prec(working);
        self.exp_with(&product, self.precision)
    }

    fn factorial(&self, x: &BigDecimal) -> Result<BigDecimal> {
        if !is_integral(x) {
            return match &self.gamma {
                Some(gamma) => gamma(&(x + BigDecimal::one())),
                None => Err(CoreError::NotSupported(format!(
                    "factorial of non-integer {}",
                    x
                ))),
            };
        }
        if x.is_negative() {
            return Err(CoreError::Domain(format!("{}!", x)));
        }

        let n = x
            .to_u64()
            .filter(|n| *n <= MAX_FACTORIAL)
            .ok_or_else(|| CoreError::Overflow(format!("{}!", x)))?;
        let product = (2..=n).fold(BigInt::one(), |acc, k| acc * BigInt::from(k));
        Ok(BigDecimal::new(product, 0))
    }

    fn precision(&self) -> u64 {
        self.precision
    }
}

/// True when `x` has no fractional part
fn is_integral(x: &BigDecimal) -> bool {
    x.with_scale(0) == *x
}

fn integer_power(base: &BigDecimal, mut exponent: u64, working: u64) -> BigDecimal {
    let mut result = BigDecimal::one();
    let mut square = base.clone();
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = (&result * &square).with_prec(working);
        }
        exponent >>= 1;
        if exponent > 0 {
            square = (&square * &square).with_prec(working);
        }
    }
    result
}

/// `numerator / denominator` truncated to `digits` significant digits
pub fn divide(numerator: &BigDecimal, denominator: &BigDecimal, digits: u64) -> Result<BigDecimal> {
    if denominator.is_zero() {
        return Err(CoreError::DivisionByZero);
    }
    if numerator.is_zero() {
        return Ok(BigDecimal::zero());
    }

    let (num_int, num_scale) = numerator.as_bigint_and_exponent();
    let (den_int, den_scale) = denominator.as_bigint_and_exponent();
    let shift = (digits as i64 + digit_count(&den_int) - digit_count(&num_int) + 1).max(0);
    let scaled = num_int * BigInt::from(10).pow(shift as u32);
    let quotient = scaled / den_int;
    Ok(BigDecimal::new(quotient, num_scale - den_scale + shift).with_prec(digits))
}

fn digit_count(value: &BigInt) -> i64 {
    value.magnitude().to_string().len() as i64
}

fn initial_ln_estimate(x: &BigDecimal) -> Result<BigDecimal> {
    let (mantissa, scale) = x.as_bigint_and_exponent();
    let text = mantissa.magnitude().to_string();
    let leading: String = text.chars().take(17).collect();
    let fraction: f64 = format!("0.{}", leading)
        .parse()
        .map_err(|_| CoreError::InvalidValue(format!("ln({})", x)))?;
    let decade = text.len() as i64 - scale;
    let estimate = fraction.ln() + decade as f64 * std::f64::consts::LN_10;
    BigDecimal::from_f64(estimate).ok_or_else(|| CoreError::InvalidValue(format!("ln({})", x)))
}
