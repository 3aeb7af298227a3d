//! Numeric support for decimal evaluation and constant folding

pub mod oracle;

pub use oracle::{divide, DecimalOracle, GammaFn, NumericOracle};
