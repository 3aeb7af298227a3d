//! Extend the compiler with a host function and a power strategy
//!
//! `clamp(x, lo, hi)` is a host function called at evaluation time.
//! `Square` lowers `x ^ 2` to `x * x`; registered strategies are tried
//! before the default ones.

use formula_compiler::{Backend, HostBuiltin, PowerStrategy};
use formula_core::ast::{Expression, Operator};
use formula_core::ir::{HostFunction, Node};
use formula_core::{BigDecimal, CoreError, ScopedContext};
use formula_sdk::{FormulaEngineBuilder, Type, Value};

/// `x ^ 2` as a single multiplication
struct Square;

impl PowerStrategy for Square {
    fn name(&self) -> &'static str {
        "square"
    }

    fn lower(
        &self,
        base: &Expression,
        exponent: &Expression,
        ctx: &ScopedContext<'_>,
        backend: &Backend<'_>,
    ) -> formula_compiler::Result<Option<Node>> {
        let is_two = exponent
            .as_literal()
            .map_or(false, |value| *value == BigDecimal::from(2));
        if !is_two {
            return Ok(None);
        }
        let base = backend.lower_with_hint(base, ctx, backend.operand_hint(ctx))?;
        let ty = base.ty();
        if !ty.is_numeric() {
            return Ok(None);
        }
        Ok(Some(Node::arith(Operator::Mul, ty, base.clone(), base)))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let clamp = HostFunction::new("clamp", |args: &[Value]| match args {
        [Value::F64(x), Value::F64(lo), Value::F64(hi)] => Ok(Value::F64(x.clamp(*lo, *hi))),
        other => Err(CoreError::TypeError(format!("clamp({:?})", other))),
    });

    let engine = FormulaEngineBuilder::new()
        .with_builtin(HostBuiltin::new(clamp, vec![Type::F64, Type::F64, Type::F64], Type::F64))
        .with_power_strategy(Square)
        .build()?;

    let formula = engine.compile("clamp(x ^ 2, 0, 10) + 1", &[("x", Type::F64)])?;
    println!("{}", formula.source());
    println!("  lowered to: {:?}", formula.program().root);
    for x in [0.5, 2.0, 5.0] {
        println!("  x = {}: {}", x, formula.evaluate(&[Value::F64(x)])?);
    }

    Ok(())
}
