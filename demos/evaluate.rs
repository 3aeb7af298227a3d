//! Compile and evaluate formulas
//!
//! Shows the same formula compiled for several numeric types, a local
//! definition, and a domain restriction stopping an evaluation.
//!
//! Run with `RUST_LOG=debug` to see the optimization passes.

use formula_sdk::{FormulaConfig, FormulaEngineBuilder, Type, Value};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    println!("=== One formula, three numeric types ===\n");
    let engine = FormulaEngineBuilder::new().with_precision(30).build()?;
    let source = "x / 3 + 1";

    let as_int = engine.compile_as(source, &[("x", Type::I64)], Type::I64)?;
    let as_float = engine.compile_as(source, &[("x", Type::F64)], Type::F64)?;
    let as_decimal = engine.compile_as(source, &[("x", Type::Decimal)], Type::Decimal)?;

    println!("{} at x = 10", source);
    println!("  i64:     {}", as_int.evaluate(&[Value::I64(10)])?);
    println!("  f64:     {}", as_float.evaluate(&[Value::F64(10.0)])?);
    println!("  decimal: {}", as_decimal.evaluate(&[Value::Decimal(10.into())])?);

    println!("\n=== Local definitions ===\n");
    let source = "f'(x) = x*2 + y; f'(1) + f'(2)";
    let formula = engine.compile(source, &[("x", Type::F64), ("y", Type::F64)])?;
    println!("{}", source);
    println!("  with x = 1, y = 2: {}", formula.evaluate(&[Value::F64(1.0), Value::F64(2.0)])?);

    let source = "fact'(n) = if(n <= 1, 1, n * fact'(n - 1)); fact'(k)";
    let formula = engine.compile_as(source, &[("k", Type::Decimal)], Type::Decimal)?;
    println!("{}", source);
    println!("  with k = 30: {}", formula.evaluate(&[Value::Decimal(30.into())])?);

    println!("\n=== Domain restrictions ===\n");
    let engine = FormulaEngineBuilder::new()
        .expect_return(Type::Decimal)
        .add_formula(
            "inverse",
            FormulaConfig::new("1 / (2*x)")
                .with_parameter("x", Type::Decimal)
                .with_restriction("x = 0"),
        )
        .build()?;

    for x in [2, 0] {
        match engine.evaluate("inverse", &[Value::Decimal(x.into())]) {
            Ok(value) => println!("  1 / (2*{}) = {}", x, value),
            Err(err) => println!("  1 / (2*{}) failed: {}", x, err),
        }
    }

    Ok(())
}
