//! Load formulas from a YAML configuration file
//!
//! Usage: `cargo run --example config_file [path/to/formulas.yaml]`

use anyhow::Context;
use formula_sdk::{FormulaEngineBuilder, Value};
use std::collections::HashMap;
use std::str::FromStr;

fn decimal(text: &str) -> anyhow::Result<Value> {
    Ok(Value::Decimal(bigdecimal::BigDecimal::from_str(text)?))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/formulas.yaml".to_string());
    let engine = FormulaEngineBuilder::new()
        .with_config_file(&path)
        .with_context(|| format!("loading {}", path))?
        .build()?;

    println!("=== Formulas in {} ===\n", path);
    for name in engine.formula_names() {
        let formula = engine.formula(name)?;
        println!(
            "{:<18} ({}) -> {}: {}",
            name,
            formula.parameters().join(", "),
            formula.return_type(),
            formula.source()
        );
        for restriction in &formula.program().metadata.restrictions {
            println!("{:<18} fails when {}", "", restriction);
        }
    }

    tracing::info!("Evaluating {} formula(s)", engine.formula_names().count());
    println!("\n=== Evaluation ===\n");
    let inputs = HashMap::from([
        ("principal".to_string(), decimal("1000")?),
        ("rate".to_string(), decimal("0.05")?),
        ("periods".to_string(), decimal("12")?),
        ("years".to_string(), decimal("10")?),
    ]);
    println!(
        "compound_interest(1000, 5%, monthly, 10y) = {}",
        engine.evaluate_named("compound_interest", &inputs)?
    );
    println!("circle_area(2) = {}", engine.evaluate("circle_area", &[decimal("2")?])?);
    println!("triangle(1000) = {}", engine.evaluate("triangle", &[Value::I64(1000)])?);
    println!("growth(7.5) = {}", engine.evaluate("growth", &[Value::F64(7.5)])?);

    match engine.evaluate("growth", &[Value::F64(-1.0)]) {
        Ok(value) => println!("growth(-1) = {}", value),
        Err(err) => println!("growth(-1) failed: {}", err),
    }

    Ok(())
}
