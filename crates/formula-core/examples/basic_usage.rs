//! Basic usage example for formula-core
//!
//! Run with: cargo run -p formula-core --example basic_usage

use formula_core::ast::{Expression, Operator, UnaryOperator};
use formula_core::types::{Type, TypeCatalog};
use formula_core::{BigDecimal, DecimalOracle, NumericOracle};
use std::str::FromStr;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Formula Core Basic Usage Example ===\n");

    // Example 1: Building an expression tree for -x ^ 2 + 0.5
    println!("1. Building Expressions:");
    let expr = Expression::binary(
        Expression::unary(
            UnaryOperator::Negate,
            Expression::binary(Expression::variable("x"), Operator::Power, Expression::literal(2)),
        ),
        Operator::Add,
        Expression::literal(BigDecimal::from_str("0.5")?),
    );
    println!("   Expression: {}", expr);
    println!("   Node count: {}\n", expr.node_count());

    // Example 2: A local function definition
    println!("2. Local Definitions:");
    let definition = Expression::custom_definition(
        "sq",
        vec![Expression::variable("v")],
        Expression::binary(Expression::variable("v"), Operator::Mul, Expression::variable("v")),
        Expression::prime_call("sq", vec![Expression::literal(3)]),
    )?;
    println!("   {}\n", definition);

    // Example 3: Catalog conversions
    println!("3. Type Catalog:");
    let catalog = TypeCatalog::standard();
    for op in catalog.operators_on(&Type::Decimal) {
        println!("   {} : {} -> {} ({:?})", op.name, op.from, op.to, op.kind);
    }

    // Example 4: High-precision math
    println!("\n4. Numeric Oracle:");
    let oracle = DecimalOracle::new(30);
    println!("   e      = {}", oracle.exp(&BigDecimal::from(1))?);
    println!("   ln(10) = {}", oracle.ln(&BigDecimal::from(10))?);
    println!("   20!    = {}", oracle.factorial(&BigDecimal::from(20))?);

    Ok(())
}
