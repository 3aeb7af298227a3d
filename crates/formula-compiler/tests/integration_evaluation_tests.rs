//! Integration tests: compile source text and evaluate it
//!
//! Every program here runs through `formula_runtime`, so the tests pin
//! down the numeric results of compilation rather than the IR shape.

use formula_compiler::{Compiler, CompilerOptions, InliningOptions};
use formula_core::types::{Type, Value};
use formula_core::BigDecimal;
use formula_parser::ExpressionParser;
use formula_runtime::{EntryPoint, RuntimeError};
use std::str::FromStr;

fn dec(text: &str) -> BigDecimal {
    BigDecimal::from_str(text).unwrap()
}

fn entry_point(options: CompilerOptions, source: &str, names: &[&str]) -> EntryPoint {
    let program = Compiler::with_options(options)
        .compile_source(source)
        .unwrap_or_else(|err| panic!("compiling `{}`: {}", source, err));
    EntryPoint::bind(program, names).unwrap()
}

fn evaluate(options: CompilerOptions, source: &str, names: &[&str], args: &[Value]) -> Value {
    entry_point(options, source, names).invoke(args).unwrap()
}

#[test]
fn test_literal_folding_preserves_results() {
    let decimal = CompilerOptions::new()
        .expect_return(Type::Decimal)
        .with_input("x", Type::Decimal);
    let sources = [
        "2 * x + 3 * 4 - 1",
        "(x + 0.5) * 4 * 0.25",
        "x * 2 * 3 + 10 / 4",
        "1 + 2 + x + 3 + 4",
        "-(2 * 3) + x",
    ];
    let inputs = ["-3", "0", "0.125", "7.5", "1000000"];

    for source in sources {
        let folded = entry_point(decimal.clone(), source, &["x"]);
        let unfolded = entry_point(decimal.clone().without_optimizations(), source, &["x"]);
        for input in inputs {
            let args = [Value::Decimal(dec(input))];
            assert_eq!(
                folded.invoke(&args).unwrap(),
                unfolded.invoke(&args).unwrap(),
                "`{}` at x = {}",
                source,
                input
            );
        }
    }

    let float = CompilerOptions::new()
        .expect_return(Type::F64)
        .with_input("x", Type::F64);
    for source in ["0.1 + 0.2", "x + 0.1 + 0.2", "x * 3 * 0.1", "sqrt(0.1 + 0.2) * x", "x * 0.5 * 4 + 0.25"] {
        let folded = entry_point(float.clone(), source, &["x"]);
        let unfolded = entry_point(float.clone().without_optimizations(), source, &["x"]);
        for x in [-3.0, 0.0, 0.1, 7.5, 1e15] {
            assert_eq!(
                folded.invoke(&[Value::F64(x)]).unwrap(),
                unfolded.invoke(&[Value::F64(x)]).unwrap(),
                "`{}` at x = {}",
                source,
                x
            );
        }
    }

    let single = CompilerOptions::new()
        .expect_return(Type::F32)
        .with_input("x", Type::F32);
    for source in ["0.1 + 0.2", "x + 0.1 + 0.2", "16777216 + 1 + x"] {
        let folded = entry_point(single.clone(), source, &["x"]);
        let unfolded = entry_point(single.clone().without_optimizations(), source, &["x"]);
        for x in [-3.0f32, 0.0, 0.1, 7.5] {
            assert_eq!(
                folded.invoke(&[Value::F32(x)]).unwrap(),
                unfolded.invoke(&[Value::F32(x)]).unwrap(),
                "`{}` at x = {}",
                source,
                x
            );
        }
    }

    // trigonometry runs in f64 inside a decimal program
    let folded = entry_point(decimal.clone(), "sin(0.1 + 0.2) + x", &["x"]);
    let unfolded = entry_point(decimal.clone().without_optimizations(), "sin(0.1 + 0.2) + x", &["x"]);
    let args = [Value::Decimal(dec("1"))];
    assert_eq!(folded.invoke(&args).unwrap(), unfolded.invoke(&args).unwrap());

    let integer = CompilerOptions::new()
        .expect_return(Type::I64)
        .with_input("n", Type::I64);
    for source in ["n * 2 * 3 + 7 - 4", "(n + 1) * (2 + 3)", "n % 7 + 2 ^ 10"] {
        let folded = entry_point(integer.clone(), source, &["n"]);
        let unfolded = entry_point(integer.clone().without_optimizations(), source, &["n"]);
        for n in [-5i64, 0, 3, 1 << 20] {
            assert_eq!(
                folded.invoke(&[Value::I64(n)]).unwrap(),
                unfolded.invoke(&[Value::I64(n)]).unwrap(),
                "`{}` at n = {}",
                source,
                n
            );
        }
    }
}

#[test]
fn test_decimal_literal_round_trip() {
    let options = CompilerOptions::new().expect_return(Type::Decimal);
    for literal in ["0.1", "3.14159265358979323846264338327950288", "123456789.000000001", "0"] {
        assert_eq!(
            evaluate(options.clone(), literal, &[], &[]),
            Value::Decimal(dec(literal)),
            "literal {}",
            literal
        );
    }
}

#[test]
fn test_integer_literal_round_trip() {
    let options = CompilerOptions::new().expect_return(Type::I32);
    assert_eq!(evaluate(options.clone(), "42", &[], &[]), Value::I32(42));
    assert_eq!(evaluate(options, "2147483647", &[], &[]), Value::I32(i32::MAX));

    let options = CompilerOptions::new().expect_return(Type::I64);
    assert_eq!(
        evaluate(options, "9007199254740993", &[], &[]),
        Value::I64(9_007_199_254_740_993)
    );
}

#[test]
fn test_comparisons_as_integers() {
    let options = CompilerOptions::new()
        .expect_return(Type::I32)
        .with_input("a", Type::I32)
        .with_input("b", Type::I32);
    let cases: [(&str, fn(i32, i32) -> bool); 6] = [
        ("a < b", |a, b| a < b),
        ("a <= b", |a, b| a <= b),
        ("a > b", |a, b| a > b),
        ("a >= b", |a, b| a >= b),
        ("a = b", |a, b| a == b),
        ("a ~= b", |a, b| a != b),
    ];
    let pairs = [(1, 2), (2, 1), (3, 3), (-4, 0), (0, -4)];

    for (source, predicate) in cases {
        let entry = entry_point(options.clone(), source, &["a", "b"]);
        for (a, b) in pairs {
            let expected = Value::I32(if predicate(a, b) { 1 } else { 0 });
            assert_eq!(
                entry.invoke(&[Value::I32(a), Value::I32(b)]).unwrap(),
                expected,
                "`{}` with a = {}, b = {}",
                source,
                a,
                b
            );
        }
    }
}

#[test]
fn test_domain_restriction_guards_evaluation() {
    let options = CompilerOptions::new()
        .expect_return(Type::Decimal)
        .with_input("x", Type::Decimal)
        .with_domain_restriction(ExpressionParser::parse("x = 0").unwrap());
    let entry = entry_point(options, "1 / (2*x)", &["x"]);

    assert_eq!(
        entry.invoke(&[Value::Decimal(dec("2"))]).unwrap(),
        Value::Decimal(dec("0.25"))
    );
    assert_eq!(
        entry.invoke(&[Value::Decimal(dec("0"))]).unwrap_err(),
        RuntimeError::DomainViolation {
            restriction: "x = 0".to_string()
        }
    );
}

#[test]
fn test_exp_of_ln_equals_identity_on_its_domain() {
    let options = CompilerOptions::new()
        .with_input("x", Type::F64)
        .allow_domain_changing_optimizations(true);
    let simplified = entry_point(options.clone(), "e^(ln(x))", &["x"]);
    let direct = entry_point(options.clone(), "x", &["x"]);
    let unsimplified = entry_point(
        CompilerOptions {
            enable_exponent_simplification: false,
            ..options
        },
        "e^(ln(x))",
        &["x"],
    );

    for x in [1e-6, 0.5, 1.0, 2.0, 10.0, 12345.678] {
        let args = [Value::F64(x)];
        assert_eq!(simplified.invoke(&args).unwrap(), direct.invoke(&args).unwrap());
        match unsimplified.invoke(&args).unwrap() {
            Value::F64(v) => assert!((v - x).abs() <= 1e-9 * x.max(1.0), "exp(ln({})) = {}", x, v),
            other => panic!("Expected f64, got {:?}", other),
        }
    }

    for x in [0.0, -1.0] {
        let args = [Value::F64(x)];
        assert_eq!(
            simplified.invoke(&args).unwrap_err(),
            RuntimeError::DomainViolation {
                restriction: "x <= 0".to_string()
            }
        );
        assert!(unsimplified.invoke(&args).is_err());
    }
}

#[test]
fn test_local_definition() {
    let options = CompilerOptions::new()
        .with_input("x", Type::F64)
        .with_input("y", Type::F64);
    let source = "f'(x) = x*2 + y; f'(1) + f'(2)";
    let args = [Value::F64(1.0), Value::F64(2.0)];

    assert_eq!(evaluate(options.clone(), source, &["x", "y"], &args), Value::F64(10.0));

    // the same result when the definition is compiled as a function
    let not_inlined = options.with_inlining(InliningOptions {
        enabled: false,
        ..InliningOptions::default()
    });
    assert_eq!(evaluate(not_inlined, source, &["x", "y"], &args), Value::F64(10.0));
}

/// Evaluate `source` with default inlining and with inlining disabled
fn inlined_and_not(options: CompilerOptions, source: &str, names: &[&str], args: &[Value]) -> (Value, Value) {
    let not_inlined = options.clone().with_inlining(InliningOptions {
        enabled: false,
        ..InliningOptions::default()
    });
    (
        evaluate(options, source, names, args),
        evaluate(not_inlined, source, names, args),
    )
}

#[test]
fn test_nested_definition_sees_inputs_not_outer_parameters() {
    let options = CompilerOptions::new()
        .expect_return(Type::I64)
        .with_input("x", Type::I64);
    let (inlined, not_inlined) = inlined_and_not(
        options,
        "f'(x) = (g'(z) = z + x; g'(1)); f'(5)",
        &["x"],
        &[Value::I64(100)],
    );
    assert_eq!(inlined, Value::I64(101));
    assert_eq!(not_inlined, Value::I64(101));
}

#[test]
fn test_inlining_inside_function_keeps_bindings() {
    let options = CompilerOptions::new()
        .expect_return(Type::I64)
        .with_input("y", Type::I64);

    // `y` in g is the input even where g is called inside f
    let (inlined, not_inlined) = inlined_and_not(
        options.clone(),
        "g'(a) = a + y; f'(y) = if(y <= 0, 0, g'(1) * y + f'(y - 1)); f'(2)",
        &["y"],
        &[Value::I64(10)],
    );
    assert_eq!(inlined, Value::I64(33));
    assert_eq!(not_inlined, Value::I64(33));

    // the argument calls the outer h, the body of g its own h
    let (inlined, not_inlined) = inlined_and_not(
        options,
        "h'(v) = if(v <= 0, 0, h'(v - 1) + 3); g'(a) = (h'(w) = w + 1; h'(a)); g'(h'(2))",
        &[],
        &[],
    );
    assert_eq!(inlined, Value::I64(7));
    assert_eq!(not_inlined, Value::I64(7));
}

#[test]
fn test_exp_ln_of_parameter_compiles() {
    let options = CompilerOptions::new()
        .expect_return(Type::F64)
        .allow_domain_changing_optimizations(true);
    let source = "f'(t) = exp(ln(t)); f'(2) + f(3)";

    // only the inlined call is simplified; the function body keeps exp(ln(t))
    let program = Compiler::with_options(options.clone()).compile_source(source).unwrap();
    assert_eq!(program.metadata.restrictions, vec!["2 <= 0"]);

    let simplified = evaluate(options.clone(), source, &[], &[]);
    let exact = evaluate(options.allow_domain_changing_optimizations(false), source, &[], &[]);
    match (simplified, exact) {
        (Value::F64(a), Value::F64(b)) => assert!((a - 5.0).abs() < 1e-12 && (b - 5.0).abs() < 1e-12),
        other => panic!("Expected f64 results, got {:?}", other),
    }

    // an input named like the parameter is not guarded in its place
    let options = CompilerOptions::new()
        .expect_return(Type::F64)
        .with_input("t", Type::F64)
        .allow_domain_changing_optimizations(true);
    let entry = entry_point(options, "f'(t) = exp(ln(t)); f'(2) + f(3) + t", &["t"]);
    assert_eq!(entry.program().metadata.restrictions, vec!["2 <= 0"]);
    assert!(entry.invoke(&[Value::F64(-1.0)]).is_ok());
}

#[test]
fn test_parameter_named_e() {
    let options = CompilerOptions::new().expect_return(Type::F64);
    let (inlined, not_inlined) = inlined_and_not(options, "f'(e) = e^2; f'(3)", &[], &[]);
    assert_eq!(inlined, Value::F64(9.0));
    assert_eq!(not_inlined, Value::F64(9.0));
}

#[test]
fn test_recursive_definition() {
    let options = CompilerOptions::new()
        .expect_return(Type::I64)
        .with_input("k", Type::I64);
    let entry = entry_point(
        options,
        "fact'(n) = if(n <= 1, 1, n * fact'(n - 1)); fact'(k)",
        &["k"],
    );

    assert_eq!(entry.program().functions.len(), 1);
    assert_eq!(entry.invoke(&[Value::I64(5)]).unwrap(), Value::I64(120));
    assert_eq!(entry.invoke(&[Value::I64(20)]).unwrap(), Value::I64(2_432_902_008_176_640_000));
    assert!(matches!(
        entry.invoke(&[Value::I64(21)]).unwrap_err(),
        RuntimeError::Core(_)
    ));
}

#[test]
fn test_mixed_types_widen() {
    let options = CompilerOptions::new()
        .expect_return(Type::F64)
        .with_input("n", Type::I32)
        .with_input("x", Type::F64);
    assert_eq!(
        evaluate(options, "n / 2 + x", &["n", "x"], &[Value::I32(3), Value::F64(0.25)]),
        Value::F64(1.75)
    );
}

#[test]
fn test_builtins_evaluate() {
    let options = CompilerOptions::new()
        .expect_return(Type::Decimal)
        .with_input("x", Type::Decimal);
    let entry = entry_point(options, "max(abs(x), 2) + floor(x / 4)", &["x"]);

    assert_eq!(
        entry.invoke(&[Value::Decimal(dec("-9"))]).unwrap(),
        Value::Decimal(dec("6"))
    );
    assert_eq!(
        entry.invoke(&[Value::Decimal(dec("1"))]).unwrap(),
        Value::Decimal(dec("2"))
    );
}
