//! Unit tests for IR (Intermediate Representation) types
//!
//! Tests the typed node tree and the conversion types it embeds

use formula_core::ast::Operator;
use formula_core::ir::*;
use formula_core::types::{ConversionPath, ConversionStep, ObjectValue, Type, TypeCatalog, Value};
use formula_core::BigDecimal;

#[test]
fn test_member_node_type() {
    let node = Node::Member {
        target: Box::new(Node::Slot {
            index: 0,
            ty: Type::named("Point"),
        }),
        name: "x".to_string(),
        ty: Type::F64,
    };

    assert_eq!(node.ty(), Type::F64);
    assert_eq!(node.node_count(), 2);
}

#[test]
fn test_native_node_type() {
    let node = Node::Native {
        function: NativeFunction::Math(MathFunction::Sqrt),
        args: vec![Node::constant(2.0)],
        ty: Type::F64,
    };

    assert_eq!(node.ty(), Type::F64);
    if let Node::Native { function, .. } = &node {
        assert_eq!(function.name(), "sqrt");
    }
}

#[test]
fn test_condition_node() {
    let node = Node::condition(
        Node::Compare {
            op: Operator::Gt,
            left: Box::new(Node::Local {
                index: 0,
                ty: Type::I64,
            }),
            right: Box::new(Node::constant(0i64)),
        },
        Node::constant(1i64),
        Node::constant(0i64),
        Type::I64,
    );

    assert_eq!(node.ty(), Type::I64);
    assert_eq!(node.node_count(), 6);
}

#[test]
fn test_catalog_path_through_decimal() {
    let catalog = TypeCatalog::standard();
    let to_f64 = catalog
        .operators_on(&Type::Decimal)
        .into_iter()
        .find(|op| op.name == "decimal_to_f64")
        .unwrap();

    let path = ConversionPath::new(vec![
        ConversionStep::Operator(to_f64),
        ConversionStep::Primitive {
            from: Type::F64,
            to: Type::I32,
        },
    ]);

    let value = Value::Decimal("12.75".parse::<BigDecimal>().unwrap());
    assert_eq!(path.apply(value).unwrap(), Value::I32(12));
    assert_eq!(path.explicit_count(), 1);
}

#[test]
fn test_object_value_member() {
    let value = Value::Object(ObjectValue::new("Point").with_field("x", Value::F64(3.0)));
    assert_eq!(value.member("x").unwrap(), Value::F64(3.0));
    assert_eq!(value.to_string(), "Point { x: 3 }");
}
