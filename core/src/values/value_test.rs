use super::*;
use crate::evaluator::EvalErrorKind;
use crate::types::{NumericKind, TypeDescriptor};
use bigdecimal::BigDecimal;
use num_bigint::BigInt;
use std::str::FromStr;

#[test]
fn test_display_uses_default_textual_form() {
    assert_eq!(Value::Null.to_string(), "null");
    assert_eq!(Value::Int(42).to_string(), "42");
    assert_eq!(Value::Double(1.0).to_string(), "1.0");
    assert_eq!(Value::Double(f64::NAN).to_string(), "NaN");
    assert_eq!(Value::Float(-f32::INFINITY).to_string(), "-Infinity");
    assert_eq!(Value::str("abc").to_string(), "abc");
    assert_eq!(
        Value::list(vec![Value::Int(1), Value::str("a")]).to_string(),
        "[1, a]"
    );
    assert_eq!(
        Value::map(vec![(Value::str("a"), Value::Int(1))]).to_string(),
        "{a=1}"
    );
}

#[test]
fn test_numeric_conversions() {
    assert_eq!(Value::Int(7).to_numeric(NumericKind::Long), Some(Value::Long(7)));
    assert_eq!(Value::Double(2.9).to_numeric(NumericKind::Int), Some(Value::Int(2)));
    assert_eq!(Value::Long(300).to_numeric(NumericKind::Byte), Some(Value::Byte(44)));
    assert_eq!(
        Value::Int(3).to_numeric(NumericKind::BigInteger),
        Some(Value::BigInteger(BigInt::from(3)))
    );
    assert_eq!(
        Value::Decimal(BigDecimal::from_str("12.75").unwrap()).to_numeric(NumericKind::Long),
        Some(Value::Long(12))
    );
    assert_eq!(Value::str("3").to_numeric(NumericKind::Int), None);
}

#[test]
fn test_type_descriptor_of_values() {
    assert_eq!(Value::Null.type_descriptor(), None);
    assert_eq!(Value::Int(1).type_descriptor(), Some(TypeDescriptor::Int));
    assert_eq!(Value::list(vec![]).type_descriptor(), Some(TypeDescriptor::List));
    assert_eq!(Value::Null.type_name(), "null");
}

#[test]
fn test_structural_equality_and_identity() {
    let a = Value::list(vec![Value::Int(1)]);
    let b = Value::list(vec![Value::Int(1)]);
    assert_eq!(a, b);
    assert!(!a.same_instance(&b));
    assert!(a.same_instance(&a.clone()));
    assert_ne!(Value::Int(1), Value::Long(1));
}

#[test]
fn test_frozen_list_rejects_mutation() {
    let list = ListRef::frozen(vec![Value::Int(1)]);
    let err = list.push(Value::Int(2)).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::CollectionIsImmutable));
    assert_eq!(list.len(), 1);
}

#[test]
fn test_list_set_and_grow() {
    let list = ListRef::new(vec![Value::Int(5)]);
    assert_eq!(list.set(0, Value::Int(6)).unwrap(), Value::Int(5));
    assert!(list.set(3, Value::Int(1)).is_err());
    list.grow_to(3).unwrap();
    assert_eq!(list.snapshot(), vec![Value::Int(6), Value::Null, Value::Null]);
}

#[test]
fn test_map_preserves_insertion_order_and_replaces() {
    let map = MapRef::new(vec![
        (Value::str("b"), Value::Int(1)),
        (Value::str("a"), Value::Int(2)),
    ]);
    assert_eq!(map.insert(Value::str("b"), Value::Int(3)).unwrap(), Some(Value::Int(1)));
    assert_eq!(map.insert(Value::str("c"), Value::Int(4)).unwrap(), None);
    let keys: Vec<Value> = map.entries().into_iter().map(|(k, _)| k).collect();
    assert_eq!(keys, vec![Value::str("b"), Value::str("a"), Value::str("c")]);
    assert_eq!(map.get(&Value::str("b")), Some(Value::Int(3)));
    assert_eq!(map.get(&Value::str("z")), None);
}

#[test]
fn test_record_fields() {
    let account = Record::new(TypeDescriptor::named("Account"))
        .with_field("balance", 10)
        .with_read_only_field("id", "A-1")
        .with_typed_field("owner", TypeDescriptor::named("Person"), Value::Null)
        .into_ref();

    assert_eq!(account.field("balance").unwrap().value, Value::Int(10));
    assert!(account.set_field("balance", Value::Int(11)).unwrap());
    assert_eq!(account.field("balance").unwrap().value, Value::Int(11));
    assert!(!account.set_field("id", Value::str("A-2")).unwrap());
    assert!(account.field("missing").is_none());

    let owner = account.field("owner").unwrap();
    assert!(owner.is_null());
    assert_eq!(owner.ty, Some(TypeDescriptor::named("Person")));
    assert_eq!(account.field_type("owner"), Some(TypeDescriptor::named("Person")));
}
