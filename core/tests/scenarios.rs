//! End-to-end evaluation scenarios through the public API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use quill_core::ast::builder::*;
use quill_core::ast::{BinaryOp, ComparisonOp};
use quill_core::context::{EvaluationContext, MethodDescriptor, PropertyAccessor};
use quill_core::types::{ClassDescriptor, NumericKind};
use quill_core::values::Record;
use quill_core::{
    EvalError, EvalErrorKind, Expression, ExpressionState, StandardEvaluationContext,
    TypeDescriptor, TypedValue, Value,
};

fn eval(context: &StandardEvaluationContext, tree: quill_core::Node) -> Value {
    Expression::new(tree).get_value(context).unwrap()
}

#[test]
fn test_arithmetic_follows_tree_shape() {
    let context = StandardEvaluationContext::new();
    // 3 + 4 * 2
    let tree = binary(BinaryOp::Add, int(3), binary(BinaryOp::Mul, int(4), int(2)));
    assert_eq!(eval(&context, tree), Value::Int(11));
}

#[test]
fn test_string_plus_number_concatenates() {
    let context = StandardEvaluationContext::new();
    let tree = binary(BinaryOp::Add, string("abc"), int(1));
    assert_eq!(eval(&context, tree), Value::str("abc1"));
}

#[test]
fn test_promotion_is_independent_of_operand_order() {
    let context = StandardEvaluationContext::new();
    let operands = [
        Value::Byte(3),
        Value::Short(3),
        Value::Int(3),
        Value::Long(3),
        Value::Float(3.0),
        Value::Double(3.0),
    ];
    for op in [BinaryOp::Add, BinaryOp::Sub, BinaryOp::Mul] {
        for a in &operands {
            for b in &operands {
                let expected = a
                    .numeric_kind()
                    .unwrap()
                    .promote(b.numeric_kind().unwrap());
                let forward = eval(&context, binary(op, literal(a.clone()), literal(b.clone())));
                let backward = eval(&context, binary(op, literal(b.clone()), literal(a.clone())));
                assert_eq!(forward.numeric_kind(), Some(expected), "{a:?} {op:?} {b:?}");
                assert_eq!(backward.numeric_kind(), Some(expected), "{b:?} {op:?} {a:?}");
            }
        }
    }
    assert_eq!(NumericKind::Byte.promote(NumericKind::Short), NumericKind::Int);
}

#[test]
fn test_comparisons_are_symmetric_across_kinds() {
    let context = StandardEvaluationContext::new();
    let small = [Value::Int(2), Value::Long(2), Value::Float(2.0), Value::Double(2.0)];
    let large = [Value::Int(5), Value::Long(5), Value::Float(5.0), Value::Double(5.0)];
    for a in &small {
        for b in &large {
            let lt = compare(ComparisonOp::Lt, literal(a.clone()), literal(b.clone()));
            let gt = compare(ComparisonOp::Gt, literal(b.clone()), literal(a.clone()));
            assert_eq!(eval(&context, lt), Value::Bool(true));
            assert_eq!(eval(&context, gt), Value::Bool(true));
        }
    }
}

#[test]
fn test_inline_constant_list_is_identity_stable() {
    let context = StandardEvaluationContext::new();
    let constant = Expression::new(list(vec![int(1), int(2), int(3)]));

    let first = constant.get_value(&context).unwrap();
    let second = constant.get_value(&context).unwrap();

    assert!(first.same_instance(&second));
    assert_eq!(first, Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]));
}

#[test]
fn test_inline_list_with_variable_is_fresh_each_time() {
    let context = StandardEvaluationContext::new().with_variable("x", 2);
    let dynamic = Expression::new(list(vec![int(1), variable("x")]));

    let first = dynamic.get_value(&context).unwrap();
    let second = dynamic.get_value(&context).unwrap();

    assert!(!first.same_instance(&second));
    assert_eq!(first, second);
}

fn traveller(city: &str) -> Value {
    let address = Record::new(TypeDescriptor::named("Address"))
        .with_field("city", city)
        .into_ref();
    let person = Record::new(TypeDescriptor::named("Person"))
        .with_field("address", address)
        .into_ref();
    Record::new(TypeDescriptor::named("Trip"))
        .with_field("person", person)
        .into_ref()
        .into()
}

#[test]
fn test_value_ref_write_matches_direct_set() {
    let path = || chain(vec![property("person"), property("address"), property("city")]);

    let by_ref = StandardEvaluationContext::new().with_root(traveller("Paris"));
    let tree = path();
    let mut state = ExpressionState::with_root(&by_ref, by_ref.root_object());
    let target = tree.get_value_ref(&mut state).unwrap();
    target.set_value(&mut state, Value::str("Lyon")).unwrap();

    let direct = StandardEvaluationContext::new().with_root(traveller("Paris"));
    Expression::new(path()).set_value(&direct, "Lyon").unwrap();

    assert_eq!(eval(&by_ref, path()), Value::str("Lyon"));
    assert_eq!(eval(&direct, path()), eval(&by_ref, path()));
}

#[test]
fn test_postfix_increment_on_list_element() {
    let context = StandardEvaluationContext::new().with_variable(
        "list",
        Value::list(vec![Value::Int(5), Value::Int(5), Value::Int(5)]),
    );

    let tree = post_inc(chain(vec![variable("list"), index(int(2))]));

    assert_eq!(eval(&context, tree), Value::Int(5));
    assert_eq!(
        eval(&context, variable("list")),
        Value::list(vec![Value::Int(5), Value::Int(5), Value::Int(6)])
    );
}

#[test]
fn test_increment_calls_index_function_once() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let context = StandardEvaluationContext::new()
        .with_variable("list", Value::list(vec![Value::Int(1), Value::Int(1)]))
        .register_function(MethodDescriptor::function("pick", vec![], move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Int(1).into())
        }));

    let tree = pre_inc(chain(vec![variable("list"), index(function("pick", vec![]))]));

    assert_eq!(eval(&context, tree), Value::Int(2));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_null_safe_chain_returns_null() {
    let root = Record::new(TypeDescriptor::named("Trip"))
        .with_field("person", Value::Null)
        .into_ref();
    let context = StandardEvaluationContext::new().with_root(root);

    // person?.address?.city
    let safe = chain(vec![
        property("person"),
        safe_property("address"),
        safe_property("city"),
    ]);
    assert_eq!(eval(&context, safe), Value::Null);

    // person?.address.city stops at the first null-safe step
    let mixed = chain(vec![property("person"), safe_property("address"), property("city")]);
    assert_eq!(eval(&context, mixed), Value::Null);

    // person.address.city
    let unsafe_path = chain(vec![property("person"), property("address"), property("city")]);
    let error = Expression::new(unsafe_path).get_value(&context).unwrap_err();
    assert!(matches!(
        error.kind,
        EvalErrorKind::PropertyOrFieldNotReadableOnNull { ref name } if name == "address"
    ));
}

/// Answers every read with its own label.
#[derive(Debug)]
struct LabelAccessor {
    label: &'static str,
    targets: Option<Vec<TypeDescriptor>>,
}

impl PropertyAccessor for LabelAccessor {
    fn specific_target_types(&self) -> Option<Vec<TypeDescriptor>> {
        self.targets.clone()
    }

    fn can_read(&self, _: &dyn EvaluationContext, _: &Value, _: &str) -> bool {
        true
    }

    fn read(&self, _: &dyn EvaluationContext, _: &Value, _: &str) -> Result<TypedValue, EvalError> {
        Ok(Value::str(self.label).into())
    }
}

#[test]
fn test_exact_type_accessor_wins_over_registration_order() {
    let account = ClassDescriptor::new("Account")
        .with_supertypes(["Ledger"])
        .into_type();
    let root = Record::new(account.clone()).into_ref();

    let context = StandardEvaluationContext::new()
        .with_root(root)
        .with_property_accessors(Vec::new())
        .add_property_accessor(LabelAccessor {
            label: "generic",
            targets: None,
        })
        .add_property_accessor(LabelAccessor {
            label: "ledger",
            targets: Some(vec![TypeDescriptor::named("Ledger")]),
        })
        .add_property_accessor(LabelAccessor {
            label: "account",
            targets: Some(vec![account]),
        });

    let balance = Expression::new(property("balance"));
    for _ in 0..3 {
        assert_eq!(balance.get_value(&context).unwrap(), Value::str("account"));
    }
}

#[test]
fn test_supertype_accessor_beats_generic() {
    let account = ClassDescriptor::new("Account")
        .with_supertypes(["Ledger"])
        .into_type();
    let context = StandardEvaluationContext::new()
        .with_root(Record::new(account).into_ref())
        .with_property_accessors(Vec::new())
        .add_property_accessor(LabelAccessor {
            label: "generic",
            targets: None,
        })
        .add_property_accessor(LabelAccessor {
            label: "ledger",
            targets: Some(vec![TypeDescriptor::named("Ledger")]),
        });

    assert_eq!(eval(&context, property("balance")), Value::str("ledger"));
}
