use std::sync::Arc;

use super::*;
use crate::evaluator::{CallError, EvalErrorKind};
use crate::types::TypeDescriptor;
use crate::values::{TypedValue, Value};

fn resolve_method(
    context: &StandardEvaluationContext,
    target: &Value,
    name: &str,
    args: &[Value],
) -> Option<Arc<dyn MethodExecutor>> {
    let arg_types: Vec<_> = args.iter().map(Value::type_descriptor).collect();
    context
        .method_resolvers()
        .iter()
        .find_map(|r| r.resolve(context, target, name, &arg_types).unwrap())
}

fn call(context: &StandardEvaluationContext, target: Value, name: &str, args: Vec<Value>) -> Value {
    let executor = resolve_method(context, &target, name, &args).expect("method should resolve");
    executor.execute(context, &target, args).unwrap().into_value()
}

#[test]
fn test_variables_round_trip() {
    let context = StandardEvaluationContext::new().with_variable("answer", 42);
    assert_eq!(context.lookup_variable("answer"), Some(TypedValue::new(Value::Int(42))));
    context.set_variable("answer", TypedValue::new(Value::str("x")));
    assert_eq!(
        context.lookup_variable("answer").map(TypedValue::into_value),
        Some(Value::str("x"))
    );
    assert_eq!(context.lookup_variable("missing"), None);
}

#[test]
fn test_builtin_string_methods() {
    let context = StandardEvaluationContext::new();
    assert_eq!(call(&context, Value::str("héllo"), "length", vec![]), Value::Int(5));
    assert_eq!(
        call(&context, Value::str("hello"), "substring", vec![Value::Int(1), Value::Int(3)]),
        Value::str("el")
    );
    assert_eq!(
        call(&context, Value::str("abc"), "toUpperCase", vec![]),
        Value::str("ABC")
    );
}

#[test]
fn test_object_methods_apply_to_every_type() {
    let context = StandardEvaluationContext::new();
    assert_eq!(call(&context, Value::Int(7), "toString", vec![]), Value::str("7"));
    assert_eq!(
        call(&context, Value::list(vec![]), "getClass", vec![]),
        Value::Type(TypeDescriptor::List)
    );
}

#[test]
fn test_static_math_methods_pick_widest_needed_overload() {
    let context = StandardEvaluationContext::new();
    let math = Value::Type(TypeDescriptor::named("Math"));
    assert_eq!(
        call(&context, math.clone(), "max", vec![Value::Int(1), Value::Int(9)]),
        Value::Int(9)
    );
    assert_eq!(
        call(&context, math, "max", vec![Value::Int(1), Value::Double(2.5)]),
        Value::Double(2.5)
    );
}

#[test]
fn test_builtin_list_add_on_frozen_list_fails() {
    let context = StandardEvaluationContext::new();
    let frozen = Value::List(crate::values::ListRef::frozen(vec![Value::Int(1)]));
    let executor = resolve_method(&context, &frozen, "add", &[Value::Int(2)]).unwrap();
    let err = executor.execute(&context, &frozen, vec![Value::Int(2)]).unwrap_err();
    assert!(matches!(
        err,
        CallError::Failed(ref e) if matches!(e.kind, EvalErrorKind::CollectionIsImmutable)
    ));
}

#[test]
fn test_unknown_method_declines() {
    let context = StandardEvaluationContext::new();
    assert!(resolve_method(&context, &Value::str("x"), "frobnicate", &[]).is_none());
}

#[test]
fn test_ambiguous_registration_is_reported() {
    let resolver = RegistryMethodResolver::new();
    let account = TypeDescriptor::named("Account");
    for param in [TypeDescriptor::Int, TypeDescriptor::Boolean] {
        resolver.register(MethodDescriptor::new(
            account.clone(),
            "deposit",
            vec![param],
            |_, _, _| Ok(TypedValue::NULL),
        ));
    }
    let context = StandardEvaluationContext::new();
    let target = crate::values::Record::new(account).into_ref();
    let err = resolver
        .resolve(
            &context,
            &Value::Object(target),
            "deposit",
            &[Some(TypeDescriptor::String)],
        )
        .unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::AmbiguousMethod { .. }));
}

#[test]
fn test_varargs_tail_is_packed() {
    let resolver = RegistryMethodResolver::new();
    resolver.register(
        MethodDescriptor::new(
            TypeDescriptor::String,
            "joinWith",
            vec![TypeDescriptor::String],
            |_, target, args| {
                let parts = args[0].as_list().map(|l| l.snapshot()).unwrap_or_default();
                let joined: Vec<String> = parts.iter().map(ToString::to_string).collect();
                Ok(Value::str(joined.join(target.as_str().unwrap_or(""))).into())
            },
        )
        .varargs(),
    );
    let context = StandardEvaluationContext::new().add_method_resolver(resolver);
    assert_eq!(
        call(
            &context,
            Value::str("-"),
            "joinWith",
            vec![Value::str("a"), Value::Int(1), Value::str("c")]
        ),
        Value::str("a-1-c")
    );
}

#[test]
fn test_builtin_constructors() {
    let context = StandardEvaluationContext::new();
    let resolve = |name: &str, args: &[Value]| {
        let types: Vec<_> = args.iter().map(Value::type_descriptor).collect();
        context
            .constructor_resolvers()
            .iter()
            .find_map(|r| r.resolve(&context, name, &types).unwrap())
    };
    let list = resolve("java.util.ArrayList", &[]).unwrap();
    assert_eq!(list.execute(&context, vec![]).unwrap().into_value(), Value::list(vec![]));
    let decimal = resolve("BigDecimal", &[Value::str("1.50")]).unwrap();
    let value = decimal.execute(&context, vec![Value::str("1.50")]).unwrap();
    assert_eq!(value.ty, Some(TypeDescriptor::BigDecimal));
    assert!(resolve("Widget", &[]).is_none());
}

#[test]
fn test_functions_are_looked_up_by_name() {
    let context = StandardEvaluationContext::new().register_function(MethodDescriptor::function(
        "twice",
        vec![TypeDescriptor::Int],
        |_, args| Ok(Value::Int(args[0].to_i32().unwrap_or(0) * 2).into()),
    ));
    assert_eq!(context.lookup_function("twice").len(), 1);
    assert!(context.lookup_function("thrice").is_empty());
}

#[test]
fn test_removed_accessor_is_no_longer_registered() {
    let accessor: Arc<dyn PropertyAccessor> = Arc::new(MapAccessor);
    let mut context = StandardEvaluationContext::new()
        .with_property_accessors(vec![accessor.clone(), Arc::new(ObjectFieldAccessor)]);
    assert!(super::is_registered(context.property_accessors(), &accessor));
    context.remove_property_accessor(&accessor);
    assert!(!super::is_registered(context.property_accessors(), &accessor));
    assert_eq!(context.property_accessors().len(), 1);
}
