//! Method, constructor and function resolution through evaluation.

use pretty_assertions::assert_eq;
use quill_core::ast::builder::*;
use quill_core::context::{
    ConstructorDescriptor, EvaluationContext, MethodDescriptor, RegistryConstructorResolver,
    RegistryMethodResolver,
};
use quill_core::evaluator::CallError;
use quill_core::types::ClassDescriptor;
use quill_core::values::Record;
use quill_core::{
    EvalErrorKind, Expression, StandardEvaluationContext, TypeDescriptor, TypedValue,
    Value,
};

fn labelled(
    ty: &TypeDescriptor,
    name: &str,
    params: Vec<TypeDescriptor>,
    label: &'static str,
) -> MethodDescriptor {
    MethodDescriptor::new(ty.clone(), name, params, move |_, _, _| Ok(Value::str(label).into()))
}

fn account_type() -> TypeDescriptor {
    ClassDescriptor::new("Account")
        .with_supertypes(["Ledger"])
        .into_type()
}

fn bank() -> StandardEvaluationContext {
    let account = account_type();
    let methods = RegistryMethodResolver::new();
    methods.register(labelled(&account, "deposit", vec![TypeDescriptor::Long], "long"));
    methods.register(labelled(&account, "deposit", vec![TypeDescriptor::Double], "double"));
    methods.register(labelled(&account, "file", vec![TypeDescriptor::Object], "object"));
    methods.register(labelled(
        &account,
        "file",
        vec![TypeDescriptor::named("Ledger")],
        "ledger",
    ));
    methods.register(labelled(&account, "flag", vec![TypeDescriptor::Int], "int"));
    methods.register(labelled(&account, "flag", vec![TypeDescriptor::Boolean], "boolean"));
    methods.register(MethodDescriptor::new(
        account.clone(),
        "close",
        vec![],
        |_, _, _| Err(CallError::raised("ledger is locked")),
    ));
    methods.register(MethodDescriptor::new(
        account.clone(),
        "audit",
        vec![],
        |_, _, _| Err(CallError::Unavailable("auditor offline".into())),
    ));

    let constructors = RegistryConstructorResolver::new();
    constructors.register(ConstructorDescriptor::new(
        account.clone(),
        vec![TypeDescriptor::String],
        |_, args| {
            let owner = args[0].clone();
            Ok(Value::from(
                Record::new(account_type()).with_field("owner", owner).into_ref(),
            )
            .into())
        },
    ));

    StandardEvaluationContext::new()
        .with_root(Record::new(account).into_ref())
        .add_method_resolver(methods)
        .add_constructor_resolver(constructors)
}

#[test]
fn test_least_widening_overload_is_chosen() {
    let context = bank();
    let deposit = Expression::new(method("deposit", vec![int(5)]));
    assert_eq!(deposit.get_value(&context).unwrap(), Value::str("long"));

    let deposit = Expression::new(method("deposit", vec![literal(Value::Float(5.0))]));
    assert_eq!(deposit.get_value(&context).unwrap(), Value::str("double"));
}

#[test]
fn test_nearest_supertype_beats_object() {
    let context = bank();
    let file = Expression::new(method("file", vec![variable("root")]));
    assert_eq!(file.get_value(&context).unwrap(), Value::str("ledger"));
}

#[test]
fn test_changed_argument_types_resolve_again() {
    let context = bank().with_variable("amount", 5);
    let deposit = Expression::new(method("deposit", vec![variable("amount")]));
    assert_eq!(deposit.get_value(&context).unwrap(), Value::str("long"));

    context.set_variable("amount", Value::Double(5.5).into());
    assert_eq!(deposit.get_value(&context).unwrap(), Value::str("double"));
}

#[test]
fn test_equally_distant_conversions_are_ambiguous() {
    let context = bank();
    let flag = Expression::new(method("flag", vec![string("1")]));
    let error = flag.get_value(&context).unwrap_err();
    assert!(matches!(error.kind, EvalErrorKind::AmbiguousMethod { .. }));
}

#[test]
fn test_callee_failure_is_wrapped_with_cause() {
    let context = bank();
    let error = Expression::new(method("close", vec![]))
        .get_value(&context)
        .unwrap_err();

    assert!(matches!(
        error.kind,
        EvalErrorKind::ExceptionDuringInvocation { ref name, .. } if name == "close"
    ));
    assert_eq!(error.cause().map(ToString::to_string).as_deref(), Some("ledger is locked"));
}

#[test]
fn test_unavailable_callee_is_an_invocation_problem() {
    let context = bank();
    let error = Expression::new(method("audit", vec![]))
        .get_value(&context)
        .unwrap_err();
    assert!(matches!(error.kind, EvalErrorKind::InvocationProblem { .. }));
}

#[test]
fn test_registered_constructor() {
    let context = bank();
    let owner = Expression::new(chain(vec![
        construct("Account", vec![string("grace")]),
        property("owner"),
    ]));
    assert_eq!(owner.get_value(&context).unwrap(), Value::str("grace"));

    let missing = Expression::new(construct("Account", vec![int(1), int(2)]));
    assert!(matches!(
        missing.get_value(&context).unwrap_err().kind,
        EvalErrorKind::ConstructorNotFound { .. }
    ));
}

#[test]
fn test_function_reference_converts_arguments() {
    let context = StandardEvaluationContext::new().register_function(MethodDescriptor::function(
        "half",
        vec![TypeDescriptor::Double],
        |_, args| Ok(TypedValue::new(Value::Double(args[0].to_f64().unwrap_or(0.0) / 2.0))),
    ));
    let half = Expression::new(function("half", vec![int(5)]));
    assert_eq!(half.get_value(&context).unwrap(), Value::Double(2.5));
}
