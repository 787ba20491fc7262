//! The root crate's re-exports and error type.

mod cases;

use std::error::Error as _;

use pretty_assertions::assert_eq;
use quill::ast::builder::*;
use quill::{CompilationState, Error, EvalErrorKind, Expression, Value};

#[test]
fn test_set_value_through_chain() {
    let context = cases::context();
    let city = Expression::new(chain(vec![property("placeOfBirth"), property("city")]));

    city.set_value(&context, "Gospic").unwrap();

    assert_eq!(city.get_value(&context).unwrap(), Value::str("Gospic"));
    assert!(city.is_writable(&context));
}

#[test]
fn test_error_keeps_source_and_cause_chain() {
    let context = cases::context();
    let expr = Expression::new(property("age").at(0, 3)).with_source("age");

    let error = Error::from_eval(&expr, expr.get_value(&context).unwrap_err());

    assert_eq!(error.expression, "age");
    assert!(matches!(
        error.error.kind,
        EvalErrorKind::PropertyOrFieldNotReadable { .. }
    ));
    assert!(error.source().is_some());
    assert_eq!(error.to_string(), error.error.to_string());
    assert_eq!(error.to_diagnostic().code.as_deref(), Some("E1001"));
}

#[test]
fn test_expression_compiles_on_first_use() {
    let context = cases::context();
    let expr = Expression::new(chain(vec![property("name"), method("length", vec![])]))
        .with_options(cases::immediate());

    assert_eq!(expr.compilation_state(), CompilationState::Interpreted);
    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(12));
    assert_eq!(expr.compilation_state(), CompilationState::Compiled);
    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(12));
}
