//! Shared fixtures and the `test_case!` macro for facade tests.
//!
//! A value case evaluates the tree interpreted, then through an expression
//! compiled on first use, and expects the same value from both. An error
//! case renders the interpreted failure against `source` without colors.

#![allow(dead_code)]

use quill::values::Record;
use quill::{
    CompilationOptions, CompilerMode, ExpressionOptions, StandardEvaluationContext,
    TypeDescriptor, Value,
};

/// Tesla, born 1856 in Smiljan.
pub fn inventor() -> Value {
    let birthplace = Record::new(TypeDescriptor::named("PlaceOfBirth"))
        .with_field("city", "Smiljan")
        .with_field("country", "Croatia")
        .into_ref();
    let inventions = Value::list(vec![
        Value::str("induction motor"),
        Value::str("alternating current"),
        Value::str("radio"),
    ]);
    Record::new(TypeDescriptor::named("Inventor"))
        .with_field("name", "Nikola Tesla")
        .with_field("birthYear", 1856)
        .with_field("placeOfBirth", birthplace)
        .with_field("inventions", inventions)
        .with_field("mentor", Value::Null)
        .into_ref()
        .into()
}

pub fn context() -> StandardEvaluationContext {
    StandardEvaluationContext::new()
        .with_root(inventor())
        .with_variable(
            "primes",
            Value::list([2, 3, 5, 7, 11].into_iter().map(Value::Int).collect()),
        )
}

pub fn immediate() -> ExpressionOptions {
    ExpressionOptions {
        compilation: CompilationOptions {
            mode: CompilerMode::Immediate,
            ..CompilationOptions::default()
        },
        ..ExpressionOptions::default()
    }
}

#[macro_export]
macro_rules! test_case {
    {
        name: $name:ident,
        ast: $ast:expr,
        value: $value:expr $(,)?
    } => {
        #[test]
        fn $name() {
            use pretty_assertions::assert_eq;

            let context = $crate::cases::context();
            let expected: quill::Value = $value.into();

            let interpreted = quill::Expression::new($ast);
            assert_eq!(interpreted.get_value(&context).unwrap(), expected, "interpreted");

            let compiled = quill::Expression::new($ast).with_options($crate::cases::immediate());
            assert_eq!(compiled.get_value(&context).unwrap(), expected, "first evaluation");
            assert_eq!(compiled.get_value(&context).unwrap(), expected, "second evaluation");
        }
    };
    {
        name: $name:ident,
        source: $source:expr,
        ast: $ast:expr,
        error: { $expected:expr } $(,)?
    } => {
        #[test]
        fn $name() {
            use pretty_assertions::assert_eq;

            let context = $crate::cases::context();
            let expression = quill::Expression::new($ast).with_source($source);
            let error = expression.get_value(&context).unwrap_err();
            let rendered = quill::render_error_to_string_no_color(
                &quill::Error::from_eval(&expression, error),
            );
            assert_eq!(rendered, $expected);
        }
    };
}
