/*
 * Navigation Tests
 *
 * Property chains, method calls, indexing, selection and projection
 * against the inventor fixture.
 */

mod cases;

use quill::Value;
use quill::ast::builder::*;
use quill::ast::{BinaryOp, ComparisonOp, SelectionKind};

test_case!(
    name: root_property,
    ast: property("name"),
    value: "Nikola Tesla",
);

test_case!(
    name: nested_property,
    ast: chain(vec![property("placeOfBirth"), property("city")]),
    value: "Smiljan",
);

test_case!(
    name: method_on_property,
    ast: chain(vec![property("name"), method("toUpperCase", vec![])]),
    value: "NIKOLA TESLA",
);

test_case!(
    name: list_index,
    ast: chain(vec![property("inventions"), index(int(2))]),
    value: "radio",
);

test_case!(
    name: method_with_arguments,
    ast: chain(vec![property("name"), method("substring", vec![int(0), int(6)])]),
    value: "Nikola",
);

test_case!(
    name: null_safe_step_on_missing_mentor,
    ast: chain(vec![property("mentor"), safe_property("name")]),
    value: Value::Null,
);

test_case!(
    name: arithmetic_on_property,
    ast: binary(BinaryOp::Add, property("birthYear"), int(100)),
    value: 1956,
);

test_case!(
    name: string_concatenation_with_number,
    ast: binary(BinaryOp::Add, string("born "), property("birthYear")),
    value: "born 1856",
);

test_case!(
    name: select_primes_above_five,
    ast: chain(vec![
        variable("primes"),
        select(SelectionKind::All, compare(ComparisonOp::Gt, variable("this"), int(5))),
    ]),
    value: Value::list(vec![Value::Int(7), Value::Int(11)]),
);

test_case!(
    name: project_invention_lengths,
    ast: chain(vec![property("inventions"), project(method("length", vec![]))]),
    value: Value::list(vec![Value::Int(15), Value::Int(19), Value::Int(5)]),
);

test_case!(
    name: static_method_through_type_reference,
    ast: chain(vec![type_ref("Math"), method("max", vec![int(3), property("birthYear")])]),
    value: 1856,
);

test_case!(
    name: elvis_on_missing_mentor,
    ast: elvis(property("mentor"), string("nobody")),
    value: "nobody",
);
