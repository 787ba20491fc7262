//! Compilation life cycle of an `Expression`: thresholds, equivalence with
//! interpretation, and fallback after the observed types change.

use core::cmp::Ordering;

use pretty_assertions::assert_eq;
use quill_core::ast::builder::*;
use quill_core::api::ExpressionOptions;
use quill_core::ast::{BinaryOp, ComparisonOp, UnaryOp};
use quill_core::context::{StandardTypeComparator, TypeComparator};
use quill_core::values::Record;
use quill_core::vm::Instruction;
use quill_core::{
    CompilationOptions, CompilationState, CompilerMode, EvalError, EvalErrorKind, Expression,
    Node, StandardEvaluationContext, TypeDescriptor, Value,
};

fn options(mode: CompilerMode, threshold: u32, max_failed_attempts: u32) -> ExpressionOptions {
    ExpressionOptions {
        compilation: CompilationOptions {
            mode,
            threshold,
            max_failed_attempts,
        },
        ..ExpressionOptions::default()
    }
}

fn account(balance: impl Into<Value>) -> StandardEvaluationContext {
    let root = Record::new(TypeDescriptor::named("Account"))
        .with_field("owner", "ada")
        .with_field("balance", balance)
        .with_field("limit", 100)
        .into_ref();
    StandardEvaluationContext::new().with_root(root)
}

fn set_balance(context: &StandardEvaluationContext, balance: impl Into<Value>) {
    Expression::new(property("balance"))
        .set_value(context, balance)
        .unwrap();
}

#[test]
fn test_off_mode_never_compiles() {
    let context = account(10);
    let expr = Expression::new(binary(BinaryOp::Add, property("balance"), int(1)));

    for _ in 0..5 {
        assert_eq!(expr.get_value(&context).unwrap(), Value::Int(11));
    }

    assert_eq!(expr.compilation_state(), CompilationState::ExitTypeKnown);
    assert!(expr.compiled_code().is_none());
    assert!(expr.is_compilable());
}

#[test]
fn test_mixed_mode_compiles_at_threshold() {
    let context = account(10);
    let expr = Expression::new(binary(BinaryOp::Add, property("balance"), int(1)))
        .with_options(options(CompilerMode::Mixed, 3, 10));

    assert_eq!(expr.compilation_state(), CompilationState::Interpreted);
    expr.get_value(&context).unwrap();
    expr.get_value(&context).unwrap();
    assert_eq!(expr.compilation_state(), CompilationState::ExitTypeKnown);

    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(11));
    assert_eq!(expr.compilation_state(), CompilationState::Compiled);
    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(11));
}

fn equivalence_cases() -> [(&'static str, fn() -> Node); 8] {
    [
        ("balance * 3L", || binary(BinaryOp::Mul, property("balance"), long(3))),
        ("balance / 4.0", || binary(BinaryOp::Div, property("balance"), double(4.0))),
        ("owner + balance", || binary(BinaryOp::Add, property("owner"), property("balance"))),
        ("balance <= limit", || {
            compare(ComparisonOp::Le, property("balance"), property("limit"))
        }),
        ("balance > 0 and balance < 50", || {
            and(
                compare(ComparisonOp::Gt, property("balance"), int(0)),
                compare(ComparisonOp::Lt, property("balance"), int(50)),
            )
        }),
        ("balance >= limit ? 'full' : 'room'", || {
            ternary(
                compare(ComparisonOp::Ge, property("balance"), property("limit")),
                string("full"),
                string("room"),
            )
        }),
        ("owner.toUpperCase()", || {
            chain(vec![property("owner"), method("toUpperCase", vec![])])
        }),
        ("-balance", || unary(UnaryOp::Neg, property("balance"))),
    ]
}

#[test]
fn test_compiled_and_interpreted_results_agree() {
    for balances in [[10, 20, 30], [60, 5, 99]] {
        for (source, build) in equivalence_cases() {
            let context = account(balances[0]);
            let interpreted = Expression::new(build());
            let compiled = Expression::new(build())
                .with_source(source)
                .with_options(options(CompilerMode::Immediate, 1, 10));

            for balance in balances {
                set_balance(&context, balance);
                assert_eq!(
                    compiled.get_value(&context).unwrap(),
                    interpreted.get_value(&context).unwrap(),
                    "{source} at balance {balance}"
                );
            }
            assert_eq!(compiled.compilation_state(), CompilationState::Compiled, "{source}");
        }
    }
}

#[test]
fn test_type_change_falls_back_to_interpretation() {
    let context = account(41);
    let expr = Expression::new(binary(BinaryOp::Add, property("balance"), int(1)))
        .with_options(options(CompilerMode::Mixed, 1, 10));

    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(42));
    assert_eq!(expr.compilation_state(), CompilationState::Compiled);

    set_balance(&context, "forty-one");
    assert_eq!(expr.get_value(&context).unwrap(), Value::str("forty-one1"));
    assert_ne!(expr.compilation_state(), CompilationState::Compiled);

    set_balance(&context, 41);
    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(42));
}

#[test]
fn test_failure_budget_stops_compilation() {
    let context = account(1);
    let expr = Expression::new(binary(BinaryOp::Add, property("balance"), int(1)))
        .with_options(options(CompilerMode::Mixed, 1, 2));

    expr.get_value(&context).unwrap();
    assert_eq!(expr.compilation_state(), CompilationState::Compiled);

    set_balance(&context, "one");
    assert_eq!(expr.get_value(&context).unwrap(), Value::str("one1"));
    set_balance(&context, 1);
    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(2));

    for _ in 0..5 {
        assert_eq!(expr.get_value(&context).unwrap(), Value::Int(2));
    }
    assert_eq!(expr.compilation_state(), CompilationState::Fallback);
    assert!(expr.compiled_code().is_none());
}

#[test]
fn test_revert_forgets_observations() {
    let context = account(1);
    let expr = Expression::new(binary(BinaryOp::Add, property("balance"), int(1)))
        .with_options(options(CompilerMode::Mixed, 1, 10));

    expr.get_value(&context).unwrap();
    assert_eq!(expr.compilation_state(), CompilationState::Compiled);

    expr.revert_to_interpreted();

    assert_eq!(expr.compilation_state(), CompilationState::Interpreted);
    assert!(!expr.is_compilable());
    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(2));
    assert_eq!(expr.compilation_state(), CompilationState::Compiled);
}

#[test]
fn test_unobserved_tree_is_not_compilable() {
    let expr = Expression::new(binary(BinaryOp::Add, property("balance"), int(1)));

    assert!(!expr.is_compilable());
    assert!(!expr.compile_expression());
    assert_eq!(expr.compilation_state(), CompilationState::Interpreted);
}

#[test]
fn test_non_compilable_tree_keeps_interpreting() {
    let context = StandardEvaluationContext::new()
        .with_variable("xs", Value::list(vec![Value::Int(1), Value::Int(4)]));
    let expr = Expression::new(chain(vec![
        variable("xs"),
        project(binary(BinaryOp::Mul, variable("this"), int(2))),
    ]))
    .with_options(options(CompilerMode::Immediate, 1, 3));

    for _ in 0..5 {
        assert_eq!(
            expr.get_value(&context).unwrap(),
            Value::list(vec![Value::Int(2), Value::Int(8)])
        );
    }
    assert!(expr.compiled_code().is_none());
}

#[test]
fn test_immediate_mode_surfaces_compiled_errors() {
    let context = account(5);
    let expr = Expression::new(binary(BinaryOp::Div, int(100), property("balance")))
        .with_options(options(CompilerMode::Immediate, 1, 10));

    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(20));
    assert_eq!(expr.compilation_state(), CompilationState::Compiled);

    set_balance(&context, 0);
    let error = expr.get_value(&context).unwrap_err();

    assert!(matches!(error.kind, EvalErrorKind::DivisionByZero));
    assert_eq!(expr.compilation_state(), CompilationState::Compiled);
}

#[test]
fn test_mixed_mode_reinterprets_compiled_errors() {
    let context = account(5);
    let expr = Expression::new(binary(BinaryOp::Div, int(100), property("balance")))
        .with_options(options(CompilerMode::Mixed, 1, 10));

    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(20));
    assert_eq!(expr.compilation_state(), CompilationState::Compiled);

    set_balance(&context, 0);
    let error = expr.get_value(&context).unwrap_err();

    assert!(matches!(error.kind, EvalErrorKind::DivisionByZero));
    assert_eq!(expr.compilation_state(), CompilationState::Fallback);
}

#[test]
fn test_immediate_mode_compiles_literal_arithmetic() {
    let context = StandardEvaluationContext::new();
    let expr = Expression::new(binary(BinaryOp::Add, int(3), int(4)))
        .with_options(options(CompilerMode::Immediate, 1, 10));

    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(7));
    assert_eq!(expr.compilation_state(), CompilationState::Compiled);

    let code = expr.compiled_code().unwrap();
    assert_eq!(code.instructions.last(), Some(&Instruction::Return));
    assert_eq!(code.max_stack_size, 2);
    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(7));
}

/// Orders everything backwards.
struct Backwards;

impl TypeComparator for Backwards {
    fn can_compare(&self, left: &Value, right: &Value) -> bool {
        StandardTypeComparator.can_compare(left, right)
    }

    fn compare(&self, left: &Value, right: &Value) -> Result<Ordering, EvalError> {
        StandardTypeComparator.compare(left, right).map(Ordering::reverse)
    }
}

#[test]
fn test_custom_comparator_agrees_across_compilation() {
    let context = account(1).with_type_comparator(Backwards);
    let cases = [
        // Two numbers compare numerically on both paths.
        (compare(ComparisonOp::Lt, property("balance"), property("limit")), true),
        // Strings go through the comparator on both paths.
        (compare(ComparisonOp::Lt, property("owner"), string("bob")), false),
    ];

    for (tree, expected) in cases {
        let expr = Expression::new(tree).with_options(options(CompilerMode::Mixed, 1, 10));
        assert_eq!(expr.get_value(&context).unwrap(), Value::Bool(expected));
        assert_eq!(expr.compilation_state(), CompilationState::Compiled);
        assert_eq!(expr.get_value(&context).unwrap(), Value::Bool(expected));
        assert_eq!(expr.compilation_state(), CompilationState::Compiled);
    }
}
