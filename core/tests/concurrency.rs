//! One expression evaluated from many threads, each with its own context.

use std::thread;

use quill_core::api::ExpressionOptions;
use quill_core::ast::BinaryOp;
use quill_core::ast::builder::*;
use quill_core::values::Record;
use quill_core::{
    CompilationOptions, CompilerMode, Expression, StandardEvaluationContext, TypeDescriptor, Value,
};

const THREADS: i32 = 8;
const ROUNDS: usize = 200;

fn mixed(threshold: u32) -> ExpressionOptions {
    ExpressionOptions {
        compilation: CompilationOptions {
            mode: CompilerMode::Mixed,
            threshold,
            ..CompilationOptions::default()
        },
        ..ExpressionOptions::default()
    }
}

fn item(price: impl Into<Value>) -> StandardEvaluationContext {
    let root = Record::new(TypeDescriptor::named("Item"))
        .with_field("price", price)
        .into_ref();
    StandardEvaluationContext::new().with_root(root)
}

#[test]
fn test_shared_expression_gives_each_thread_its_own_result() {
    let expr = Expression::new(binary(BinaryOp::Mul, property("price"), int(2)))
        .with_options(mixed(5));

    thread::scope(|scope| {
        for id in 0..THREADS {
            let expr = &expr;
            scope.spawn(move || {
                let context = item(id);
                for _ in 0..ROUNDS {
                    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(id * 2));
                }
            });
        }
    });

    assert!(expr.compiled_code().is_some());
}

#[test]
fn test_racing_type_shapes_never_give_wrong_answers() {
    let expr = Expression::new(binary(BinaryOp::Add, property("price"), int(1)))
        .with_options(mixed(1));

    thread::scope(|scope| {
        for id in 0..THREADS {
            let expr = &expr;
            scope.spawn(move || {
                let (context, expected) = if id % 2 == 0 {
                    (item(id), Value::Int(id + 1))
                } else {
                    (item(format!("p{id}").as_str()), Value::str(format!("p{id}1")))
                };
                for _ in 0..ROUNDS {
                    assert_eq!(expr.get_value(&context).unwrap(), expected);
                }
            });
        }
    });
}

#[test]
fn test_revert_while_evaluating() {
    let expr = Expression::new(binary(BinaryOp::Sub, property("price"), int(1)))
        .with_options(mixed(2));

    thread::scope(|scope| {
        for id in 0..THREADS {
            let expr = &expr;
            scope.spawn(move || {
                let context = item(id * 10);
                for round in 0..ROUNDS {
                    if id == 0 && round % 20 == 0 {
                        expr.revert_to_interpreted();
                    }
                    assert_eq!(expr.get_value(&context).unwrap(), Value::Int(id * 10 - 1));
                }
            });
        }
    });
}
