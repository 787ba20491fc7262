//! Benchmarks for interpreted versus compiled evaluation.
//!
//! Run with: `cargo bench` in the core/ directory.
//!
//! Benchmark groups:
//! 1. arithmetic: `price + 1 + 1 + ... + 1` with a growing number of additions
//! 2. navigation: a property/method chain over a host object

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use quill_core::api::ExpressionOptions;
use quill_core::ast::BinaryOp;
use quill_core::ast::builder::*;
use quill_core::values::Record;
use quill_core::{
    CompilationOptions, CompilerMode, Expression, Node, StandardEvaluationContext, TypeDescriptor,
};

/// `price + 1 + 1 + ... + 1` with `n` additions.
fn arithmetic_chain(n: usize) -> Node {
    (0..n).fold(property("price"), |tree, _| binary(BinaryOp::Add, tree, int(1)))
}

fn navigation() -> Node {
    chain(vec![
        property("customer"),
        property("name"),
        method("toUpperCase", vec![]),
        method("length", vec![]),
    ])
}

fn context() -> StandardEvaluationContext {
    let customer = Record::new(TypeDescriptor::named("Customer"))
        .with_field("name", "Ada Lovelace")
        .into_ref();
    let order = Record::new(TypeDescriptor::named("Order"))
        .with_field("price", 10)
        .with_field("customer", customer)
        .into_ref();
    StandardEvaluationContext::new().with_root(order)
}

fn with_mode(tree: Node, mode: CompilerMode) -> Expression {
    let options = ExpressionOptions {
        compilation: CompilationOptions {
            mode,
            ..CompilationOptions::default()
        },
        ..ExpressionOptions::default()
    };
    Expression::new(tree).with_options(options)
}

fn bench_arithmetic(c: &mut Criterion) {
    let mut group = c.benchmark_group("arithmetic");
    let context = context();

    for size in [10, 100, 400] {
        group.throughput(Throughput::Elements(size as u64));

        let interpreted = with_mode(arithmetic_chain(size), CompilerMode::Off);
        group.bench_with_input(BenchmarkId::new("interpreted", size), &size, |b, _| {
            b.iter(|| black_box(interpreted.get_value(black_box(&context)).expect("Eval failed")))
        });

        let compiled = with_mode(arithmetic_chain(size), CompilerMode::Immediate);
        compiled.get_value(&context).expect("Eval failed");
        assert!(compiled.compiled_code().is_some(), "expression did not compile");
        group.bench_with_input(BenchmarkId::new("compiled", size), &size, |b, _| {
            b.iter(|| black_box(compiled.get_value(black_box(&context)).expect("Eval failed")))
        });
    }

    group.finish();
}

fn bench_navigation(c: &mut Criterion) {
    let mut group = c.benchmark_group("navigation");
    let context = context();

    let interpreted = with_mode(navigation(), CompilerMode::Off);
    group.bench_function("interpreted", |b| {
        b.iter(|| black_box(interpreted.get_value(black_box(&context)).expect("Eval failed")))
    });

    let compiled = with_mode(navigation(), CompilerMode::Immediate);
    compiled.get_value(&context).expect("Eval failed");
    group.bench_function("compiled", |b| {
        b.iter(|| black_box(compiled.get_value(black_box(&context)).expect("Eval failed")))
    });

    group.finish();
}

criterion_group!(benches, bench_arithmetic, bench_navigation);
criterion_main!(benches);
