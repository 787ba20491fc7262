//! The expression tree.
//!
//! Trees are built by an external parser (or by the helpers in [`builder`])
//! and are immutable afterwards apart from their caches, which makes a
//! [`Node`] safe to evaluate from many threads at once.

pub mod builder;
mod node;
mod ops;
mod published;

use core::ops::Range;

pub use node::{
    CachedAccessor, CachedConstructor, CachedFunction, CachedMethod, ConstructorReference,
    FunctionReference, Indexer, InlineList, InlineMap, MethodReference, Node, NodeKind, Projection,
    PropertyReference, Selection, TypeReference,
};
pub use ops::{BinaryOp, BoolOp, ComparisonOp, SelectionKind, StepOp, UnaryOp};
pub use published::{ExitType, Published};

/// Byte range of a node in the expression source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Span(pub Range<usize>);

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self(start..end)
    }

    pub fn combine(a: &Span, b: &Span) -> Span {
        Span::new(a.0.start, b.0.end)
    }

    pub fn str_of<'a>(&self, source: &'a str) -> &'a str {
        &source[self.0.start..self.0.end]
    }

    pub fn start(&self) -> usize {
        self.0.start
    }

    pub fn end(&self) -> usize {
        self.0.end
    }
}
