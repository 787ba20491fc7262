//! Tree-walking interpreter.
//!
//! Every [`Node`] evaluates itself against an [`ExpressionState`]. Reference
//! nodes resolve accessors and executors through the evaluation context and
//! cache what they resolved on the node, so repeated evaluations of the same
//! tree skip resolution while the shapes they see stay the same.
//!
//! ## Design Principles
//!
//! - **Never panic**: host failures surface as [`EvalError`]s
//! - **Stack-safe**: depth tracking bounds recursion on deeply nested trees
//! - **Thread-safe caches**: a tree may be evaluated from many threads at once
//!
//! ## Example
//!
//! ```
//! use quill_core::ast::builder::*;
//! use quill_core::ast::BinaryOp;
//! use quill_core::context::StandardEvaluationContext;
//! use quill_core::evaluator;
//! use quill_core::values::Value;
//!
//! let tree = binary(BinaryOp::Add, int(3), binary(BinaryOp::Mul, int(4), int(2)));
//! let context = StandardEvaluationContext::new();
//! let result = evaluator::evaluate(&tree, &context, None).unwrap();
//! assert_eq!(result, Value::Int(11));
//! ```

mod collections;
mod error;
mod eval;
mod indexer;
pub(crate) mod operators;
pub(crate) mod references;
mod value_ref;


pub use error::{CallError, EvalError, EvalErrorKind};
pub use value_ref::ValueRef;

use crate::ast::Node;
use crate::context::EvaluationContext;
use crate::state::ExpressionState;
use crate::values::{TypedValue, Value};

/// Evaluate a tree once with default options.
///
/// `root` overrides the context's root object.
pub fn evaluate(
    node: &Node,
    context: &dyn EvaluationContext,
    root: Option<TypedValue>,
) -> Result<Value, EvalError> {
    let mut state = match root {
        Some(root) => ExpressionState::with_root(context, root),
        None => ExpressionState::new(context),
    };
    node.get_value(&mut state)
}
