//! Quill - an embeddable expression evaluation engine
//!
//! # Overview
//!
//! Quill evaluates pre-parsed expression trees against a root object and an
//! [`EvaluationContext`] supplied by the host application. Common use cases
//! include:
//!
//! - Configuration values computed from other settings
//! - Validation and routing rules
//! - Data bindings between host objects
//!
//! Expressions that are evaluated often can be compiled into bytecode once
//! the types flowing through them have settled; a later type change makes
//! them fall back to interpretation.
//!
//! # Quick Start
//!
//! ```
//! use quill::ast::builder::{binary, chain, int, method, property};
//! use quill::ast::BinaryOp;
//! use quill::values::Record;
//! use quill::{Expression, StandardEvaluationContext, TypeDescriptor, Value};
//!
//! let person = Record::new(TypeDescriptor::named("Person"))
//!     .with_field("name", "Ada")
//!     .with_field("age", 36)
//!     .into_ref();
//! let context = StandardEvaluationContext::new().with_root(person);
//!
//! let next_year = Expression::new(binary(BinaryOp::Add, property("age"), int(1)));
//! assert_eq!(next_year.get_value(&context).unwrap(), Value::Int(37));
//!
//! let shout = Expression::new(chain(vec![property("name"), method("toUpperCase", vec![])]));
//! assert_eq!(shout.get_value(&context).unwrap(), Value::str("ADA"));
//! ```
//!
//! # Error Rendering
//!
//! Evaluation errors carry the span of the node that failed. Paired with the
//! expression source they render as annotated snippets:
//!
//! ```
//! use quill::ast::builder::{binary, int};
//! use quill::ast::BinaryOp;
//! use quill::{Error, Expression, StandardEvaluationContext, render_error_to_string_no_color};
//!
//! let expr = Expression::new(binary(BinaryOp::Div, int(1).at(0, 1), int(0).at(4, 5)).at(0, 5))
//!     .with_source("1 / 0");
//! let context = StandardEvaluationContext::new();
//!
//! let error = Error::from_eval(&expr, expr.get_value(&context).unwrap_err());
//! let output = render_error_to_string_no_color(&error);
//! assert!(output.contains("1 / 0"));
//! ```

mod error_renderer;

use thiserror::Error;

pub use error_renderer::{
    render_error, render_error_to, render_error_to_string, render_error_to_string_no_color,
};

// Re-export public API from quill_core
pub use quill_core::api::{
    CompilationOptions, CompilationState, CompilerMode, Diagnostic, EvaluationOptions, Expression,
    ExpressionOptions, Severity,
};

// Re-export commonly used types and values
pub use quill_core::ast::{self, Node, NodeKind, Span};
pub use quill_core::context::{self, EvaluationContext, StandardEvaluationContext};
pub use quill_core::types::{self, TypeDescriptor};
pub use quill_core::values::{self, TypedValue, Value};

// Re-export errors
pub use quill_core::evaluator::{CallError, EvalError, EvalErrorKind};

/// An evaluation error together with the source text it points into.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct Error {
    /// Expression source; empty when the tree was built without one.
    pub expression: String,
    #[source]
    pub error: EvalError,
}

impl Error {
    pub fn new(expression: impl Into<String>, error: EvalError) -> Self {
        Self {
            expression: expression.into(),
            error,
        }
    }

    /// Pair `error` with the source of the expression that raised it.
    pub fn from_eval(expression: &Expression, error: EvalError) -> Self {
        Self::new(expression.source().unwrap_or_default(), error)
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        self.error.to_diagnostic()
    }
}
