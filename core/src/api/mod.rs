//! Public API for Quill expressions.
//!
//! This module provides the stable public API for evaluating expressions.
//! An [`Expression`] owns a syntax tree and decides, from its
//! [`ExpressionOptions`], when the tree is interpreted and when it runs as
//! compiled code:
//!
//! 1. **Interpreted**: every evaluation walks the tree (`CompilerMode::Off`)
//! 2. **Compiled**: after enough evaluations the tree becomes bytecode; a
//!    type shape fault drops back to interpretation
//!
//! # Example
//!
//! ```
//! use quill_core::api::Expression;
//! use quill_core::ast::builder::{chain, method, string};
//! use quill_core::{StandardEvaluationContext, Value};
//!
//! let context = StandardEvaluationContext::new();
//! let expr = Expression::new(chain(vec![string("quill"), method("toUpperCase", vec![])]))
//!     .with_source("'quill'.toUpperCase()");
//!
//! assert_eq!(expr.get_value(&context).unwrap(), Value::str("QUILL"));
//! ```

pub mod error;
pub mod expression;
pub mod options;

pub use error::{Diagnostic, Severity};
pub use expression::{CompilationState, Expression};
pub use options::{CompilationOptions, CompilerMode, EvaluationOptions, ExpressionOptions};
