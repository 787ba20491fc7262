//! Quill core: an embeddable expression evaluation engine.
//!
//! Expressions arrive as pre-built syntax trees ([`ast::Node`]) and are evaluated
//! against a root object and a caller-supplied [`context::EvaluationContext`].
//! Hot expressions whose shape has proven stable can be compiled into bytecode
//! ([`vm::Code`]) that runs without revisiting the tree.

pub mod api;
pub mod ast;
pub mod compiler;
pub mod context;
pub mod evaluator;
pub mod scope_stack;
pub mod state;
pub mod types;
pub mod values;
pub mod vm;

pub use api::{CompilationOptions, CompilationState, CompilerMode, EvaluationOptions, Expression};
pub use ast::{Node, NodeKind, Span};
pub use context::{EvaluationContext, StandardEvaluationContext};
pub use evaluator::{EvalError, EvalErrorKind};
pub use state::ExpressionState;
pub use types::TypeDescriptor;
pub use values::{TypedValue, Value};

/// Test utilities for enabling logging in tests
#[cfg(test)]
pub mod test_utils {
    /// Initialize tracing subscriber for tests with DEBUG level
    /// Call this at the start of tests where you want to see logging output
    ///
    /// # Example
    /// ```ignore
    /// #[test]
    /// fn test_compilation_fallback() {
    ///     test_utils::init_test_logging();
    ///     // ... your test code
    /// }
    /// ```
    pub fn init_test_logging() {
        use tracing_subscriber::{EnvFilter, fmt};

        // Try to initialize, ignore error if already initialized
        let _ = fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    }
}
