//! Bytecode compilation errors.

use thiserror::Error;

use crate::ast::Span;

/// Why a tree could not be compiled.
///
/// None of these reach the caller of an expression: a tree that fails to
/// compile simply keeps being interpreted.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Too many constants in the constant pool (limit: 65536)
    #[error("too many constants (limit: 65536)")]
    TooManyConstants,
    /// Too many property, method, constructor or variable sites (limit: 65536)
    #[error("too many call sites (limit: 65536)")]
    TooManySites,
    /// Jump distance exceeds maximum (limit: 65535 instructions)
    #[error("jump distance too large (limit: 65535 instructions)")]
    JumpTooFar,
    /// A node whose kind, cache state or observed types rule out compilation.
    #[error("{kind} is not compilable: {reason}")]
    NotCompilable {
        kind: &'static str,
        span: Span,
        reason: &'static str,
    },
    /// Auto-growing evaluation mutates the root in ways compiled code does
    /// not reproduce.
    #[error("auto-grow evaluation options are enabled")]
    AutoGrowEnabled,
}
