//! Bytecode compiler for expression trees.
//!
//! This module turns a tree the interpreter has already evaluated into VM
//! bytecode. Interpretation leaves exit types and resolved accessors and
//! executors on the nodes; the compiler reads those caches and emits code
//! specialised for them.
//!
//! ## Design
//!
//! - One pass over the tree; a node that cannot be compiled aborts the pass
//! - Tracks stack depth precisely
//! - Implements jump patching for control flow (ternary, elvis, boolean
//!   short-circuit, null-safe navigation)
//! - Guards every cached shape with `CheckType` so drift faults instead of
//!   producing a wrong value

mod bytecode;
mod error;


pub use bytecode::BytecodeCompiler;
pub use error::CompileError;

use crate::api::EvaluationOptions;
use crate::ast::Node;

impl Node {
    /// Whether this subtree can be compiled with its caches as they are now.
    ///
    /// Compilation succeeds exactly when this returns `true` for default
    /// evaluation options.
    pub fn is_compilable(&self) -> bool {
        BytecodeCompiler::compile(self, &EvaluationOptions::default()).is_ok()
    }
}
