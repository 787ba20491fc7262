//! Stack machine for compiled expressions.
//!
//! A [`Code`] is produced by [`crate::compiler::BytecodeCompiler`] from a tree
//! whose shape the interpreter has already observed. The [`Vm`] runs it
//! without touching the tree; any value that does not match what the code was
//! compiled for stops it with [`VmError::TypeShape`].

mod code;
mod instruction_set;
mod runtime;
mod stack;

pub use code::{CallSite, Code};
pub use instruction_set::Instruction;
pub use runtime::{Vm, VmError};

pub(crate) use stack::Stack;
