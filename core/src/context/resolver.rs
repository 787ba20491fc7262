use core::fmt;
use std::sync::Arc;

use super::EvaluationContext;
use crate::evaluator::{CallError, EvalError};
use crate::types::TypeDescriptor;
use crate::values::{TypedValue, Value};

/// Finds a method for a target and argument types.
///
/// `Ok(None)` declines, letting the next resolver try. `Err` means a method
/// was identified but cannot be used (for example an ambiguous overload).
pub trait MethodResolver: Send + Sync + fmt::Debug {
    fn resolve(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        arg_types: &[Option<TypeDescriptor>],
    ) -> Result<Option<Arc<dyn MethodExecutor>>, EvalError>;
}

/// A resolved, invocable method.
pub trait MethodExecutor: Send + Sync + fmt::Debug {
    fn execute(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        args: Vec<Value>,
    ) -> Result<TypedValue, CallError>;

    /// Whether compiled code may call this executor directly.
    fn is_compilable(&self) -> bool {
        false
    }

    /// The type that declares the method, if known.
    fn declaring_type(&self) -> Option<TypeDescriptor> {
        None
    }
}

/// Finds a constructor for a type name and argument types.
pub trait ConstructorResolver: Send + Sync + fmt::Debug {
    fn resolve(
        &self,
        context: &dyn EvaluationContext,
        type_name: &str,
        arg_types: &[Option<TypeDescriptor>],
    ) -> Result<Option<Arc<dyn ConstructorExecutor>>, EvalError>;
}

pub trait ConstructorExecutor: Send + Sync + fmt::Debug {
    fn execute(
        &self,
        context: &dyn EvaluationContext,
        args: Vec<Value>,
    ) -> Result<TypedValue, CallError>;

    fn is_compilable(&self) -> bool {
        false
    }

    fn declaring_type(&self) -> Option<TypeDescriptor> {
        None
    }
}
