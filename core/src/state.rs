//! Per-evaluation state.
//!
//! One [`ExpressionState`] exists for each top-level evaluation. It is never
//! shared: the tree's caches are shared across threads, the state is not.

use crate::api::EvaluationOptions;
use crate::ast::BinaryOp;
use crate::context::EvaluationContext;
use crate::evaluator::{EvalError, EvalErrorKind};
use crate::scope_stack::{Scope, ScopeStack};
use crate::types::TypeDescriptor;
use crate::values::{TypedValue, Value};

/// The mutable side of one evaluation: active context objects, variable
/// scopes, and the context everything else is delegated to.
pub struct ExpressionState<'a> {
    context: &'a dyn EvaluationContext,
    root: TypedValue,
    options: EvaluationOptions,
    /// Top is the implicit receiver; empty means the root.
    context_objects: Vec<TypedValue>,
    /// What `#this` meant when each scope was entered.
    scope_roots: Vec<TypedValue>,
    locals: ScopeStack<TypedValue>,
    depth: usize,
}

impl<'a> ExpressionState<'a> {
    /// State rooted at the context's own root object.
    pub fn new(context: &'a dyn EvaluationContext) -> Self {
        Self::with_root(context, context.root_object())
    }

    pub fn with_root(context: &'a dyn EvaluationContext, root: TypedValue) -> Self {
        let mut locals = ScopeStack::new();
        locals.push(Scope::new());
        Self {
            context,
            root,
            options: EvaluationOptions::default(),
            context_objects: Vec::new(),
            scope_roots: Vec::new(),
            locals,
            depth: 0,
        }
    }

    pub fn with_options(mut self, options: EvaluationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn context(&self) -> &'a dyn EvaluationContext {
        self.context
    }

    pub fn options(&self) -> &EvaluationOptions {
        &self.options
    }

    pub fn root_object(&self) -> &TypedValue {
        &self.root
    }

    /// The implicit receiver for unqualified references.
    pub fn active_context_object(&self) -> &TypedValue {
        self.context_objects.last().unwrap_or(&self.root)
    }

    pub fn push_active_context_object(&mut self, value: TypedValue) {
        self.context_objects.push(value);
    }

    pub fn pop_active_context_object(&mut self) {
        self.context_objects.pop();
    }

    /// The object arguments are evaluated against: the active object when the
    /// current scope was entered, or the root outside any scope.
    pub fn scope_root_object(&self) -> &TypedValue {
        self.scope_roots.last().unwrap_or(&self.root)
    }

    /// Enter a variable scope rooted at the active context object.
    pub fn enter_scope(&mut self) {
        self.scope_roots.push(self.active_context_object().clone());
        self.locals.push(Scope::new());
    }

    pub fn exit_scope(&mut self) {
        self.scope_roots.pop();
        // The bottom scope is never popped; `enter_scope` pushes above it.
        if self.locals.depth() > 1 {
            let _ = self.locals.pop();
        }
    }

    /// `#this`, `#root`, local variables, then context variables.
    pub fn lookup_variable(&self, name: &str) -> TypedValue {
        match name {
            "this" => self.active_context_object().clone(),
            "root" => self.root.clone(),
            _ => self
                .locals
                .lookup(name)
                .cloned()
                .or_else(|| self.context.lookup_variable(name))
                .unwrap_or(TypedValue::NULL),
        }
    }

    /// Assign an existing local, otherwise set the context variable.
    pub fn set_variable(&mut self, name: &str, value: TypedValue) {
        if let Err(value) = self.locals.assign(name, value) {
            self.context.set_variable(name, value);
        }
    }

    /// Bind a local in the innermost scope.
    pub fn set_local_variable(&mut self, name: &str, value: TypedValue) {
        let _ = self.locals.bind_in_current(name, value);
    }

    pub fn convert_value(&self, value: &Value, to: &TypeDescriptor) -> Result<Value, EvalError> {
        let from = value.type_descriptor();
        self.context
            .type_converter()
            .convert_value(value, from.as_ref(), to)
    }

    /// Convert to a boolean, failing on null.
    pub fn convert_to_bool(&self, value: &Value) -> Result<bool, EvalError> {
        if let Value::Bool(b) = value {
            return Ok(*b);
        }
        match self.convert_value(value, &TypeDescriptor::Boolean)? {
            Value::Bool(b) => Ok(b),
            _ => Err(EvalErrorKind::TypeConversionError {
                from: value.type_name(),
                to: TypeDescriptor::Boolean.name().into(),
            }
            .into()),
        }
    }

    /// Delegate an operation the built-in rules do not cover.
    pub fn operate(&self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
        let overloader = self.context.operator_overloader();
        if overloader.overrides_operation(op, left, right) {
            return overloader.operate(op, left, right);
        }
        Err(EvalErrorKind::OperatorNotSupportedBetweenTypes {
            op: op.symbol().into(),
            left: left.type_name(),
            right: right.type_name(),
        }
        .into())
    }

    pub fn find_type(&self, name: &str) -> Result<TypeDescriptor, EvalError> {
        self.context.type_locator().find_type(name)
    }

    pub(crate) fn descend(&mut self) -> Result<(), EvalError> {
        if self.depth >= self.options.max_depth {
            return Err(EvalErrorKind::StackOverflow {
                max_depth: self.options.max_depth,
            }
            .into());
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StandardEvaluationContext;

    #[test]
    fn test_active_object_defaults_to_root() {
        let context = StandardEvaluationContext::new();
        let mut state = ExpressionState::with_root(&context, Value::Int(1).into());
        assert_eq!(state.active_context_object().value, Value::Int(1));

        state.push_active_context_object(Value::str("inner").into());
        assert_eq!(state.active_context_object().value, Value::str("inner"));
        assert_eq!(state.scope_root_object().value, Value::Int(1));

        state.pop_active_context_object();
        assert_eq!(state.active_context_object().value, Value::Int(1));
    }

    #[test]
    fn test_scope_root_records_active_object() {
        let context = StandardEvaluationContext::new();
        let mut state = ExpressionState::with_root(&context, Value::Int(1).into());
        state.push_active_context_object(Value::Int(2).into());
        state.enter_scope();
        state.push_active_context_object(Value::Int(3).into());

        assert_eq!(state.scope_root_object().value, Value::Int(2));
        assert_eq!(state.lookup_variable("this").value, Value::Int(3));
        assert_eq!(state.lookup_variable("root").value, Value::Int(1));

        state.pop_active_context_object();
        state.exit_scope();
        assert_eq!(state.scope_root_object().value, Value::Int(1));
    }

    #[test]
    fn test_locals_shadow_context_variables() {
        let context = StandardEvaluationContext::new().with_variable("x", 1);
        let mut state = ExpressionState::new(&context);
        state.enter_scope();
        state.set_local_variable("x", Value::Int(2).into());
        assert_eq!(state.lookup_variable("x").value, Value::Int(2));

        state.set_variable("x", Value::Int(3).into());
        assert_eq!(state.lookup_variable("x").value, Value::Int(3));
        state.exit_scope();

        assert_eq!(state.lookup_variable("x").value, Value::Int(1));
        state.set_variable("y", Value::Int(4).into());
        assert_eq!(context.lookup_variable("y").map(|v| v.value), Some(Value::Int(4)));
    }

    #[test]
    fn test_depth_limit() {
        let context = StandardEvaluationContext::new();
        let mut state = ExpressionState::new(&context).with_options(EvaluationOptions {
            max_depth: 2,
            ..EvaluationOptions::default()
        });
        state.descend().unwrap();
        state.descend().unwrap();
        let err = state.descend().unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::StackOverflow { max_depth: 2 }));
        state.ascend();
        assert!(state.descend().is_ok());
    }

    #[test]
    fn test_null_does_not_convert_to_bool() {
        let context = StandardEvaluationContext::new();
        let state = ExpressionState::new(&context);
        assert!(state.convert_to_bool(&Value::Bool(true)).unwrap());
        assert!(state.convert_to_bool(&Value::str("false")).is_ok());
        assert!(state.convert_to_bool(&Value::Null).is_err());
    }
}
