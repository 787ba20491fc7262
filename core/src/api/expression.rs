//! Expressions and their compile/fallback life cycle.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use ecow::EcoString;
use tracing::debug;

use super::{CompilerMode, ExpressionOptions};
use crate::ast::{Node, Published};
use crate::compiler::BytecodeCompiler;
use crate::context::EvaluationContext;
use crate::evaluator::EvalError;
use crate::state::ExpressionState;
use crate::types::TypeDescriptor;
use crate::values::{TypedValue, Value};
use crate::vm::{Code, Vm, VmError};

/// Where an expression is in its compilation life cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompilationState {
    /// Nothing observed yet.
    Interpreted,
    /// The result type has been observed; the tree may become compilable.
    ExitTypeKnown,
    /// Evaluations run compiled code.
    Compiled,
    /// Compiled code faulted and was dropped.
    Fallback,
}

/// A parsed expression that can be evaluated many times, from many threads.
///
/// Every evaluation is interpreted until the compiler mode and counters say
/// the tree should be compiled. Once compiled, evaluations run the
/// [`Code`]; a type shape fault drops it and interpretation resumes.
///
/// # Execution Modes
///
/// - **`CompilerMode::Off`**: always interpret.
/// - **`CompilerMode::Immediate`**: compile after the first successful
///   interpretation. Evaluation errors from compiled code reach the caller.
/// - **`CompilerMode::Mixed`**: compile after `threshold` interpretations.
///   Any failure of compiled code re-runs the evaluation interpreted.
///
/// # Example
///
/// ```
/// use quill_core::api::{CompilationOptions, CompilationState, CompilerMode, Expression, ExpressionOptions};
/// use quill_core::ast::builder::{binary, int, property};
/// use quill_core::ast::BinaryOp;
/// use quill_core::values::Record;
/// use quill_core::{StandardEvaluationContext, TypeDescriptor, Value};
///
/// let order = Record::new(TypeDescriptor::named("Order"))
///     .with_field("quantity", 3)
///     .into_ref();
/// let context = StandardEvaluationContext::new().with_root(order);
///
/// let options = ExpressionOptions {
///     compilation: CompilationOptions {
///         mode: CompilerMode::Immediate,
///         ..CompilationOptions::default()
///     },
///     ..ExpressionOptions::default()
/// };
/// let expr = Expression::new(binary(BinaryOp::Mul, property("quantity"), int(2)))
///     .with_options(options);
///
/// assert_eq!(expr.get_value(&context).unwrap(), Value::Int(6));
/// assert_eq!(expr.compilation_state(), CompilationState::Compiled);
/// assert_eq!(expr.get_value(&context).unwrap(), Value::Int(6));
/// ```
#[derive(Debug)]
pub struct Expression {
    /// Source text the tree was parsed from, for logs and diagnostics.
    source: Option<EcoString>,

    ast: Node,

    options: ExpressionOptions,

    /// Interpretations since the last compilation attempt.
    interpreted_count: AtomicU32,

    /// Refused compilations plus faults of compiled code.
    failed_attempts: AtomicU32,

    fallen_back: AtomicBool,

    compiled: Published<Code>,
}

static_assertions::assert_impl_all!(Expression: Send, Sync);

impl Expression {
    pub fn new(ast: Node) -> Self {
        Self {
            source: None,
            ast,
            options: ExpressionOptions::default(),
            interpreted_count: AtomicU32::new(0),
            failed_attempts: AtomicU32::new(0),
            fallen_back: AtomicBool::new(false),
            compiled: Published::new(),
        }
    }

    pub fn with_options(mut self, options: ExpressionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_source(mut self, source: impl Into<EcoString>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn ast(&self) -> &Node {
        &self.ast
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn options(&self) -> &ExpressionOptions {
        &self.options
    }

    /// Evaluate against the context's root object.
    pub fn get_value(&self, context: &dyn EvaluationContext) -> Result<Value, EvalError> {
        let mut state = self.state(context, context.root_object());
        self.get_typed_value(&mut state).map(TypedValue::into_value)
    }

    /// Evaluate against `root` instead of the context's root object.
    pub fn get_value_with_root(
        &self,
        context: &dyn EvaluationContext,
        root: impl Into<TypedValue>,
    ) -> Result<Value, EvalError> {
        let mut state = self.state(context, root.into());
        self.get_typed_value(&mut state).map(TypedValue::into_value)
    }

    /// Evaluate and convert the result with the context's type converter.
    pub fn get_value_as(
        &self,
        context: &dyn EvaluationContext,
        ty: &TypeDescriptor,
    ) -> Result<Value, EvalError> {
        let mut state = self.state(context, context.root_object());
        let value = self.get_typed_value(&mut state)?.into_value();
        state.convert_value(&value, ty)
    }

    /// Evaluate with caller-built state, running compiled code when present.
    pub fn get_typed_value(&self, state: &mut ExpressionState<'_>) -> Result<TypedValue, EvalError> {
        if let Some(code) = self.compiled.load() {
            match Vm::execute(&code, state) {
                Ok(value) => return Ok(value),
                Err(VmError::Eval(error))
                    if self.options.compilation.mode == CompilerMode::Immediate =>
                {
                    return Err(error);
                }
                Err(error) => {
                    debug!(source = self.describe(), %error, "Compiled expression failed, interpreting");
                    self.compiled.clear();
                    self.fallen_back.store(true, Ordering::Relaxed);
                    self.record_failure();
                }
            }
        }

        let value = self.ast.get_typed_value(state)?;
        self.after_interpretation();
        Ok(value)
    }

    /// Write `value` to the location the expression denotes. Always
    /// interpreted.
    pub fn set_value(
        &self,
        context: &dyn EvaluationContext,
        value: impl Into<Value>,
    ) -> Result<(), EvalError> {
        let mut state = self.state(context, context.root_object());
        self.ast.set_value(&mut state, value.into())
    }

    pub fn is_writable(&self, context: &dyn EvaluationContext) -> bool {
        let mut state = self.state(context, context.root_object());
        self.ast.is_writable(&mut state)
    }

    /// Whether [`compile_expression`](Self::compile_expression) would succeed
    /// now.
    pub fn is_compilable(&self) -> bool {
        BytecodeCompiler::compile(&self.ast, &self.options.evaluation).is_ok()
    }

    /// Compile now, regardless of mode and counters.
    ///
    /// Returns whether compiled code is installed.
    pub fn compile_expression(&self) -> bool {
        debug!(source = self.describe(), "Attempting compilation");
        match BytecodeCompiler::compile(&self.ast, &self.options.evaluation) {
            Ok(code) => {
                debug!(
                    source = self.describe(),
                    instructions = code.instructions.len(),
                    "Expression compiled"
                );
                self.compiled.store(code);
                self.fallen_back.store(false, Ordering::Relaxed);
                true
            }
            Err(error) => {
                debug!(source = self.describe(), %error, "Expression not compiled");
                self.record_failure();
                false
            }
        }
    }

    /// Drop compiled code and everything observed so far. The next
    /// compilation starts from fresh observations.
    pub fn revert_to_interpreted(&self) {
        self.compiled.clear();
        self.interpreted_count.store(0, Ordering::Relaxed);
        self.failed_attempts.store(0, Ordering::Relaxed);
        self.fallen_back.store(false, Ordering::Relaxed);
        self.ast.reset_caches();
    }

    pub fn compilation_state(&self) -> CompilationState {
        if self.compiled.is_set() {
            CompilationState::Compiled
        } else if self.fallen_back.load(Ordering::Relaxed) {
            CompilationState::Fallback
        } else if self.ast.exit_type().is_some() {
            CompilationState::ExitTypeKnown
        } else {
            CompilationState::Interpreted
        }
    }

    /// The installed compiled code, if any.
    pub fn compiled_code(&self) -> Option<std::sync::Arc<Code>> {
        self.compiled.load()
    }

    fn state<'c>(&self, context: &'c dyn EvaluationContext, root: TypedValue) -> ExpressionState<'c> {
        ExpressionState::with_root(context, root).with_options(self.options.evaluation.clone())
    }

    fn after_interpretation(&self) {
        let compilation = &self.options.compilation;
        let threshold = match compilation.mode {
            CompilerMode::Off => return,
            CompilerMode::Immediate => 1,
            CompilerMode::Mixed => compilation.threshold.max(1),
        };
        let count = self
            .interpreted_count
            .fetch_add(1, Ordering::Relaxed)
            .saturating_add(1);
        if count < threshold
            || self.compiled.is_set()
            || self.failed_attempts.load(Ordering::Relaxed) >= compilation.max_failed_attempts
        {
            return;
        }
        self.interpreted_count.store(0, Ordering::Relaxed);
        self.compile_expression();
    }

    fn record_failure(&self) {
        let failed = self.failed_attempts.fetch_add(1, Ordering::Relaxed) + 1;
        if failed == self.options.compilation.max_failed_attempts {
            debug!(source = self.describe(), failed, "Compilation disabled");
        }
    }

    fn describe(&self) -> &str {
        self.source.as_deref().unwrap_or("<tree>")
    }
}
