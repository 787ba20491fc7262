use thiserror::Error;
use tracing::trace;

use super::code::{CallSite, Code};
use super::instruction_set::Instruction;

use crate::ast::{BinaryOp, ComparisonOp};
use crate::context::is_registered;
use crate::evaluator::operators::{
    eval_binary_double, eval_binary_float, eval_binary_int, eval_binary_long, relation_holds,
    values_equal,
};
use crate::evaluator::references::method_target_type;
use crate::evaluator::{CallError, EvalError, EvalErrorKind};
use crate::state::ExpressionState;
use crate::types::NumericKind;
use crate::values::{TypedValue, Value};
use crate::vm::Stack;

/// Why compiled code stopped.
#[derive(Debug, Error)]
pub enum VmError {
    /// A value did not have the shape the code was compiled for. The
    /// expression must be interpreted instead.
    #[error("type shape fault: {0}")]
    TypeShape(String),
    /// A genuine evaluation error, identical to what interpretation raises.
    #[error(transparent)]
    Eval(#[from] EvalError),
}

fn fault(reason: impl Into<String>) -> VmError {
    VmError::TypeShape(reason.into())
}

pub struct Vm<'c> {
    code: &'c Code,
    ip: usize,
    stack: Stack<Value>,
}

impl<'c> Vm<'c> {
    pub fn new(code: &'c Code) -> Self {
        Vm {
            code,
            ip: 0,
            stack: Stack::new(code.max_stack_size),
        }
    }

    /// Run `code` once against `state`.
    pub fn execute(code: &Code, state: &mut ExpressionState<'_>) -> Result<TypedValue, VmError> {
        Vm::new(code).run(state)
    }

    pub fn run(&mut self, state: &mut ExpressionState<'_>) -> Result<TypedValue, VmError> {
        let mut wide_arg: usize = 0;
        loop {
            let Some(&instruction) = self.code.instructions.get(self.ip) else {
                return Err(fault("ran past the end of the code"));
            };
            let at = self.ip;
            self.ip += 1;

            if let Instruction::WideArg(high) = instruction {
                wide_arg = (wide_arg | high as usize) << 8;
                continue;
            }

            match self.step(instruction, wide_arg, state) {
                Ok(None) => {}
                Ok(Some(result)) => return Ok(result),
                Err(VmError::Eval(error)) => {
                    let error = match self.code.spans.get(at) {
                        Some(span) => error.at(span),
                        None => error,
                    };
                    return Err(VmError::Eval(error));
                }
                Err(shape) => {
                    trace!(ip = at, instruction = ?instruction, %shape, "Compiled code faulted");
                    return Err(shape);
                }
            }
            wide_arg = 0;
        }
    }

    fn step(
        &mut self,
        instruction: Instruction,
        wide_arg: usize,
        state: &mut ExpressionState<'_>,
    ) -> Result<Option<TypedValue>, VmError> {
        let arg = |operand: u8| wide_arg | operand as usize;

        use Instruction::*;
        match instruction {
            ConstLoad(index) => {
                let value = self
                    .code
                    .constants
                    .get(arg(index))
                    .ok_or_else(|| fault("constant index out of range"))?;
                self.stack.push(value.clone());
            }
            ConstInt(value) => self.stack.push(Value::Int(value as i32)),
            ConstBool(value) => self.stack.push(Value::Bool(value != 0)),
            ConstNull => self.stack.push(Value::Null),
            Pop => {
                self.pop()?;
            }

            LoadRoot => self.stack.push(state.active_context_object().value.clone()),
            LoadVariable(site) => match self.site(arg(site))? {
                CallSite::Variable { name } => {
                    let value = state.lookup_variable(name).into_value();
                    self.stack.push(value);
                }
                _ => return Err(fault("variable load through a non-variable site")),
            },

            IntBinOp(op) => {
                let op = binary_op(op)?;
                let (a, b) = self.pop_pair(|v| v.as_int())?;
                self.stack.push(Value::Int(eval_binary_int(op, a, b)?));
            }
            LongBinOp(op) => {
                let op = binary_op(op)?;
                let (a, b) = self.pop_pair(|v| v.as_long())?;
                self.stack.push(Value::Long(eval_binary_long(op, a, b)?));
            }
            FloatBinOp(op) => {
                let op = binary_op(op)?;
                let (a, b) = self.pop_pair(|v| v.as_float())?;
                self.stack.push(Value::Float(eval_binary_float(op, a, b)));
            }
            DoubleBinOp(op) => {
                let op = binary_op(op)?;
                let (a, b) = self.pop_pair(|v| v.as_double())?;
                self.stack.push(Value::Double(eval_binary_double(op, a, b)));
            }

            NegInt => {
                let a = self.pop_as(|v| v.as_int())?;
                self.stack.push(Value::Int(a.wrapping_neg()));
            }
            NegLong => {
                let a = self.pop_as(|v| v.as_long())?;
                self.stack.push(Value::Long(a.wrapping_neg()));
            }
            NegFloat => {
                let a = self.pop_as(|v| v.as_float())?;
                self.stack.push(Value::Float(-a));
            }
            NegDouble => {
                let a = self.pop_as(|v| v.as_double())?;
                self.stack.push(Value::Double(-a));
            }

            IntCmpOp(op) => {
                let (a, b) = self.pop_pair(|v| v.as_int())?;
                self.stack.push(Value::Bool(op.holds(a.cmp(&b))));
            }
            LongCmpOp(op) => {
                let (a, b) = self.pop_pair(|v| v.as_long())?;
                self.stack.push(Value::Bool(op.holds(a.cmp(&b))));
            }
            DoubleCmpOp(op) => {
                let (a, b) = self.pop_pair(|v| v.as_double())?;
                self.stack.push(Value::Bool(op.holds_partial(a.partial_cmp(&b))));
            }

            Not => {
                let a = self.pop_as(|v| v.as_bool())?;
                self.stack.push(Value::Bool(!a));
            }
            CmpOp(op) => {
                let b = self.pop()?;
                let a = self.pop()?;
                let result = match op {
                    ComparisonOp::Eq => values_equal(&a, &b, state),
                    ComparisonOp::Ne => !values_equal(&a, &b, state),
                    _ => relation_holds(op, &a, &b, state)?,
                };
                self.stack.push(Value::Bool(result));
            }
            StringConcat => {
                let b = self.pop()?;
                let a = self.pop()?;
                if !matches!(a, Value::Str(_)) && !matches!(b, Value::Str(_)) {
                    return Err(fault("concatenation without a string operand"));
                }
                let joined = crate::evaluator::operators::binary(BinaryOp::Add, &a, &b, state)?;
                self.stack.push(joined);
            }
            Widen(kind) => {
                let kind = NumericKind::from_u8(kind)
                    .ok_or_else(|| fault("unknown numeric kind"))?;
                let value = self.pop()?;
                let widened = value
                    .to_numeric(kind)
                    .ok_or_else(|| fault(format!("cannot widen {} to {:?}", value.type_name(), kind)))?;
                self.stack.push(widened);
            }

            JumpForward(offset) => self.ip += arg(offset),
            PopJumpIfFalse(offset) => {
                if !self.pop_as(|v| v.as_bool())? {
                    self.ip += arg(offset);
                }
            }
            PopJumpIfTrue(offset) => {
                if self.pop_as(|v| v.as_bool())? {
                    self.ip += arg(offset);
                }
            }
            JumpIfNull(offset) => {
                if self.peek()?.is_null() {
                    self.ip += arg(offset);
                }
            }
            ElvisJump(offset) => {
                let absent = match self.peek()? {
                    Value::Null => true,
                    Value::Str(s) => s.is_empty(),
                    _ => false,
                };
                if absent {
                    self.pop()?;
                } else {
                    self.ip += arg(offset);
                }
            }
            Return => return Ok(Some(TypedValue::new(self.pop()?))),

            GetProperty(site) => {
                let CallSite::Property {
                    name,
                    accessor,
                    target_type,
                } = self.site(arg(site))?
                else {
                    return Err(fault("property read through a non-property site"));
                };
                let target = self.pop()?;
                if target.is_null() {
                    return Err(self.site(arg(site))?.null_target_error().into());
                }
                let context = state.context();
                if target.type_descriptor() != *target_type {
                    return Err(fault(format!("property '{name}' read on {}", target.type_name())));
                }
                if !is_registered(context.property_accessors(), accessor) {
                    return Err(fault(format!("accessor for '{name}' no longer registered")));
                }
                let value = accessor
                    .read(context, &target, name)
                    .map_err(|error| fault(format!("accessor for '{name}' failed: {error}")))?;
                self.stack.push(value.into_value());
            }
            CallMethod(site) => {
                let CallSite::Method {
                    name,
                    resolver,
                    executor,
                    target_type,
                    arg_types,
                } = self.site(arg(site))?
                else {
                    return Err(fault("method call through a non-method site"));
                };
                let args = self
                    .stack
                    .pop_n(arg_types.len())
                    .ok_or_else(|| fault("operand stack underflow"))?;
                let target = self.pop()?;
                if target.is_null() {
                    return Err(EvalError::from(EvalErrorKind::MethodCallOnNull {
                        name: name.clone(),
                    })
                    .into());
                }
                let context = state.context();
                if method_target_type(&target) != *target_type
                    || !args.iter().map(Value::type_descriptor).eq(arg_types.iter().cloned())
                {
                    return Err(fault(format!("method '{name}' called with a new signature")));
                }
                if !is_registered(context.method_resolvers(), resolver) {
                    return Err(fault(format!("resolver for '{name}' no longer registered")));
                }
                let result = match executor.execute(context, &target, args) {
                    Err(CallError::Unavailable(reason)) => {
                        return Err(fault(format!("method '{name}' unavailable: {reason}")));
                    }
                    result => result.map_err(|e| e.into_eval_error(name))?,
                };
                self.stack.push(result.into_value());
            }
            NewObject(site) => {
                let CallSite::Constructor {
                    type_name,
                    resolver,
                    executor,
                    arg_types,
                } = self.site(arg(site))?
                else {
                    return Err(fault("construction through a non-constructor site"));
                };
                let args = self
                    .stack
                    .pop_n(arg_types.len())
                    .ok_or_else(|| fault("operand stack underflow"))?;
                let context = state.context();
                if !args.iter().map(Value::type_descriptor).eq(arg_types.iter().cloned()) {
                    return Err(fault(format!("constructor of {type_name} called with a new signature")));
                }
                if !is_registered(context.constructor_resolvers(), resolver) {
                    return Err(fault(format!("resolver for {type_name} no longer registered")));
                }
                let result = match executor.execute(context, args) {
                    Err(CallError::Unavailable(reason)) => {
                        return Err(fault(format!("constructor of {type_name} unavailable: {reason}")));
                    }
                    result => result.map_err(|e| e.into_eval_error(type_name))?,
                };
                self.stack.push(result.into_value());
            }
            IndexGet => {
                let index = self.pop()?;
                let target = self.pop()?;
                self.stack.push(index_get(target, index)?);
            }
            NullCheck(site) => {
                if self.peek()?.is_null() {
                    return Err(self.site(arg(site))?.null_target_error().into());
                }
            }

            CheckType(index) => {
                let Some(Value::Type(expected)) = self.code.constants.get(arg(index)) else {
                    return Err(fault("type guard without a type constant"));
                };
                let value = self.peek()?;
                if let Some(actual) = value.type_descriptor() {
                    if actual != *expected {
                        return Err(fault(format!("expected {expected}, found {actual}")));
                    }
                }
            }

            Nop => {}
            Halt => return Err(fault("halt")),
            WideArg(_) => return Err(fault("dangling wide argument")),
        }
        Ok(None)
    }

    fn site(&self, index: usize) -> Result<&'c CallSite, VmError> {
        self.code
            .sites
            .get(index)
            .ok_or_else(|| fault("call site index out of range"))
    }

    fn pop(&mut self) -> Result<Value, VmError> {
        self.stack.pop().ok_or_else(|| fault("operand stack underflow"))
    }

    fn peek(&self) -> Result<&Value, VmError> {
        self.stack.peek().ok_or_else(|| fault("operand stack underflow"))
    }

    fn pop_as<T>(&mut self, extract: impl Fn(&Value) -> Option<T>) -> Result<T, VmError> {
        let value = self.pop()?;
        extract(&value).ok_or_else(|| fault(format!("unexpected {}", value.type_name())))
    }

    fn pop_pair<T>(&mut self, extract: impl Fn(&Value) -> Option<T>) -> Result<(T, T), VmError> {
        let b = self.pop_as(&extract)?;
        let a = self.pop_as(&extract)?;
        Ok((a, b))
    }
}

fn binary_op(byte: u8) -> Result<BinaryOp, VmError> {
    BinaryOp::from_byte(byte).ok_or_else(|| fault(format!("unknown operator 0x{byte:02X}")))
}

/// `target[index]` for the target kinds compiled code handles.
fn index_get(target: Value, index: Value) -> Result<Value, VmError> {
    let position = || {
        index
            .is_integral()
            .then(|| index.to_i64())
            .flatten()
            .ok_or_else(|| fault(format!("index of type {}", index.type_name())))
    };
    let out_of_bounds = |index: i64, size: usize| -> VmError {
        EvalError::from(EvalErrorKind::IndexOutOfBounds { index, size }).into()
    };
    match &target {
        Value::Null => Err(EvalError::from(EvalErrorKind::CannotIndexIntoNull).into()),
        Value::List(list) => {
            let i = position()?;
            usize::try_from(i)
                .ok()
                .and_then(|p| list.get(p))
                .ok_or_else(|| out_of_bounds(i, list.len()))
        }
        Value::Map(map) => Ok(map.get(&index).unwrap_or_default()),
        Value::Str(s) => {
            let i = position()?;
            usize::try_from(i)
                .ok()
                .and_then(|p| s.chars().nth(p))
                .map(|c| Value::str(c.to_string()))
                .ok_or_else(|| out_of_bounds(i, s.chars().count()))
        }
        other => Err(fault(format!("indexing into {}", other.type_name()))),
    }
}
