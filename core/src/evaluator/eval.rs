//! Core evaluation logic.

use super::operators::{self, relation_holds, values_equal};
use super::{EvalError, EvalErrorKind, ValueRef, collections, indexer, references};
use crate::ast::{BoolOp, ComparisonOp, Node, NodeKind, StepOp, UnaryOp};
use crate::state::ExpressionState;
use crate::types::TypeDescriptor;
use crate::values::{ListRef, MapRef, TypedValue, Value};

impl Node {
    /// Evaluate this node to a typed value.
    pub fn get_typed_value(&self, state: &mut ExpressionState<'_>) -> Result<TypedValue, EvalError> {
        self.eval_step(state, false)
    }

    /// Evaluate this node, dropping the static type.
    pub fn get_value(&self, state: &mut ExpressionState<'_>) -> Result<Value, EvalError> {
        self.get_typed_value(state).map(TypedValue::into_value)
    }

    /// Write `value` to the location this node denotes.
    pub fn set_value(&self, state: &mut ExpressionState<'_>, value: Value) -> Result<(), EvalError> {
        let target = self.get_value_ref(state)?;
        target
            .set_value(state, value)
            .map_err(|e| e.at(&self.span))
    }

    /// Whether [`set_value`](Self::set_value) could succeed.
    ///
    /// Evaluates the path prefix to find out.
    pub fn is_writable(&self, state: &mut ExpressionState<'_>) -> bool {
        self.get_value_ref(state)
            .map(|target| target.is_writable(state))
            .unwrap_or(false)
    }

    /// Evaluate with the depth guard, recording the result type.
    ///
    /// `grows` is set for a chain step followed by another navigation step.
    pub(crate) fn eval_step(
        &self,
        state: &mut ExpressionState<'_>,
        grows: bool,
    ) -> Result<TypedValue, EvalError> {
        state.descend().map_err(|e| e.at(&self.span))?;
        let result = self.eval_inner(state, grows);
        state.ascend();

        let value = result.map_err(|e| e.at(&self.span))?;
        if let Some(ty) = value.value.type_descriptor() {
            self.exit_type.observe(&ty);
        }
        Ok(value)
    }

    fn eval_inner(
        &self,
        state: &mut ExpressionState<'_>,
        grows: bool,
    ) -> Result<TypedValue, EvalError> {
        match &self.kind {
            NodeKind::Literal(value) => Ok(value.clone()),

            NodeKind::Compound(children) => eval_compound(children, state),

            NodeKind::Property(property) => {
                let target = state.active_context_object().clone();
                references::read_property(property, state, &target, grows)
            }

            NodeKind::Method(method) => {
                let target = state.active_context_object().clone();
                references::invoke_method(method, state, &target)
            }

            NodeKind::Constructor(constructor) => {
                references::invoke_constructor(constructor, state)
            }

            NodeKind::Variable(name) => Ok(state.lookup_variable(name)),

            NodeKind::Function(function) => references::invoke_function(function, state),

            NodeKind::Indexer(index) => {
                let target = state.active_context_object().clone();
                indexer::index_ref(index, state, &target)?.get_value(state)
            }

            NodeKind::InlineList(list) => {
                if let Some(constant) = &list.constant {
                    return Ok(TypedValue::new(Value::List(constant.clone())));
                }
                let mut items = Vec::with_capacity(list.elements.len());
                for element in &list.elements {
                    items.push(element.get_value(state)?);
                }
                Ok(TypedValue::new(Value::List(ListRef::new(items))))
            }

            NodeKind::InlineMap(map) => {
                if let Some(constant) = &map.constant {
                    return Ok(TypedValue::new(Value::Map(constant.clone())));
                }
                let mut entries = Vec::with_capacity(map.entries.len());
                for (key, value) in &map.entries {
                    entries.push((key.get_value(state)?, value.get_value(state)?));
                }
                Ok(TypedValue::new(Value::Map(MapRef::new(entries))))
            }

            NodeKind::Selection(selection) => {
                let target = state.active_context_object().clone();
                collections::select(selection, state, &target)
            }

            NodeKind::Projection(projection) => {
                let target = state.active_context_object().clone();
                collections::project(projection, state, &target)
            }

            NodeKind::TypeReference(reference) => {
                let ty = match reference.cache.load() {
                    Some(ty) => (*ty).clone(),
                    None => {
                        let ty = state.find_type(&reference.name)?;
                        reference.cache.store(ty.clone());
                        ty
                    }
                };
                Ok(TypedValue::with_type(Value::Type(ty), TypeDescriptor::Type))
            }

            NodeKind::Binary { op, left, right } => {
                let l = left.get_value(state)?;
                let r = right.get_value(state)?;
                operators::binary(*op, &l, &r, state).map(TypedValue::new)
            }

            NodeKind::Comparison { op, left, right } => {
                let l = left.get_value(state)?;
                let r = right.get_value(state)?;
                let result = match op {
                    ComparisonOp::Eq => values_equal(&l, &r, state),
                    ComparisonOp::Ne => !values_equal(&l, &r, state),
                    _ => relation_holds(*op, &l, &r, state)?,
                };
                Ok(TypedValue::new(Value::Bool(result)))
            }

            NodeKind::Logical { op, left, right } => {
                let l = eval_bool(left, state)?;
                let result = match (op, l) {
                    (BoolOp::And, false) => false,
                    (BoolOp::Or, true) => true,
                    _ => eval_bool(right, state)?,
                };
                Ok(TypedValue::new(Value::Bool(result)))
            }

            NodeKind::Unary { op, operand } => {
                let value = match op {
                    UnaryOp::Not => Value::Bool(!eval_bool(operand, state)?),
                    UnaryOp::Neg => operators::negate(&operand.get_value(state)?, state)?,
                    UnaryOp::Plus => operators::unary_plus(&operand.get_value(state)?, state)?,
                };
                Ok(TypedValue::new(value))
            }

            NodeKind::Step {
                op,
                prefix,
                operand,
            } => eval_step_op(*op, *prefix, operand, state),

            NodeKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if eval_bool(condition, state)? {
                    then_branch.get_typed_value(state)
                } else {
                    else_branch.get_typed_value(state)
                }
            }

            NodeKind::Elvis { value, fallback } => {
                let v = value.get_typed_value(state)?;
                let absent = match &v.value {
                    Value::Null => true,
                    Value::Str(s) => s.is_empty(),
                    _ => false,
                };
                if absent {
                    fallback.get_typed_value(state)
                } else {
                    Ok(v)
                }
            }

            NodeKind::Assign { target, value } => {
                let location = target.get_value_ref(state)?;
                let new_value = value.get_typed_value(state)?;
                location
                    .set_value(state, new_value.value.clone())
                    .map_err(|e| e.at(&target.span))?;
                Ok(new_value)
            }

            NodeKind::Between { value, range } => {
                let v = value.get_value(state)?;
                let range = range.get_value(state)?;
                let bounds = match range.as_list().map(ListRef::snapshot) {
                    Some(bounds) if bounds.len() == 2 => bounds,
                    _ => return Err(EvalErrorKind::BetweenRightOperandMustBeTwoElementList.into()),
                };
                let within = relation_holds(ComparisonOp::Le, &bounds[0], &v, state)?
                    && relation_holds(ComparisonOp::Le, &v, &bounds[1], state)?;
                Ok(TypedValue::new(Value::Bool(within)))
            }

            NodeKind::InstanceOf { value, ty } => {
                let v = value.get_value(state)?;
                let ty = match ty.get_value(state)? {
                    Value::Type(ty) => ty,
                    other => {
                        return Err(EvalErrorKind::InstanceOfOperandMustBeType {
                            type_name: other.type_name(),
                        }
                        .into());
                    }
                };
                let result = v
                    .type_descriptor()
                    .is_some_and(|actual| actual.is_assignable_to(&ty));
                Ok(TypedValue::new(Value::Bool(result)))
            }
        }
    }

    /// A handle on the location this node denotes, for reads and writes that
    /// must not evaluate the path twice.
    pub fn get_value_ref<'n>(
        &'n self,
        state: &mut ExpressionState<'_>,
    ) -> Result<ValueRef<'n>, EvalError> {
        state.descend().map_err(|e| e.at(&self.span))?;
        let result = self.value_ref_inner(state);
        state.ascend();
        result.map_err(|e| e.at(&self.span))
    }

    fn value_ref_inner<'n>(
        &'n self,
        state: &mut ExpressionState<'_>,
    ) -> Result<ValueRef<'n>, EvalError> {
        match &self.kind {
            NodeKind::Compound(children) => compound_ref(children, state),

            NodeKind::Property(property) => {
                let target = state.active_context_object().clone();
                if target.is_null() && property.null_safe {
                    return Ok(ValueRef::Null);
                }
                Ok(ValueRef::Property { property, target })
            }

            NodeKind::Indexer(index) => {
                let target = state.active_context_object().clone();
                indexer::index_ref(index, state, &target)
            }

            NodeKind::Variable(name) => Ok(ValueRef::Variable { name: name.clone() }),

            NodeKind::Method(method) => {
                let target = state.active_context_object().clone();
                if target.is_null() {
                    if method.null_safe {
                        return Ok(ValueRef::Null);
                    }
                    return Err(EvalErrorKind::MethodCallOnNull {
                        name: method.name.clone(),
                    }
                    .into());
                }
                let args = references::evaluate_arguments(&method.args, state)?;
                Ok(ValueRef::Method {
                    method,
                    target,
                    args,
                })
            }

            _ => Ok(ValueRef::Holder {
                value: self.eval_inner(state, false)?,
                what: self.kind.name(),
            }),
        }
    }
}

fn eval_bool(node: &Node, state: &mut ExpressionState<'_>) -> Result<bool, EvalError> {
    let value = node.get_value(state)?;
    state.convert_to_bool(&value).map_err(|e| e.at(&node.span))
}

/// Walk the prefix of a chain, pushing each result as the active context
/// object. `Ok(None)` means a null-safe step met null.
fn walk_prefix(
    children: &[Node],
    state: &mut ExpressionState<'_>,
    pushed: &mut usize,
) -> Result<Option<()>, EvalError> {
    let Some((_, prefix)) = children.split_last() else {
        return Ok(Some(()));
    };
    for (index, child) in prefix.iter().enumerate() {
        if child.is_null_safe() && state.active_context_object().is_null() {
            return Ok(None);
        }
        let grows = children[index + 1].is_navigation();
        let value = child
            .eval_step(state, grows)
            .map_err(|e| e.restamp(&child.span))?;
        state.push_active_context_object(value);
        *pushed += 1;
    }
    Ok(Some(()))
}

fn eval_compound(
    children: &[Node],
    state: &mut ExpressionState<'_>,
) -> Result<TypedValue, EvalError> {
    let Some(last) = children.last() else {
        return Ok(TypedValue::NULL);
    };
    let mut pushed = 0;
    let result = walk_prefix(children, state, &mut pushed).and_then(|walked| {
        if walked.is_none() || (last.is_null_safe() && state.active_context_object().is_null()) {
            return Ok(TypedValue::NULL);
        }
        last.eval_step(state, false)
            .map_err(|e| e.restamp(&last.span))
    });
    for _ in 0..pushed {
        state.pop_active_context_object();
    }
    result
}

fn compound_ref<'n>(
    children: &'n [Node],
    state: &mut ExpressionState<'_>,
) -> Result<ValueRef<'n>, EvalError> {
    let Some(last) = children.last() else {
        return Ok(ValueRef::Null);
    };
    let mut pushed = 0;
    let result = walk_prefix(children, state, &mut pushed).and_then(|walked| {
        if walked.is_none() || (last.is_null_safe() && state.active_context_object().is_null()) {
            return Ok(ValueRef::Null);
        }
        last.get_value_ref(state)
            .map_err(|e| e.restamp(&last.span))
    });
    for _ in 0..pushed {
        state.pop_active_context_object();
    }
    result
}

fn eval_step_op(
    op: StepOp,
    prefix: bool,
    operand: &Node,
    state: &mut ExpressionState<'_>,
) -> Result<TypedValue, EvalError> {
    let location = operand.get_value_ref(state)?;
    let old = location.get_value(state)?;
    let new = operators::step(op, &old.value, state).map_err(|e| e.at(&operand.span))?;
    location
        .set_value(state, new.clone())
        .map_err(|e| match e.kind {
            EvalErrorKind::NotAssignable { .. } => {
                let operand_name = operand.kind.name().into();
                EvalError::from(match op {
                    StepOp::Increment => EvalErrorKind::OperandNotIncrementable {
                        operand: operand_name,
                    },
                    StepOp::Decrement => EvalErrorKind::OperandNotDecrementable {
                        operand: operand_name,
                    },
                })
                .at(&operand.span)
            }
            _ => e,
        })?;
    Ok(if prefix { TypedValue::new(new) } else { old })
}
