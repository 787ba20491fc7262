//! Selection (`?[]`, `^[]`, `$[]`) and projection (`![]`).

use super::{EvalError, EvalErrorKind};
use crate::ast::{Node, Projection, Selection, SelectionKind};
use crate::state::ExpressionState;
use crate::values::{MapEntry, ListRef, MapRef, TypedValue, Value};

/// Evaluate `node` with `element` as `#this`, in a fresh variable scope.
fn with_element(
    node: &Node,
    state: &mut ExpressionState<'_>,
    element: Value,
) -> Result<TypedValue, EvalError> {
    state.push_active_context_object(TypedValue::new(element));
    state.enter_scope();
    let result = node.get_typed_value(state);
    state.exit_scope();
    state.pop_active_context_object();
    result
}

fn matches(
    predicate: &Node,
    state: &mut ExpressionState<'_>,
    element: Value,
) -> Result<bool, EvalError> {
    match with_element(predicate, state, element)?.value {
        Value::Bool(b) => Ok(b),
        _ => Err(EvalErrorKind::ResultOfSelectionCriteriaIsNotBoolean.into()),
    }
}

pub(crate) fn select(
    selection: &Selection,
    state: &mut ExpressionState<'_>,
    target: &TypedValue,
) -> Result<TypedValue, EvalError> {
    match &target.value {
        Value::Null if selection.null_safe => Ok(TypedValue::NULL),
        Value::List(list) => {
            let mut selected = Vec::new();
            for item in list.snapshot() {
                if matches(&selection.predicate, state, item.clone())? {
                    if selection.kind == SelectionKind::First {
                        return Ok(TypedValue::new(item));
                    }
                    selected.push(item);
                }
            }
            Ok(TypedValue::new(match selection.kind {
                SelectionKind::All => Value::List(ListRef::new(selected)),
                _ => selected.pop().unwrap_or_default(),
            }))
        }
        Value::Map(map) => {
            let mut selected = Vec::new();
            for (key, value) in map.entries() {
                let entry = Value::Object(MapEntry::new(key.clone(), value.clone()));
                if matches(&selection.predicate, state, entry)? {
                    selected.push((key, value));
                    if selection.kind == SelectionKind::First {
                        break;
                    }
                }
            }
            let selected = match selection.kind {
                SelectionKind::All => selected,
                _ if selected.is_empty() => return Ok(TypedValue::NULL),
                SelectionKind::First => selected.into_iter().take(1).collect(),
                SelectionKind::Last => selected.into_iter().last().into_iter().collect(),
            };
            Ok(TypedValue::new(Value::Map(MapRef::new(selected))))
        }
        other => Err(EvalErrorKind::InvalidTypeForSelection {
            type_name: other.type_name(),
        }
        .into()),
    }
}

pub(crate) fn project(
    projection: &Projection,
    state: &mut ExpressionState<'_>,
    target: &TypedValue,
) -> Result<TypedValue, EvalError> {
    let elements = match &target.value {
        Value::Null if projection.null_safe => return Ok(TypedValue::NULL),
        Value::List(list) => list.snapshot(),
        Value::Map(map) => map
            .entries()
            .into_iter()
            .map(|(key, value)| Value::Object(MapEntry::new(key, value)))
            .collect(),
        other => {
            return Err(EvalErrorKind::ProjectionNotSupportedOnType {
                type_name: other.type_name(),
            }
            .into());
        }
    };
    let mut projected = Vec::with_capacity(elements.len());
    for element in elements {
        projected.push(with_element(&projection.expression, state, element)?.value);
    }
    Ok(TypedValue::new(Value::List(ListRef::new(projected))))
}
