//! `target[index]` on lists, maps, strings and objects.

use super::{EvalError, EvalErrorKind, ValueRef};
use crate::ast::{Indexer, NodeKind};
use crate::state::ExpressionState;
use crate::types::TypeDescriptor;
use crate::values::{ListRef, TypedValue, Value};

/// Resolve `target[index]` to a location.
///
/// The index is evaluated against the scope root, so `list[#this.size() - 1]`
/// sees the surrounding object rather than the list being indexed.
pub(crate) fn index_ref<'n>(
    indexer: &'n Indexer,
    state: &mut ExpressionState<'_>,
    target: &TypedValue,
) -> Result<ValueRef<'n>, EvalError> {
    if target.is_null() {
        if indexer.null_safe {
            return Ok(ValueRef::Null);
        }
        return Err(EvalErrorKind::CannotIndexIntoNull.into());
    }

    // A bare name indexing a map is the key itself: `map[key]` means 'key'.
    if let (Value::Map(map), NodeKind::Property(property)) = (&target.value, &indexer.index.kind) {
        return Ok(ValueRef::MapEntry {
            map: map.clone(),
            key: Value::Str(property.name.clone()),
        });
    }

    let scope_root = state.scope_root_object().clone();
    state.push_active_context_object(scope_root);
    let index = indexer.index.get_value(state);
    state.pop_active_context_object();
    let index = index?;

    match &target.value {
        Value::List(list) => {
            let position = integer_index(&index, state)?;
            list_ref(list, position, state)
        }
        Value::Map(map) => Ok(ValueRef::MapEntry {
            map: map.clone(),
            key: index,
        }),
        Value::Str(s) => {
            let position = integer_index(&index, state)?;
            let size = s.chars().count();
            usize::try_from(position)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| ValueRef::Holder {
                    value: TypedValue::new(Value::str(c.to_string())),
                    what: "string character",
                })
                .ok_or_else(|| EvalErrorKind::IndexOutOfBounds { index: position, size }.into())
        }
        Value::Object(_) => {
            let name = match state.convert_value(&index, &TypeDescriptor::String)? {
                Value::Str(name) => name,
                other => other.to_string().into(),
            };
            Ok(ValueRef::ObjectProperty {
                target: target.clone(),
                name,
            })
        }
        other => Err(EvalErrorKind::IndexingNotSupportedForType {
            type_name: other.type_name(),
        }
        .into()),
    }
}

fn integer_index(index: &Value, state: &ExpressionState<'_>) -> Result<i64, EvalError> {
    if let Some(i) = index.is_integral().then(|| index.to_i64()).flatten() {
        return Ok(i);
    }
    match state.convert_value(index, &TypeDescriptor::Int)? {
        Value::Int(i) => Ok(i.into()),
        _ => Err(EvalErrorKind::TypeConversionError {
            from: index.type_name(),
            to: TypeDescriptor::Int.name().into(),
        }
        .into()),
    }
}

/// A list element location, growing the list first when allowed.
fn list_ref<'n>(
    list: &ListRef,
    index: i64,
    state: &ExpressionState<'_>,
) -> Result<ValueRef<'n>, EvalError> {
    let Ok(position) = usize::try_from(index) else {
        return Err(EvalErrorKind::IndexOutOfBounds {
            index,
            size: list.len(),
        }
        .into());
    };
    if position >= list.len() && state.options().auto_grow_collections {
        if position >= state.options().max_auto_grow_size {
            return Err(EvalErrorKind::UnableToGrowCollection { index }.into());
        }
        list.grow_to(position + 1)?;
    }
    Ok(ValueRef::ListElement {
        list: list.clone(),
        index: position,
    })
}
