use ecow::EcoString;

use super::{EvalError, EvalErrorKind, references};
use crate::ast::{MethodReference, PropertyReference};
use crate::state::ExpressionState;
use crate::values::{ListRef, MapRef, TypedValue, Value};

/// A resolved location: the target of an assignment or increment.
///
/// The path leading to the location is evaluated once, when the reference is
/// created. Reading and writing afterwards only touch the final step.
#[derive(Debug)]
pub enum ValueRef<'n> {
    /// A null-safe step met null. Reads give null.
    Null,
    /// A computed value with no location behind it.
    Holder { value: TypedValue, what: &'static str },
    Property {
        property: &'n PropertyReference,
        target: TypedValue,
    },
    ListElement { list: ListRef, index: usize },
    MapEntry { map: MapRef, key: Value },
    /// `object['name']`, resolved through the property accessors.
    ObjectProperty { target: TypedValue, name: EcoString },
    Variable { name: EcoString },
    /// A method call with its arguments already evaluated.
    Method {
        method: &'n MethodReference,
        target: TypedValue,
        args: Vec<Value>,
    },
}

impl ValueRef<'_> {
    pub fn get_value(&self, state: &mut ExpressionState<'_>) -> Result<TypedValue, EvalError> {
        match self {
            ValueRef::Null => Ok(TypedValue::NULL),
            ValueRef::Holder { value, .. } => Ok(value.clone()),
            ValueRef::Property { property, target } => {
                references::read_property(property, state, target, false)
            }
            ValueRef::ListElement { list, index } => {
                list.get(*index).map(TypedValue::new).ok_or_else(|| {
                    EvalErrorKind::IndexOutOfBounds {
                        index: *index as i64,
                        size: list.len(),
                    }
                    .into()
                })
            }
            ValueRef::MapEntry { map, key } => {
                Ok(map.get(key).map(TypedValue::new).unwrap_or_default())
            }
            ValueRef::ObjectProperty { target, name } => {
                references::read_uncached(state.context(), &target.value, name)
            }
            ValueRef::Variable { name } => Ok(state.lookup_variable(name)),
            ValueRef::Method {
                method,
                target,
                args,
            } => references::call_method(method, state.context(), &target.value, args.clone()),
        }
    }

    pub fn set_value(&self, state: &mut ExpressionState<'_>, value: Value) -> Result<(), EvalError> {
        match self {
            ValueRef::Null => Err(not_assignable("null")),
            ValueRef::Holder { what, .. } => Err(not_assignable(what)),
            ValueRef::Property { property, target } => {
                references::write_property(property, state, target, value)
            }
            ValueRef::ListElement { list, index } => {
                if *index >= list.len() {
                    return Err(EvalErrorKind::IndexOutOfBounds {
                        index: *index as i64,
                        size: list.len(),
                    }
                    .into());
                }
                list.set(*index, value).map(drop)
            }
            ValueRef::MapEntry { map, key } => map.insert(key.clone(), value).map(drop),
            ValueRef::ObjectProperty { target, name } => {
                references::write_uncached(state.context(), &target.value, name, value)
            }
            ValueRef::Variable { name } => match name.as_str() {
                "this" | "root" => Err(not_assignable(&format!("#{name}"))),
                _ => {
                    state.set_variable(name, TypedValue::new(value));
                    Ok(())
                }
            },
            ValueRef::Method { .. } => Err(not_assignable("method call")),
        }
    }

    pub fn is_writable(&self, state: &ExpressionState<'_>) -> bool {
        match self {
            ValueRef::Null | ValueRef::Holder { .. } | ValueRef::Method { .. } => false,
            ValueRef::Property { property, target } => {
                references::can_write(state.context(), &target.value, &property.name)
            }
            ValueRef::ObjectProperty { target, name } => {
                references::can_write(state.context(), &target.value, name)
            }
            ValueRef::ListElement { list, .. } => !list.is_frozen(),
            ValueRef::MapEntry { map, .. } => !map.is_frozen(),
            ValueRef::Variable { name } => !matches!(name.as_str(), "this" | "root"),
        }
    }
}

fn not_assignable(what: &str) -> EvalError {
    EvalErrorKind::NotAssignable { what: what.into() }.into()
}
