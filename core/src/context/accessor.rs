use core::fmt;
use std::sync::Arc;

use super::EvaluationContext;
use crate::evaluator::{EvalError, EvalErrorKind};
use crate::types::TypeDescriptor;
use crate::values::{TypedValue, Value};

/// Strategy for reading and writing named properties of a target value.
pub trait PropertyAccessor: Send + Sync + fmt::Debug {
    /// Types this accessor is specific to; `None` means any type.
    fn specific_target_types(&self) -> Option<Vec<TypeDescriptor>>;

    fn can_read(&self, context: &dyn EvaluationContext, target: &Value, name: &str) -> bool;

    fn read(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Result<TypedValue, EvalError>;

    fn can_write(&self, _context: &dyn EvaluationContext, _target: &Value, _name: &str) -> bool {
        false
    }

    fn write(
        &self,
        _context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        _value: Value,
    ) -> Result<(), EvalError> {
        Err(EvalErrorKind::PropertyOrFieldNotWritable {
            name: name.into(),
            type_name: target.type_name(),
        }
        .into())
    }

    /// Declared type of the property, used by auto-grow.
    fn property_type(
        &self,
        _context: &dyn EvaluationContext,
        _target: &Value,
        _name: &str,
    ) -> Option<TypeDescriptor> {
        None
    }

    /// Whether compiled code may call this accessor directly.
    fn is_compilable(&self) -> bool {
        false
    }
}

/// Order the registered accessors for a target of type `ty`.
///
/// Accessors naming `ty` itself come first, then accessors naming one of its
/// supertypes, then generic accessors; registration order within each tier.
/// Accessors specific to unrelated types are dropped.
pub fn accessors_for(
    accessors: &[Arc<dyn PropertyAccessor>],
    ty: Option<&TypeDescriptor>,
) -> Vec<Arc<dyn PropertyAccessor>> {
    let mut exact = Vec::new();
    let mut inherited = Vec::new();
    let mut generic = Vec::new();
    for accessor in accessors {
        match (accessor.specific_target_types(), ty) {
            (None, _) => generic.push(accessor.clone()),
            (Some(targets), Some(ty)) => {
                if targets.iter().any(|t| t.name() == ty.name()) {
                    exact.push(accessor.clone());
                } else if targets.iter().any(|t| ty.is_assignable_to(t)) {
                    inherited.push(accessor.clone());
                }
            }
            (Some(_), None) => {}
        }
    }
    exact.extend(inherited);
    exact.extend(generic);
    exact
}

/// Reads and writes map entries by string key: `map.key`.
#[derive(Debug, Default)]
pub struct MapAccessor;

impl PropertyAccessor for MapAccessor {
    fn specific_target_types(&self) -> Option<Vec<TypeDescriptor>> {
        Some(vec![TypeDescriptor::Map])
    }

    fn can_read(&self, _context: &dyn EvaluationContext, target: &Value, name: &str) -> bool {
        target
            .as_map()
            .is_some_and(|map| map.contains_key(&Value::str(name)))
    }

    fn read(
        &self,
        _context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Result<TypedValue, EvalError> {
        let map = target.as_map().ok_or_else(|| not_readable(target, name))?;
        map.get(&Value::str(name))
            .map(TypedValue::new)
            .ok_or_else(|| not_readable(target, name))
    }

    fn can_write(&self, _context: &dyn EvaluationContext, target: &Value, _name: &str) -> bool {
        target.as_map().is_some_and(|map| !map.is_frozen())
    }

    fn write(
        &self,
        _context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        value: Value,
    ) -> Result<(), EvalError> {
        let map = target.as_map().ok_or_else(|| not_writable(target, name))?;
        map.insert(Value::str(name), value)?;
        Ok(())
    }

    fn is_compilable(&self) -> bool {
        true
    }
}

/// Reads and writes the fields of host objects.
#[derive(Debug, Default)]
pub struct ObjectFieldAccessor;

impl PropertyAccessor for ObjectFieldAccessor {
    fn specific_target_types(&self) -> Option<Vec<TypeDescriptor>> {
        None
    }

    fn can_read(&self, _context: &dyn EvaluationContext, target: &Value, name: &str) -> bool {
        target.as_object().is_some_and(|object| object.has_field(name))
    }

    fn read(
        &self,
        _context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Result<TypedValue, EvalError> {
        target
            .as_object()
            .and_then(|object| object.field(name))
            .ok_or_else(|| not_readable(target, name))
    }

    fn can_write(&self, _context: &dyn EvaluationContext, target: &Value, name: &str) -> bool {
        target
            .as_object()
            .is_some_and(|object| object.is_field_writable(name))
    }

    fn write(
        &self,
        _context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        value: Value,
    ) -> Result<(), EvalError> {
        let object = target.as_object().ok_or_else(|| not_writable(target, name))?;
        if object.set_field(name, value)? {
            Ok(())
        } else {
            Err(not_writable(target, name))
        }
    }

    fn property_type(
        &self,
        _context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
    ) -> Option<TypeDescriptor> {
        target.as_object()?.field_type(name)
    }

    fn is_compilable(&self) -> bool {
        true
    }
}

fn not_readable(target: &Value, name: &str) -> EvalError {
    EvalErrorKind::PropertyOrFieldNotReadable {
        name: name.into(),
        type_name: target.type_name(),
    }
    .into()
}

fn not_writable(target: &Value, name: &str) -> EvalError {
    EvalErrorKind::PropertyOrFieldNotWritable {
        name: name.into(),
        type_name: target.type_name(),
    }
    .into()
}
