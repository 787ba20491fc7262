//! The embedder's object boundary.

use core::any::Any;
use core::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use ecow::EcoString;

use super::{TypedValue, Value};
use crate::evaluator::EvalError;
use crate::types::TypeDescriptor;

pub type ObjectRef = Arc<dyn HostObject>;

/// An object owned by the embedding application.
///
/// Only fields are exposed here; methods and constructors are reached through
/// the resolvers registered on the evaluation context.
pub trait HostObject: Send + Sync + fmt::Debug {
    fn type_descriptor(&self) -> TypeDescriptor;

    /// Read a field, `None` if the object has no such field.
    fn field(&self, name: &str) -> Option<TypedValue>;

    /// Write a field. Returns `Ok(false)` if the field does not exist or is
    /// read-only.
    fn set_field(&self, _name: &str, _value: Value) -> Result<bool, EvalError> {
        Ok(false)
    }

    fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    fn is_field_writable(&self, _name: &str) -> bool {
        false
    }

    /// Declared type of a field, used to instantiate missing intermediate
    /// values when auto-grow is enabled.
    fn field_type(&self, _name: &str) -> Option<TypeDescriptor> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// A general purpose host object with named, declared fields.
pub struct Record {
    ty: TypeDescriptor,
    fields: RwLock<Vec<RecordField>>,
}

struct RecordField {
    name: EcoString,
    declared: Option<TypeDescriptor>,
    value: Value,
    writable: bool,
}

impl Record {
    pub fn new(ty: TypeDescriptor) -> Self {
        Self {
            ty,
            fields: RwLock::new(Vec::new()),
        }
    }

    /// Add a writable field.
    pub fn with_field(self, name: impl Into<EcoString>, value: impl Into<Value>) -> Self {
        self.push_field(name.into(), None, value.into(), true)
    }

    /// Add a writable field with a declared type. The declared type is
    /// reported even while the field holds null.
    pub fn with_typed_field(
        self,
        name: impl Into<EcoString>,
        declared: TypeDescriptor,
        value: impl Into<Value>,
    ) -> Self {
        self.push_field(name.into(), Some(declared), value.into(), true)
    }

    pub fn with_read_only_field(self, name: impl Into<EcoString>, value: impl Into<Value>) -> Self {
        self.push_field(name.into(), None, value.into(), false)
    }

    fn push_field(
        self,
        name: EcoString,
        declared: Option<TypeDescriptor>,
        value: Value,
        writable: bool,
    ) -> Self {
        {
            let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
            fields.push(RecordField {
                name,
                declared,
                value,
                writable,
            });
        }
        self
    }

    pub fn into_ref(self) -> ObjectRef {
        Arc::new(self)
    }
}

impl HostObject for Record {
    fn type_descriptor(&self) -> TypeDescriptor {
        self.ty.clone()
    }

    fn field(&self, name: &str) -> Option<TypedValue> {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        let field = fields.iter().find(|f| f.name == name)?;
        Some(match (&field.value, &field.declared) {
            (Value::Null, Some(declared)) => TypedValue::null_of(declared.clone()),
            (value, _) => TypedValue::new(value.clone()),
        })
    }

    fn set_field(&self, name: &str, value: Value) -> Result<bool, EvalError> {
        let mut fields = self.fields.write().unwrap_or_else(PoisonError::into_inner);
        match fields.iter_mut().find(|f| f.name == name) {
            Some(field) if field.writable => {
                field.value = value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn is_field_writable(&self, name: &str) -> bool {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        fields.iter().any(|f| f.name == name && f.writable)
    }

    fn field_type(&self, name: &str) -> Option<TypeDescriptor> {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        let field = fields.iter().find(|f| f.name == name)?;
        field
            .declared
            .clone()
            .or_else(|| field.value.type_descriptor())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.fields.read().unwrap_or_else(PoisonError::into_inner);
        let mut s = f.debug_struct(self.ty.name());
        for field in fields.iter() {
            s.field(&field.name, &field.value);
        }
        s.finish()
    }
}

/// A map entry seen by selection and projection: exposes `key` and `value`.
#[derive(Debug)]
pub struct MapEntry {
    pub key: Value,
    pub value: Value,
}

impl MapEntry {
    pub fn new(key: Value, value: Value) -> ObjectRef {
        Arc::new(MapEntry { key, value })
    }
}

impl HostObject for MapEntry {
    fn type_descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::named("Map.Entry")
    }

    fn field(&self, name: &str) -> Option<TypedValue> {
        match name {
            "key" => Some(TypedValue::new(self.key.clone())),
            "value" => Some(TypedValue::new(self.value.clone())),
            _ => None,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
