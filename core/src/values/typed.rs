use core::fmt;

use super::Value;
use crate::types::TypeDescriptor;

/// A runtime value paired with its type descriptor.
///
/// When present, the descriptor is consistent with the value's dynamic type
/// (or, for null, the declared type of the slot it came from).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TypedValue {
    pub value: Value,
    pub ty: Option<TypeDescriptor>,
}

impl TypedValue {
    /// Null of unknown type.
    pub const NULL: TypedValue = TypedValue {
        value: Value::Null,
        ty: None,
    };

    /// Wrap a value, deriving the descriptor from its dynamic type.
    pub fn new(value: Value) -> Self {
        let ty = value.type_descriptor();
        Self { value, ty }
    }

    pub fn with_type(value: Value, ty: TypeDescriptor) -> Self {
        Self {
            value,
            ty: Some(ty),
        }
    }

    /// Null with a known declared type.
    pub fn null_of(ty: TypeDescriptor) -> Self {
        Self {
            value: Value::Null,
            ty: Some(ty),
        }
    }

    pub fn is_null(&self) -> bool {
        self.value.is_null()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl From<Value> for TypedValue {
    fn from(value: Value) -> Self {
        TypedValue::new(value)
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}
