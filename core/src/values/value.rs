use core::fmt;

use bigdecimal::BigDecimal;
use ecow::EcoString;
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive};

use super::{ListRef, MapRef, ObjectRef};
use crate::types::{NumericKind, TypeDescriptor};

/// A dynamically typed runtime value.
///
/// Scalars are held inline; lists, maps and host objects are shared handles,
/// so cloning a `Value` never copies a collection.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Char(char),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    BigInteger(BigInt),
    Float(f32),
    Double(f64),
    Decimal(BigDecimal),
    Str(EcoString),
    List(ListRef),
    Map(MapRef),
    Type(TypeDescriptor),
    Object(ObjectRef),
}

impl Value {
    pub fn str(s: impl Into<EcoString>) -> Value {
        Value::Str(s.into())
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(ListRef::new(items))
    }

    pub fn map(entries: Vec<(Value, Value)>) -> Value {
        Value::Map(MapRef::new(entries))
    }

    /// The dynamic type of this value, `None` for null.
    pub fn type_descriptor(&self) -> Option<TypeDescriptor> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => TypeDescriptor::Boolean,
            Value::Char(_) => TypeDescriptor::Char,
            Value::Byte(_) => TypeDescriptor::Byte,
            Value::Short(_) => TypeDescriptor::Short,
            Value::Int(_) => TypeDescriptor::Int,
            Value::Long(_) => TypeDescriptor::Long,
            Value::BigInteger(_) => TypeDescriptor::BigInteger,
            Value::Float(_) => TypeDescriptor::Float,
            Value::Double(_) => TypeDescriptor::Double,
            Value::Decimal(_) => TypeDescriptor::BigDecimal,
            Value::Str(_) => TypeDescriptor::String,
            Value::List(_) => TypeDescriptor::List,
            Value::Map(_) => TypeDescriptor::Map,
            Value::Type(_) => TypeDescriptor::Type,
            Value::Object(object) => object.type_descriptor(),
        })
    }

    /// Name of the dynamic type, `"null"` for null. Used in error messages.
    pub fn type_name(&self) -> EcoString {
        match self.type_descriptor() {
            Some(ty) => ty.name().into(),
            None => "null".into(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The `Int` payload. No conversion: other kinds give `None`.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListRef> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapRef> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&TypeDescriptor> {
        match self {
            Value::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn numeric_kind(&self) -> Option<NumericKind> {
        Some(match self {
            Value::Byte(_) => NumericKind::Byte,
            Value::Short(_) => NumericKind::Short,
            Value::Int(_) => NumericKind::Int,
            Value::Long(_) => NumericKind::Long,
            Value::BigInteger(_) => NumericKind::BigInteger,
            Value::Float(_) => NumericKind::Float,
            Value::Double(_) => NumericKind::Double,
            Value::Decimal(_) => NumericKind::BigDecimal,
            _ => return None,
        })
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_kind().is_some()
    }

    /// True for numbers without a fractional part.
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            Value::Byte(_) | Value::Short(_) | Value::Int(_) | Value::Long(_) | Value::BigInteger(_)
        )
    }

    // ========================================================================
    // Numeric coercions
    // ========================================================================
    //
    // Integral narrowing wraps, matching two's complement casts. Fractional
    // values truncate toward zero. Conversions that cannot produce a number at
    // all (non-numeric values, NaN into BigDecimal) return `None`.

    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(*v as i64),
            Value::Short(v) => Some(*v as i64),
            Value::Int(v) => Some(*v as i64),
            Value::Long(v) => Some(*v),
            Value::BigInteger(v) => Some(wrap_big_int(v)),
            Value::Float(v) => Some(*v as i64),
            Value::Double(v) => Some(*v as i64),
            Value::Decimal(v) => Some(wrap_big_int(&v.with_scale(0).as_bigint_and_exponent().0)),
            _ => None,
        }
    }

    pub fn to_i32(&self) -> Option<i32> {
        match self {
            Value::Float(v) => Some(*v as i32),
            Value::Double(v) => Some(*v as i32),
            _ => self.to_i64().map(|v| v as i32),
        }
    }

    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Byte(v) => Some(*v as f64),
            Value::Short(v) => Some(*v as f64),
            Value::Int(v) => Some(*v as f64),
            Value::Long(v) => Some(*v as f64),
            Value::BigInteger(v) => v.to_f64(),
            Value::Float(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            Value::Decimal(v) => v.to_f64(),
            _ => None,
        }
    }

    pub fn to_f32(&self) -> Option<f32> {
        self.to_f64().map(|v| v as f32)
    }

    pub fn to_big_int(&self) -> Option<BigInt> {
        match self {
            Value::BigInteger(v) => Some(v.clone()),
            Value::Float(_) | Value::Double(_) => self.to_f64().and_then(|v| BigInt::from_f64(v.trunc())),
            Value::Decimal(v) => Some(v.with_scale(0).as_bigint_and_exponent().0),
            _ => self.to_i64().map(BigInt::from),
        }
    }

    pub fn to_big_decimal(&self) -> Option<BigDecimal> {
        match self {
            Value::Decimal(v) => Some(v.clone()),
            Value::BigInteger(v) => Some(BigDecimal::from(v.clone())),
            Value::Float(v) => BigDecimal::from_f32(*v),
            Value::Double(v) => BigDecimal::from_f64(*v),
            _ => self.to_i64().map(BigDecimal::from),
        }
    }

    /// Convert a numeric value to `kind`; `None` if this value is not numeric.
    pub fn to_numeric(&self, kind: NumericKind) -> Option<Value> {
        if !self.is_numeric() {
            return None;
        }
        if self.numeric_kind() == Some(kind) {
            return Some(self.clone());
        }
        Some(match kind {
            NumericKind::Byte => Value::Byte(self.to_i64()? as i8),
            NumericKind::Short => Value::Short(self.to_i64()? as i16),
            NumericKind::Int => Value::Int(self.to_i32()?),
            NumericKind::Long => Value::Long(self.to_i64()?),
            NumericKind::BigInteger => Value::BigInteger(self.to_big_int()?),
            NumericKind::Float => Value::Float(self.to_f32()?),
            NumericKind::Double => Value::Double(self.to_f64()?),
            NumericKind::BigDecimal => Value::Decimal(self.to_big_decimal()?),
        })
    }

    /// Identity comparison: the same shared collection or host object.
    ///
    /// Scalars have no identity and compare structurally.
    pub fn same_instance(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => a.ptr_eq(b),
            (Value::Map(a), Value::Map(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => same_object(a, b),
            _ => self == other,
        }
    }
}

fn wrap_big_int(value: &BigInt) -> i64 {
    // Low 64 bits, two's complement.
    let (sign, digits) = value.to_u64_digits();
    let low = digits.first().copied().unwrap_or(0);
    match sign {
        num_bigint::Sign::Minus => (low as i64).wrapping_neg(),
        _ => low as i64,
    }
}

fn same_object(a: &ObjectRef, b: &ObjectRef) -> bool {
    core::ptr::addr_eq(std::sync::Arc::as_ptr(a), std::sync::Arc::as_ptr(b))
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::BigInteger(a), Value::BigInteger(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => same_object(a, b),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<EcoString> for Value {
    fn from(value: EcoString) -> Self {
        Value::Str(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Value::Object(value)
    }
}

/// Format a float the way the default textual form expects: always with a
/// fractional part, and `NaN`/`Infinity` spelled out.
fn format_float(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        write!(f, "NaN")
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            write!(f, "Infinity")
        } else {
            write!(f, "-Infinity")
        }
    } else {
        let s = value.to_string();
        if s.contains('.') || s.contains('e') || s.contains('E') {
            write!(f, "{}", s)
        } else {
            write!(f, "{}.0", s)
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Char(c) => write!(f, "{}", c),
            Value::Byte(v) => write!(f, "{}", v),
            Value::Short(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Long(v) => write!(f, "{}", v),
            Value::BigInteger(v) => write!(f, "{}", v),
            Value::Float(v) => format_float(f, *v as f64),
            Value::Double(v) => format_float(f, *v),
            Value::Decimal(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "{}", s),
            Value::List(list) => list.with_items(|items| {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }),
            Value::Map(map) => map.with_entries(|entries| {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}={}", key, value)?;
                }
                write!(f, "}}")
            }),
            Value::Type(ty) => write!(f, "class {}", ty),
            Value::Object(object) => write!(f, "{:?}", object),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{:?}", s.as_str()),
            Value::Char(c) => write!(f, "{:?}", c),
            Value::Byte(v) => write!(f, "{}b", v),
            Value::Short(v) => write!(f, "{}s", v),
            Value::Long(v) => write!(f, "{}L", v),
            Value::Float(v) => write!(f, "{:?}f", v),
            Value::BigInteger(v) => write!(f, "{}BI", v),
            Value::Decimal(v) => write!(f, "{}BD", v),
            Value::List(list) => f.debug_list().entries(list.snapshot()).finish(),
            Value::Map(map) => f.debug_map().entries(map.entries()).finish(),
            Value::Object(object) => write!(f, "{:?}", object),
            _ => write!(f, "{}", self),
        }
    }
}
