use bigdecimal::BigDecimal;
use num_bigint::BigInt;

use crate::evaluator::{EvalError, EvalErrorKind};
use crate::types::{NumericKind, TypeDescriptor};
use crate::values::Value;

/// Converts values between types. `from` is `None` for null.
pub trait TypeConverter: Send + Sync {
    fn can_convert(&self, from: Option<&TypeDescriptor>, to: &TypeDescriptor) -> bool;

    fn convert_value(
        &self,
        value: &Value,
        from: Option<&TypeDescriptor>,
        to: &TypeDescriptor,
    ) -> Result<Value, EvalError>;
}

/// Conversions between the built-in types.
///
/// - null converts to anything (and stays null);
/// - numbers convert to any other numeric type;
/// - everything converts to `String` via its textual form;
/// - strings parse into numbers, booleans, and single characters.
#[derive(Debug, Default)]
pub struct StandardTypeConverter;

impl TypeConverter for StandardTypeConverter {
    fn can_convert(&self, from: Option<&TypeDescriptor>, to: &TypeDescriptor) -> bool {
        let Some(from) = from else {
            return true;
        };
        if from.is_assignable_to(to) || *to == TypeDescriptor::String {
            return true;
        }
        if from.is_numeric() && to.is_numeric() {
            return true;
        }
        *from == TypeDescriptor::String
            && (to.is_numeric() || matches!(to, TypeDescriptor::Boolean | TypeDescriptor::Char))
    }

    fn convert_value(
        &self,
        value: &Value,
        from: Option<&TypeDescriptor>,
        to: &TypeDescriptor,
    ) -> Result<Value, EvalError> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        let conversion_error = || -> EvalError {
            EvalErrorKind::TypeConversionError {
                from: from.map_or_else(|| value.type_name(), |ty| ty.name().into()),
                to: to.name().into(),
            }
            .into()
        };
        if value
            .type_descriptor()
            .is_some_and(|ty| ty.is_assignable_to(to))
        {
            return Ok(value.clone());
        }
        if *to == TypeDescriptor::String {
            return Ok(Value::Str(value.to_string().into()));
        }
        if let Some(kind) = to.numeric_kind() {
            if let Some(number) = value.to_numeric(kind) {
                return Ok(number);
            }
            if let Value::Str(s) = value {
                return parse_number(s.trim(), kind).ok_or_else(conversion_error);
            }
            return Err(conversion_error());
        }
        match (value, to) {
            (Value::Str(s), TypeDescriptor::Boolean) => match s.trim().to_ascii_lowercase().as_str()
            {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" | "" => Ok(Value::Bool(false)),
                _ => Err(conversion_error()),
            },
            (Value::Str(s), TypeDescriptor::Char) => {
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(Value::Char(c)),
                    _ => Err(conversion_error()),
                }
            }
            _ => Err(conversion_error()),
        }
    }
}

fn parse_number(text: &str, kind: NumericKind) -> Option<Value> {
    Some(match kind {
        NumericKind::Byte => Value::Byte(text.parse().ok()?),
        NumericKind::Short => Value::Short(text.parse().ok()?),
        NumericKind::Int => Value::Int(text.parse().ok()?),
        NumericKind::Long => Value::Long(text.parse().ok()?),
        NumericKind::BigInteger => Value::BigInteger(text.parse::<BigInt>().ok()?),
        NumericKind::Float => Value::Float(text.parse().ok()?),
        NumericKind::Double => Value::Double(text.parse().ok()?),
        NumericKind::BigDecimal => Value::Decimal(text.parse::<BigDecimal>().ok()?),
    })
}
