use core::cmp::Ordering;

use crate::evaluator::{EvalError, EvalErrorKind};
use crate::values::Value;

/// Orders values for the relational operators.
pub trait TypeComparator: Send + Sync {
    fn can_compare(&self, left: &Value, right: &Value) -> bool;

    fn compare(&self, left: &Value, right: &Value) -> Result<Ordering, EvalError>;
}

/// Null sorts before everything; numbers compare after promotion; strings,
/// booleans and characters compare natively.
#[derive(Debug, Default)]
pub struct StandardTypeComparator;

impl TypeComparator for StandardTypeComparator {
    fn can_compare(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Null, _) | (_, Value::Null) => true,
            (Value::Str(_), Value::Str(_))
            | (Value::Bool(_), Value::Bool(_))
            | (Value::Char(_), Value::Char(_)) => true,
            _ => left.is_numeric() && right.is_numeric(),
        }
    }

    fn compare(&self, left: &Value, right: &Value) -> Result<Ordering, EvalError> {
        match (left, right) {
            (Value::Null, Value::Null) => Ok(Ordering::Equal),
            (Value::Null, _) => Ok(Ordering::Less),
            (_, Value::Null) => Ok(Ordering::Greater),
            (Value::Str(a), Value::Str(b)) => Ok(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::Char(a), Value::Char(b)) => Ok(a.cmp(b)),
            _ => compare_numbers(left, right).ok_or_else(|| {
                EvalErrorKind::NotComparable {
                    left: left.type_name(),
                    right: right.type_name(),
                }
                .into()
            }),
        }
    }
}

/// Compare two numbers at their promoted kind. `None` when either is not a
/// number, or when a NaN makes them unordered.
pub(crate) fn compare_numbers(left: &Value, right: &Value) -> Option<Ordering> {
    use crate::types::NumericKind;

    let kind = left.numeric_kind()?.promote(right.numeric_kind()?);
    match kind {
        NumericKind::Byte | NumericKind::Short | NumericKind::Int | NumericKind::Long => {
            Some(left.to_i64()?.cmp(&right.to_i64()?))
        }
        NumericKind::BigInteger => Some(left.to_big_int()?.cmp(&right.to_big_int()?)),
        NumericKind::Float | NumericKind::Double => left.to_f64()?.partial_cmp(&right.to_f64()?),
        NumericKind::BigDecimal => Some(left.to_big_decimal()?.cmp(&right.to_big_decimal()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sorts_first() {
        let cmp = StandardTypeComparator;
        assert_eq!(cmp.compare(&Value::Null, &Value::Int(-5)).unwrap(), Ordering::Less);
        assert_eq!(cmp.compare(&Value::str("a"), &Value::Null).unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_mixed_numeric_comparison() {
        let cmp = StandardTypeComparator;
        assert_eq!(cmp.compare(&Value::Int(2), &Value::Double(2.5)).unwrap(), Ordering::Less);
        assert_eq!(cmp.compare(&Value::Long(7), &Value::Int(7)).unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_signed_zeros_are_equal() {
        assert_eq!(
            compare_numbers(&Value::Double(-0.0), &Value::Double(0.0)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            compare_numbers(&Value::Float(-0.0), &Value::Int(0)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_nan_is_unordered() {
        assert_eq!(compare_numbers(&Value::Double(f64::NAN), &Value::Double(f64::NAN)), None);
        assert_eq!(compare_numbers(&Value::Float(f32::NAN), &Value::Int(1)), None);

        let err = StandardTypeComparator
            .compare(&Value::Double(f64::NAN), &Value::Double(1.0))
            .unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::NotComparable { .. }));
    }

    #[test]
    fn test_incomparable_types() {
        let cmp = StandardTypeComparator;
        assert!(!cmp.can_compare(&Value::str("a"), &Value::Int(1)));
        let err = cmp.compare(&Value::str("a"), &Value::Int(1)).unwrap_err();
        assert!(matches!(err.kind, EvalErrorKind::NotComparable { .. }));
    }
}
