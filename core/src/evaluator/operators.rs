//! Binary and unary operator implementations.

use core::cmp::Ordering;
use core::mem::discriminant;

use bigdecimal::{BigDecimal, RoundingMode};
use ecow::EcoString;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use super::{EvalError, EvalErrorKind};
use crate::ast::{BinaryOp, ComparisonOp, StepOp};
use crate::context::compare_numbers;
use crate::state::ExpressionState;
use crate::types::{NumericKind, TypeDescriptor};
use crate::values::Value;

/// Apply an arithmetic operator.
///
/// Strings concatenate under `+` and repeat under `String * int`. Numbers are
/// promoted to the wider kind first. Anything else goes to the operator
/// overloader.
pub(crate) fn binary(
    op: BinaryOp,
    left: &Value,
    right: &Value,
    state: &ExpressionState<'_>,
) -> Result<Value, EvalError> {
    match (op, left, right) {
        (BinaryOp::Add, Value::Str(_), _) | (BinaryOp::Add, _, Value::Str(_)) => {
            let mut s = text_of(left, state);
            s.push_str(&text_of(right, state));
            Ok(Value::Str(s))
        }
        (BinaryOp::Mul, Value::Str(s), count) if count.is_integral() => {
            let count = count.to_i64().unwrap_or(0).max(0) as usize;
            Ok(Value::str(s.repeat(count)))
        }
        _ => match (left.numeric_kind(), right.numeric_kind()) {
            (Some(l), Some(r)) => arithmetic(op, l.promote(r), left, right),
            _ => state.operate(op, left, right),
        },
    }
}

fn text_of(value: &Value, state: &ExpressionState<'_>) -> EcoString {
    match value {
        Value::Str(s) => s.clone(),
        Value::Null => EcoString::from("null"),
        other => match state.convert_value(other, &TypeDescriptor::String) {
            Ok(Value::Str(s)) => s,
            _ => other.to_string().into(),
        },
    }
}

/// Arithmetic at an already promoted numeric kind.
pub(crate) fn arithmetic(
    op: BinaryOp,
    kind: NumericKind,
    left: &Value,
    right: &Value,
) -> Result<Value, EvalError> {
    let mismatch = || EvalErrorKind::OperatorNotSupportedBetweenTypes {
        op: op.symbol().into(),
        left: left.type_name(),
        right: right.type_name(),
    };
    match kind {
        NumericKind::Byte | NumericKind::Short | NumericKind::Int => {
            let (l, r) = (left.to_i32().ok_or_else(mismatch)?, right.to_i32().ok_or_else(mismatch)?);
            if op == BinaryOp::Pow {
                return integer_pow(BigInt::from(l), right, NumericKind::Int);
            }
            eval_binary_int(op, l, r).map(Value::Int)
        }
        NumericKind::Long => {
            let (l, r) = (left.to_i64().ok_or_else(mismatch)?, right.to_i64().ok_or_else(mismatch)?);
            if op == BinaryOp::Pow {
                return integer_pow(BigInt::from(l), right, NumericKind::Long);
            }
            eval_binary_long(op, l, r).map(Value::Long)
        }
        NumericKind::BigInteger => {
            let l = left.to_big_int().ok_or_else(mismatch)?;
            if op == BinaryOp::Pow {
                return integer_pow(l, right, NumericKind::BigInteger);
            }
            let r = right.to_big_int().ok_or_else(mismatch)?;
            eval_binary_big_int(op, &l, &r).map(Value::BigInteger)
        }
        NumericKind::Float => {
            let (l, r) = (left.to_f32().ok_or_else(mismatch)?, right.to_f32().ok_or_else(mismatch)?);
            match op {
                BinaryOp::Pow => Ok(Value::Double((l as f64).powf(r as f64))),
                _ => Ok(Value::Float(eval_binary_float(op, l, r))),
            }
        }
        NumericKind::Double => {
            let (l, r) = (left.to_f64().ok_or_else(mismatch)?, right.to_f64().ok_or_else(mismatch)?);
            Ok(Value::Double(eval_binary_double(op, l, r)))
        }
        NumericKind::BigDecimal => {
            let l = left.to_big_decimal().ok_or_else(mismatch)?;
            if op == BinaryOp::Pow {
                let exponent = right.to_i64().ok_or_else(mismatch)?;
                return decimal_pow(l, exponent).map(Value::Decimal);
            }
            let r = right.to_big_decimal().ok_or_else(mismatch)?;
            eval_binary_decimal(op, &l, &r).map(Value::Decimal)
        }
    }
}

/// Evaluate a binary operation on two ints.
///
/// Uses wrapping arithmetic to prevent panics on overflow.
/// Division by zero returns an error.
pub(crate) fn eval_binary_int(op: BinaryOp, left: i32, right: i32) -> Result<i32, EvalError> {
    match op {
        BinaryOp::Add => Ok(left.wrapping_add(right)),
        BinaryOp::Sub => Ok(left.wrapping_sub(right)),
        BinaryOp::Mul => Ok(left.wrapping_mul(right)),
        BinaryOp::Div if right == 0 => Err(EvalErrorKind::DivisionByZero.into()),
        // wrapping_div handles i32::MIN / -1
        BinaryOp::Div => Ok(left.wrapping_div(right)),
        BinaryOp::Mod if right == 0 => Err(EvalErrorKind::DivisionByZero.into()),
        BinaryOp::Mod => Ok(left.wrapping_rem(right)),
        BinaryOp::Pow => checked_exponent(right)
            .and_then(|e| left.checked_pow(e).ok_or_else(|| overflow(op))),
    }
}

pub(crate) fn eval_binary_long(op: BinaryOp, left: i64, right: i64) -> Result<i64, EvalError> {
    match op {
        BinaryOp::Add => Ok(left.wrapping_add(right)),
        BinaryOp::Sub => Ok(left.wrapping_sub(right)),
        BinaryOp::Mul => Ok(left.wrapping_mul(right)),
        BinaryOp::Div if right == 0 => Err(EvalErrorKind::DivisionByZero.into()),
        BinaryOp::Div => Ok(left.wrapping_div(right)),
        BinaryOp::Mod if right == 0 => Err(EvalErrorKind::DivisionByZero.into()),
        BinaryOp::Mod => Ok(left.wrapping_rem(right)),
        BinaryOp::Pow => checked_exponent(right)
            .and_then(|e| left.checked_pow(e).ok_or_else(|| overflow(op))),
    }
}

fn checked_exponent(exponent: impl Into<i64>) -> Result<u32, EvalError> {
    let exponent = exponent.into();
    if exponent < 0 {
        return Err(EvalErrorKind::NegativeExponent { exponent }.into());
    }
    u32::try_from(exponent).map_err(|_| overflow(BinaryOp::Pow))
}

fn overflow(op: BinaryOp) -> EvalError {
    EvalErrorKind::InvalidArgument {
        message: format!("result of '{op}' does not fit the operand type").into(),
    }
    .into()
}

/// Follows IEEE 754 semantics (produces inf/nan rather than panicking).
pub(crate) fn eval_binary_float(op: BinaryOp, left: f32, right: f32) -> f32 {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Mod => left % right,
        BinaryOp::Pow => left.powf(right),
    }
}

pub(crate) fn eval_binary_double(op: BinaryOp, left: f64, right: f64) -> f64 {
    match op {
        BinaryOp::Add => left + right,
        BinaryOp::Sub => left - right,
        BinaryOp::Mul => left * right,
        BinaryOp::Div => left / right,
        BinaryOp::Mod => left % right,
        BinaryOp::Pow => left.powf(right),
    }
}

fn eval_binary_big_int(op: BinaryOp, left: &BigInt, right: &BigInt) -> Result<BigInt, EvalError> {
    match op {
        BinaryOp::Add => Ok(left + right),
        BinaryOp::Sub => Ok(left - right),
        BinaryOp::Mul => Ok(left * right),
        BinaryOp::Div | BinaryOp::Mod if right.is_zero() => {
            Err(EvalErrorKind::DivisionByZero.into())
        }
        BinaryOp::Div => Ok(left / right),
        BinaryOp::Mod => Ok(left % right),
        BinaryOp::Pow => match integer_pow(left.clone(), &Value::BigInteger(right.clone()), NumericKind::BigInteger)? {
            Value::BigInteger(result) => Ok(result),
            other => other.to_big_int().ok_or_else(|| overflow(op)),
        },
    }
}

/// Division keeps the larger operand scale, rounding half-even.
fn eval_binary_decimal(
    op: BinaryOp,
    left: &BigDecimal,
    right: &BigDecimal,
) -> Result<BigDecimal, EvalError> {
    match op {
        BinaryOp::Add => Ok(left + right),
        BinaryOp::Sub => Ok(left - right),
        BinaryOp::Mul => Ok(left * right),
        BinaryOp::Div | BinaryOp::Mod if right.is_zero() => {
            Err(EvalErrorKind::DivisionByZero.into())
        }
        BinaryOp::Div => {
            let scale = scale_of(left).max(scale_of(right));
            Ok((left / right).with_scale_round(scale, RoundingMode::HalfEven))
        }
        BinaryOp::Mod => Ok(left % right),
        BinaryOp::Pow => match right.to_i64() {
            Some(exponent) => decimal_pow(left.clone(), exponent),
            None => Err(overflow(op)),
        },
    }
}

fn scale_of(value: &BigDecimal) -> i64 {
    value.as_bigint_and_exponent().1
}

/// Integer power, widening the result `Int -> Long -> BigInteger` as needed
/// and never narrowing below `floor`.
fn integer_pow(base: BigInt, exponent: &Value, floor: NumericKind) -> Result<Value, EvalError> {
    let exponent = checked_exponent(exponent.to_i64().ok_or_else(|| overflow(BinaryOp::Pow))?)?;
    let result = base.pow(exponent);
    if floor <= NumericKind::Int {
        if let Some(v) = result.to_i32() {
            return Ok(Value::Int(v));
        }
    }
    if floor <= NumericKind::Long {
        if let Some(v) = result.to_i64() {
            return Ok(Value::Long(v));
        }
    }
    Ok(Value::BigInteger(result))
}

fn decimal_pow(base: BigDecimal, exponent: i64) -> Result<BigDecimal, EvalError> {
    if exponent < 0 {
        return Err(EvalErrorKind::NegativeExponent { exponent }.into());
    }
    let mut result = BigDecimal::from(1);
    let mut square = base;
    let mut remaining = exponent;
    while remaining > 0 {
        if remaining & 1 == 1 {
            result = &result * &square;
        }
        remaining >>= 1;
        if remaining > 0 {
            square = &square * &square;
        }
    }
    Ok(result)
}

pub(crate) fn negate(value: &Value, state: &ExpressionState<'_>) -> Result<Value, EvalError> {
    Ok(match value {
        Value::Byte(v) => Value::Int(-(*v as i32)),
        Value::Short(v) => Value::Int(-(*v as i32)),
        Value::Int(v) => Value::Int(v.wrapping_neg()),
        Value::Long(v) => Value::Long(v.wrapping_neg()),
        Value::BigInteger(v) => Value::BigInteger(-v),
        Value::Float(v) => Value::Float(-v),
        Value::Double(v) => Value::Double(-v),
        Value::Decimal(v) => Value::Decimal(-v),
        other => return state.operate(BinaryOp::Sub, other, &Value::Null),
    })
}

pub(crate) fn unary_plus(value: &Value, state: &ExpressionState<'_>) -> Result<Value, EvalError> {
    if value.is_numeric() {
        return Ok(value.clone());
    }
    state.operate(BinaryOp::Add, value, &Value::Null)
}

/// The value after `++` or `--`. Byte and short operands keep their kind.
pub(crate) fn step(op: StepOp, value: &Value, state: &ExpressionState<'_>) -> Result<Value, EvalError> {
    let op = match op {
        StepOp::Increment => BinaryOp::Add,
        StepOp::Decrement => BinaryOp::Sub,
    };
    let Some(kind) = value.numeric_kind() else {
        return state.operate(op, value, &Value::Int(1));
    };
    let stepped = arithmetic(op, kind.promote(NumericKind::Int), value, &Value::Int(1))?;
    match kind {
        NumericKind::Byte | NumericKind::Short => Ok(stepped.to_numeric(kind).unwrap_or(stepped)),
        _ => Ok(stepped),
    }
}

/// Equality: numbers by value across kinds, then the comparator for values of
/// the same kind it understands, then structural equality.
pub(crate) fn values_equal(left: &Value, right: &Value, state: &ExpressionState<'_>) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ if left.is_numeric() && right.is_numeric() => {
            compare_numbers(left, right) == Some(Ordering::Equal)
        }
        _ => {
            let comparator = state.context().type_comparator();
            if discriminant(left) == discriminant(right) && comparator.can_compare(left, right) {
                comparator
                    .compare(left, right)
                    .is_ok_and(|ordering| ordering == Ordering::Equal)
            } else {
                left == right
            }
        }
    }
}

/// Apply a relational operator. Two numbers compare at their promoted kind,
/// as compiled code does; anything else goes through the context's comparator.
pub(crate) fn relation_holds(
    op: ComparisonOp,
    left: &Value,
    right: &Value,
    state: &ExpressionState<'_>,
) -> Result<bool, EvalError> {
    if left.is_numeric() && right.is_numeric() {
        return Ok(op.holds_partial(compare_numbers(left, right)));
    }
    let ordering = state.context().type_comparator().compare(left, right)?;
    Ok(op.holds(ordering))
}
