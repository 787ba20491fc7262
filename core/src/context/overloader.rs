use crate::ast::BinaryOp;
use crate::evaluator::{EvalError, EvalErrorKind};
use crate::values::Value;

/// Supplies arithmetic for operand pairs the built-in rules do not cover.
pub trait OperatorOverloader: Send + Sync {
    fn overrides_operation(&self, op: BinaryOp, left: &Value, right: &Value) -> bool;

    fn operate(&self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError>;
}

/// Declines every operation.
#[derive(Debug, Default)]
pub struct StandardOperatorOverloader;

impl OperatorOverloader for StandardOperatorOverloader {
    fn overrides_operation(&self, _op: BinaryOp, _left: &Value, _right: &Value) -> bool {
        false
    }

    fn operate(&self, op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
        Err(EvalErrorKind::OperatorNotSupportedBetweenTypes {
            op: op.symbol().into(),
            left: left.type_name(),
            right: right.type_name(),
        }
        .into())
    }
}
