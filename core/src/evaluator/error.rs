//! Evaluation errors.
//!
//! Every failure the interpreter can raise is an [`EvalError`]: a message code
//! ([`EvalErrorKind`]) plus the source span of the node it is attributed to.
//! Callables report failures through [`CallError`], which keeps "the callee
//! failed" apart from "the callee could not be invoked".

use std::error::Error;
use std::sync::Arc;

use ecow::EcoString;
use thiserror::Error;

use crate::api::{Diagnostic, Severity};
use crate::ast::Span;

/// An evaluation failure attributed to a position in the expression.
#[derive(Debug, Error)]
#[error("{kind}{}", position_suffix(.span))]
pub struct EvalError {
    pub kind: EvalErrorKind,
    pub span: Option<Span>,
}

fn position_suffix(span: &Option<Span>) -> String {
    match span {
        Some(span) => format!(" (at {}..{})", span.0.start, span.0.end),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum EvalErrorKind {
    #[error("property or field '{name}' cannot be found on object of type '{type_name}'")]
    PropertyOrFieldNotReadable { name: EcoString, type_name: EcoString },

    #[error("property or field '{name}' cannot be set on object of type '{type_name}'")]
    PropertyOrFieldNotWritable { name: EcoString, type_name: EcoString },

    #[error("property or field '{name}' cannot be found on null")]
    PropertyOrFieldNotReadableOnNull { name: EcoString },

    #[error("property or field '{name}' cannot be set on null")]
    PropertyOrFieldNotWritableOnNull { name: EcoString },

    #[error("method {name}({arg_types}) cannot be found on type {type_name}")]
    MethodNotFound {
        name: EcoString,
        type_name: EcoString,
        arg_types: EcoString,
    },

    #[error("method call: attempted to call method {name}() on null context object")]
    MethodCallOnNull { name: EcoString },

    #[error("no suitable constructor found on type {type_name} for arguments ({arg_types})")]
    ConstructorNotFound {
        type_name: EcoString,
        arg_types: EcoString,
    },

    #[error("function '{name}' cannot be found for arguments ({arg_types})")]
    FunctionNotFound {
        name: EcoString,
        arg_types: EcoString,
    },

    #[error("operator {op} is not supported between objects of type '{left}' and '{right}'")]
    OperatorNotSupportedBetweenTypes {
        op: EcoString,
        left: EcoString,
        right: EcoString,
    },

    #[error("multiple methods named '{name}' match arguments ({arg_types}) equally well")]
    AmbiguousMethod {
        name: EcoString,
        arg_types: EcoString,
    },

    #[error("multiple constructors of type {type_name} match arguments ({arg_types}) equally well")]
    AmbiguousConstructor {
        type_name: EcoString,
        arg_types: EcoString,
    },

    #[error("the expression component '{operand}' does not support increment")]
    OperandNotIncrementable { operand: EcoString },

    #[error("the expression component '{operand}' does not support decrement")]
    OperandNotDecrementable { operand: EcoString },

    #[error("{what} is not assignable")]
    NotAssignable { what: EcoString },

    #[error("type conversion problem, cannot convert from {from} to {to}")]
    TypeConversionError { from: EcoString, to: EcoString },

    #[error("type cannot be found '{name}'")]
    TypeNotFound { name: EcoString },

    #[error("cannot index into a null value")]
    CannotIndexIntoNull,

    #[error("index {index} out of bounds for size {size}")]
    IndexOutOfBounds { index: i64, size: usize },

    #[error("indexing into type '{type_name}' is not supported")]
    IndexingNotSupportedForType { type_name: EcoString },

    #[error("unable to grow collection to index {index}")]
    UnableToGrowCollection { index: i64 },

    #[error("unable to create a value of type '{type_name}' for auto-grow of '{name}'")]
    UnableToAutoGrow { name: EcoString, type_name: EcoString },

    #[error("cannot modify an immutable collection")]
    CollectionIsImmutable,

    #[error("division by zero")]
    DivisionByZero,

    #[error("negative exponent {exponent} is not supported for integer power")]
    NegativeExponent { exponent: i64 },

    #[error("cannot compare instances of {left} and {right}")]
    NotComparable { left: EcoString, right: EcoString },

    #[error("right operand for the 'between' operator has to be a two-element list")]
    BetweenRightOperandMustBeTwoElementList,

    #[error("right operand for the 'instanceof' operator must be a type, not '{type_name}'")]
    InstanceOfOperandMustBeType { type_name: EcoString },

    #[error("result of selection criteria is not boolean")]
    ResultOfSelectionCriteriaIsNotBoolean,

    #[error("cannot perform selection on input data of type '{type_name}'")]
    InvalidTypeForSelection { type_name: EcoString },

    #[error("projection is not supported on type '{type_name}'")]
    ProjectionNotSupportedOnType { type_name: EcoString },

    #[error("a problem occurred whilst attempting to invoke '{name}': {cause}")]
    ExceptionDuringInvocation {
        name: EcoString,
        cause: Arc<dyn Error + Send + Sync>,
    },

    #[error("problem invoking '{name}': {reason}")]
    InvocationProblem { name: EcoString, reason: EcoString },

    #[error("invalid argument: {message}")]
    InvalidArgument { message: EcoString },

    #[error("evaluation exceeded the maximum depth of {max_depth}")]
    StackOverflow { max_depth: usize },
}

impl EvalErrorKind {
    /// Stable code for documentation lookup.
    pub fn code(&self) -> &'static str {
        use EvalErrorKind::*;
        match self {
            PropertyOrFieldNotReadable { .. } => "E1001",
            PropertyOrFieldNotWritable { .. } => "E1002",
            PropertyOrFieldNotReadableOnNull { .. } => "E1003",
            PropertyOrFieldNotWritableOnNull { .. } => "E1004",
            MethodNotFound { .. } => "E1010",
            MethodCallOnNull { .. } => "E1011",
            ConstructorNotFound { .. } => "E1012",
            FunctionNotFound { .. } => "E1013",
            AmbiguousMethod { .. } => "E1014",
            AmbiguousConstructor { .. } => "E1015",
            ExceptionDuringInvocation { .. } => "E1016",
            InvocationProblem { .. } => "E1017",
            InvalidArgument { .. } => "E1018",
            OperatorNotSupportedBetweenTypes { .. } => "E1020",
            DivisionByZero => "E1021",
            NegativeExponent { .. } => "E1022",
            NotComparable { .. } => "E1023",
            BetweenRightOperandMustBeTwoElementList => "E1024",
            InstanceOfOperandMustBeType { .. } => "E1025",
            OperandNotIncrementable { .. } => "E1030",
            OperandNotDecrementable { .. } => "E1031",
            NotAssignable { .. } => "E1032",
            TypeConversionError { .. } => "E1040",
            TypeNotFound { .. } => "E1041",
            CannotIndexIntoNull => "E1050",
            IndexOutOfBounds { .. } => "E1051",
            IndexingNotSupportedForType { .. } => "E1052",
            UnableToGrowCollection { .. } => "E1053",
            UnableToAutoGrow { .. } => "E1054",
            CollectionIsImmutable => "E1055",
            ResultOfSelectionCriteriaIsNotBoolean => "E1060",
            InvalidTypeForSelection { .. } => "E1061",
            ProjectionNotSupportedOnType { .. } => "E1062",
            StackOverflow { .. } => "E1090",
        }
    }
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        Self { kind, span: None }
    }

    /// Attribute the error to `span` unless it is already attributed.
    pub fn at(mut self, span: &Span) -> Self {
        if self.span.is_none() {
            self.span = Some(span.clone());
        }
        self
    }

    /// Attribute the error to `span`, replacing any earlier attribution.
    pub fn restamp(mut self, span: &Span) -> Self {
        self.span = Some(span.clone());
        self
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// The callee's own failure, for errors raised inside an invoked callable.
    pub fn cause(&self) -> Option<&(dyn Error + Send + Sync)> {
        match &self.kind {
            EvalErrorKind::ExceptionDuringInvocation { cause, .. } => Some(&**cause),
            _ => None,
        }
    }

    /// Convert to a Diagnostic for API boundary.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let help = match &self.kind {
            EvalErrorKind::PropertyOrFieldNotReadableOnNull { .. }
            | EvalErrorKind::MethodCallOnNull { .. } => {
                Some("use the null-safe navigation operator '?.' to tolerate null".into())
            }
            EvalErrorKind::AmbiguousMethod { .. } | EvalErrorKind::AmbiguousConstructor { .. } => {
                Some("convert the arguments explicitly so only one overload applies".into())
            }
            _ => None,
        };
        Diagnostic {
            severity: Severity::Error,
            message: self.kind.to_string(),
            span: self.span.clone().unwrap_or_default(),
            help,
            code: Some(self.code().into()),
        }
    }
}

impl From<EvalErrorKind> for EvalError {
    fn from(kind: EvalErrorKind) -> Self {
        EvalError::new(kind)
    }
}

/// Failure reported by an invoked method, constructor, or function.
#[derive(Debug, Error)]
pub enum CallError {
    /// An evaluation error; rethrown unchanged.
    #[error(transparent)]
    Failed(#[from] EvalError),

    /// The callee itself failed; surfaced as an invocation exception carrying
    /// this cause.
    #[error("{0}")]
    Raised(Box<dyn Error + Send + Sync>),

    /// The callable could not be invoked at all.
    #[error("{0}")]
    Unavailable(EcoString),
}

impl CallError {
    pub fn raised(error: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        CallError::Raised(error.into())
    }

    /// Map to the evaluation error reported for callable `name`.
    pub fn into_eval_error(self, name: &str) -> EvalError {
        match self {
            CallError::Failed(error) => error,
            CallError::Raised(cause) => EvalErrorKind::ExceptionDuringInvocation {
                name: name.into(),
                cause: Arc::from(cause),
            }
            .into(),
            CallError::Unavailable(reason) => EvalErrorKind::InvocationProblem {
                name: name.into(),
                reason,
            }
            .into(),
        }
    }
}

impl From<EvalErrorKind> for CallError {
    fn from(kind: EvalErrorKind) -> Self {
        CallError::Failed(kind.into())
    }
}
