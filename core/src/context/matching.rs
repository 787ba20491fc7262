//! Overload ranking for methods, constructors and functions.
//!
//! Each argument is weighed against its parameter:
//!
//! | argument vs parameter            | kind                 | distance      |
//! |----------------------------------|----------------------|---------------|
//! | same type                        | exact                | 0             |
//! | null                             | close                | 1             |
//! | numeric widening                 | close                | 1 per rung    |
//! | declared supertype               | close                | 1 + position  |
//! | `Object` parameter               | close                | 5             |
//! | converter can convert            | requires conversion  | 0             |
//!
//! A candidate takes the worst kind of its arguments and the sum of their
//! distances. Varargs candidates are never exact; the trailing arguments are
//! weighed against the element type declared by the last parameter.

use core::fmt::Write as _;
use std::sync::Arc;

use ecow::EcoString;

use super::TypeConverter;
use crate::types::TypeDescriptor;

const OBJECT_PARAMETER_DISTANCE: u32 = 5;
const NULL_ARGUMENT_DISTANCE: u32 = 1;

/// Parameter list of a callable.
pub trait Signature {
    /// Declared parameter types. For varargs callables the last entry is the
    /// element type of the variable tail.
    fn params(&self) -> &[TypeDescriptor];

    fn is_varargs(&self) -> bool;
}

impl<S: Signature + ?Sized> Signature for Arc<S> {
    fn params(&self) -> &[TypeDescriptor] {
        (**self).params()
    }

    fn is_varargs(&self) -> bool {
        (**self).is_varargs()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    Close,
    RequiresConversion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgumentMatch {
    pub kind: MatchKind,
    pub distance: u32,
}

/// Several conversion matches were equally applicable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ambiguous;

/// Weigh one argument type against one parameter type.
pub fn weigh_argument(
    arg: Option<&TypeDescriptor>,
    param: &TypeDescriptor,
    converter: &dyn TypeConverter,
) -> Option<ArgumentMatch> {
    let close = |distance| {
        Some(ArgumentMatch {
            kind: MatchKind::Close,
            distance,
        })
    };
    let Some(arg) = arg else {
        return close(NULL_ARGUMENT_DISTANCE);
    };
    if arg.name() == param.name() {
        return Some(ArgumentMatch {
            kind: MatchKind::Exact,
            distance: 0,
        });
    }
    if let (Some(from), Some(to)) = (arg.numeric_kind(), param.numeric_kind()) {
        if let Some(steps) = from.widening_steps(to) {
            return close(steps);
        }
    }
    if *param == TypeDescriptor::Object {
        return close(OBJECT_PARAMETER_DISTANCE);
    }
    if let Some(distance) = arg.supertype_distance(param) {
        return close(distance);
    }
    converter
        .can_convert(Some(arg), param)
        .then_some(ArgumentMatch {
            kind: MatchKind::RequiresConversion,
            distance: 0,
        })
}

/// Weigh a whole argument list against `signature`.
pub fn match_signature<S: Signature + ?Sized>(
    signature: &S,
    arg_types: &[Option<TypeDescriptor>],
    converter: &dyn TypeConverter,
) -> Option<ArgumentMatch> {
    let params = signature.params();
    let varargs = signature.is_varargs() && !params.is_empty();
    if varargs {
        if arg_types.len() + 1 < params.len() {
            return None;
        }
    } else if arg_types.len() != params.len() {
        return None;
    }

    let mut total = ArgumentMatch {
        kind: if varargs { MatchKind::Close } else { MatchKind::Exact },
        distance: 0,
    };
    for (index, arg) in arg_types.iter().enumerate() {
        let param = &params[index.min(params.len() - 1)];
        let weight = weigh_argument(arg.as_ref(), param, converter)?;
        total.kind = total.kind.max(weight.kind);
        total.distance += weight.distance;
    }
    Some(total)
}

/// Pick the best candidate for `arg_types`.
///
/// An exact match is returned as soon as it is seen. Otherwise the close
/// match with the least distance wins, preferring fixed-arity candidates and
/// then registration order. Otherwise a single conversion match is used.
pub fn select<'a, S, I>(
    candidates: I,
    arg_types: &[Option<TypeDescriptor>],
    converter: &dyn TypeConverter,
) -> Result<Option<&'a S>, Ambiguous>
where
    S: Signature + ?Sized + 'a,
    I: IntoIterator<Item = &'a S>,
{
    let mut best_close: Option<(u32, bool, &'a S)> = None;
    let mut conversions: Vec<&'a S> = Vec::new();

    for candidate in candidates {
        let Some(found) = match_signature(candidate, arg_types, converter) else {
            continue;
        };
        match found.kind {
            MatchKind::Exact => return Ok(Some(candidate)),
            MatchKind::Close => {
                let key = (found.distance, candidate.is_varargs());
                let better = best_close
                    .as_ref()
                    .is_none_or(|(distance, varargs, _)| key < (*distance, *varargs));
                if better {
                    best_close = Some((key.0, key.1, candidate));
                }
            }
            MatchKind::RequiresConversion => conversions.push(candidate),
        }
    }

    if let Some((_, _, candidate)) = best_close {
        return Ok(Some(candidate));
    }
    match conversions.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        _ => Err(Ambiguous),
    }
}

/// Render argument types for messages: `Integer, null, String`.
pub fn describe_types(arg_types: &[Option<TypeDescriptor>]) -> EcoString {
    let mut out = EcoString::new();
    for (index, ty) in arg_types.iter().enumerate() {
        if index > 0 {
            out.push_str(", ");
        }
        match ty {
            Some(ty) => {
                let _ = write!(out, "{ty}");
            }
            None => out.push_str("null"),
        }
    }
    out
}
