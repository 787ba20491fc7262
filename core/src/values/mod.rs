//! Runtime values.
//!
//! [`Value`] is the dynamic value flowing through evaluation; [`TypedValue`]
//! pairs it with the descriptor the resolvers and compiler reason about.

mod collections;
mod object;
mod typed;
mod value;

#[cfg(test)]
mod value_test;

pub use collections::{ListRef, MapRef};
pub use object::{HostObject, MapEntry, ObjectRef, Record};
pub use typed::TypedValue;
pub use value::Value;
