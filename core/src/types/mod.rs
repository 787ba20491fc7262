//! Static type descriptors carried alongside runtime values.
//!
//! A [`TypeDescriptor`] names the dynamic type of a value well enough for the
//! resolvers to pick accessors and overloads, and for the compiler to commit to
//! a node's exit type.

mod descriptor;
mod numeric;

#[cfg(test)]
mod descriptor_test;

pub use descriptor::{ClassDescriptor, TypeDescriptor};
pub use numeric::NumericKind;
