//! The evaluation context and the strategies it supplies.
//!
//! The interpreter never reaches into host objects directly. Every property
//! read, method call, conversion, comparison and type lookup goes through the
//! [`EvaluationContext`] passed to the evaluation, so embedders decide what an
//! expression can see.

mod accessor;
mod builtins;
mod comparator;
mod converter;
mod locator;
pub mod matching;
mod overloader;
mod registry;
mod resolver;
mod standard;

#[cfg(test)]
mod matching_test;
#[cfg(test)]
mod standard_test;

use std::sync::Arc;

pub use accessor::{MapAccessor, ObjectFieldAccessor, PropertyAccessor, accessors_for};
pub(crate) use comparator::compare_numbers;
pub use comparator::{StandardTypeComparator, TypeComparator};
pub use converter::{StandardTypeConverter, TypeConverter};
pub use locator::{StandardTypeLocator, TypeLocator};
pub use overloader::{OperatorOverloader, StandardOperatorOverloader};
pub use registry::{
    ConstructorDescriptor, MethodDescriptor, NativeConstructor, NativeMethod,
    RegistryConstructorResolver, RegistryMethodResolver, Signature,
};
pub use resolver::{ConstructorExecutor, ConstructorResolver, MethodExecutor, MethodResolver};
pub use standard::StandardEvaluationContext;

use crate::values::TypedValue;

/// Everything an evaluation may consult beyond the tree itself.
///
/// Implementations are owned by the embedder and may be shared between
/// threads; the engine only reads from them, apart from
/// [`set_variable`](Self::set_variable).
pub trait EvaluationContext: Send + Sync {
    /// Root object used when the caller does not supply one.
    fn root_object(&self) -> TypedValue;

    fn lookup_variable(&self, name: &str) -> Option<TypedValue>;

    fn set_variable(&self, name: &str, value: TypedValue);

    /// Property accessors in registration order.
    fn property_accessors(&self) -> &[Arc<dyn PropertyAccessor>];

    fn method_resolvers(&self) -> &[Arc<dyn MethodResolver>];

    fn constructor_resolvers(&self) -> &[Arc<dyn ConstructorResolver>];

    fn type_converter(&self) -> &dyn TypeConverter;

    fn type_comparator(&self) -> &dyn TypeComparator;

    fn operator_overloader(&self) -> &dyn OperatorOverloader;

    fn type_locator(&self) -> &dyn TypeLocator;

    /// Overloads registered for `#name(...)`.
    fn lookup_function(&self, _name: &str) -> &[Arc<MethodDescriptor>] {
        &[]
    }
}

/// True if both handles point at the same strategy instance.
pub(crate) fn same_strategy<T: ?Sized>(a: &Arc<T>, b: &Arc<T>) -> bool {
    core::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// True if `strategy` is still one of `registered`.
pub(crate) fn is_registered<T: ?Sized>(registered: &[Arc<T>], strategy: &Arc<T>) -> bool {
    registered.iter().any(|r| same_strategy(r, strategy))
}
