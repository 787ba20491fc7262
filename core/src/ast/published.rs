//! Per-node caches shared across evaluations.

use core::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::types::TypeDescriptor;

/// An atomically published optional handle.
///
/// Readers get either nothing or a fully built value. Writers replace the
/// whole handle; concurrent writers race and the last one wins. Each node owns
/// its own cells, so no lock is ever held across nodes.
pub struct Published<T>(RwLock<Option<Arc<T>>>);

impl<T> Published<T> {
    pub const fn new() -> Self {
        Published(RwLock::new(None))
    }

    pub fn load(&self) -> Option<Arc<T>> {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn store(&self, value: T) -> Arc<T> {
        let value = Arc::new(value);
        self.store_arc(value.clone());
        value
    }

    pub fn store_arc(&self, value: Arc<T>) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(value);
    }

    pub fn clear(&self) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_set(&self) -> bool {
        self.0.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

impl<T> Default for Published<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for Published<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.load() {
            Some(value) => write!(f, "Published({:?})", value),
            None => write!(f, "Published(<empty>)"),
        }
    }
}

/// What evaluation has observed about a node's result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitType {
    /// Every non-null result so far had this public type.
    Known(TypeDescriptor),
    /// Results of different types were observed.
    Unstable,
}

impl Published<ExitType> {
    /// Record the type of a non-null result.
    ///
    /// Non-public types are not recorded: compiled code could not name them.
    pub fn observe(&self, ty: &TypeDescriptor) {
        if !ty.is_public() {
            return;
        }
        match self.load().as_deref() {
            None => {
                self.store(ExitType::Known(ty.clone()));
            }
            Some(ExitType::Known(known)) if known == ty => {}
            Some(ExitType::Known(_)) => {
                self.store(ExitType::Unstable);
            }
            Some(ExitType::Unstable) => {}
        }
    }

    /// The committed exit type, if stable.
    pub fn known(&self) -> Option<TypeDescriptor> {
        match self.load().as_deref() {
            Some(ExitType::Known(ty)) => Some(ty.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassDescriptor;

    #[test]
    fn test_publish_and_clear() {
        let cell: Published<u32> = Published::new();
        assert!(cell.load().is_none());
        cell.store(7);
        assert_eq!(cell.load().as_deref(), Some(&7));
        cell.clear();
        assert!(!cell.is_set());
    }

    #[test]
    fn test_exit_type_becomes_unstable_on_change() {
        let cell: Published<ExitType> = Published::new();
        cell.observe(&TypeDescriptor::Int);
        cell.observe(&TypeDescriptor::Int);
        assert_eq!(cell.known(), Some(TypeDescriptor::Int));
        cell.observe(&TypeDescriptor::Long);
        assert_eq!(cell.known(), None);
        cell.observe(&TypeDescriptor::Int);
        assert_eq!(cell.known(), None);
    }

    #[test]
    fn test_non_public_types_are_not_recorded() {
        let cell: Published<ExitType> = Published::new();
        cell.observe(&ClassDescriptor::new("Hidden").non_public().into_type());
        assert!(!cell.is_set());
    }
}
