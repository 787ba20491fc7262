//! Shared, lockable collections.
//!
//! Lists and maps are reference types: every clone of a [`ListRef`] or
//! [`MapRef`] observes the same storage. Constant literals are *frozen* and
//! reject mutation; everything else may be mutated in place by assignment,
//! increment, or built-in methods.

use core::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Value;
use crate::evaluator::{EvalError, EvalErrorKind};

struct ListData {
    items: RwLock<Vec<Value>>,
    frozen: bool,
}

#[derive(Clone)]
pub struct ListRef(Arc<ListData>);

impl ListRef {
    pub fn new(items: Vec<Value>) -> Self {
        Self::build(items, false)
    }

    /// An immutable list, used for folded constant literals.
    pub fn frozen(items: Vec<Value>) -> Self {
        Self::build(items, true)
    }

    fn build(items: Vec<Value>, frozen: bool) -> Self {
        ListRef(Arc::new(ListData {
            items: RwLock::new(items),
            frozen,
        }))
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Value>> {
        self.0.items.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<Value>>, EvalError> {
        if self.0.frozen {
            return Err(EvalErrorKind::CollectionIsImmutable.into());
        }
        Ok(self.0.items.write().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.read().get(index).cloned()
    }

    /// Replace the element at `index`, returning the previous one.
    pub fn set(&self, index: usize, value: Value) -> Result<Value, EvalError> {
        let mut items = self.write()?;
        let size = items.len();
        match items.get_mut(index) {
            Some(slot) => Ok(core::mem::replace(slot, value)),
            None => Err(EvalErrorKind::IndexOutOfBounds {
                index: index as i64,
                size,
            }
            .into()),
        }
    }

    pub fn push(&self, value: Value) -> Result<(), EvalError> {
        self.write()?.push(value);
        Ok(())
    }

    /// Pad with nulls until the list holds at least `len` elements.
    pub fn grow_to(&self, len: usize) -> Result<(), EvalError> {
        let mut items = self.write()?;
        if items.len() < len {
            items.resize(len, Value::Null);
        }
        Ok(())
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.read().iter().any(|item| item == value)
    }

    /// Copy of the current elements.
    pub fn snapshot(&self) -> Vec<Value> {
        self.read().clone()
    }

    pub fn with_items<R>(&self, f: impl FnOnce(&[Value]) -> R) -> R {
        f(&self.read())
    }

    pub fn ptr_eq(&self, other: &ListRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for ListRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || *self.read() == *other.read()
    }
}

impl fmt::Debug for ListRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.read().iter()).finish()
    }
}

struct MapData {
    entries: RwLock<Vec<(Value, Value)>>,
    frozen: bool,
}

/// An insertion-ordered map with structural key equality.
#[derive(Clone)]
pub struct MapRef(Arc<MapData>);

impl MapRef {
    pub fn new(entries: Vec<(Value, Value)>) -> Self {
        Self::build(entries, false)
    }

    pub fn frozen(entries: Vec<(Value, Value)>) -> Self {
        Self::build(entries, true)
    }

    fn build(entries: Vec<(Value, Value)>, frozen: bool) -> Self {
        let mut deduped: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            match deduped.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => deduped.push((key, value)),
            }
        }
        MapRef(Arc::new(MapData {
            entries: RwLock::new(deduped),
            frozen,
        }))
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<(Value, Value)>> {
        self.0.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Vec<(Value, Value)>>, EvalError> {
        if self.0.frozen {
            return Err(EvalErrorKind::CollectionIsImmutable.into());
        }
        Ok(self.0.entries.write().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn is_frozen(&self) -> bool {
        self.0.frozen
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<Value> {
        self.read()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn contains_key(&self, key: &Value) -> bool {
        self.read().iter().any(|(k, _)| k == key)
    }

    /// Insert or replace, returning the previous value.
    pub fn insert(&self, key: Value, value: Value) -> Result<Option<Value>, EvalError> {
        let mut entries = self.write()?;
        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => Ok(Some(core::mem::replace(&mut slot.1, value))),
            None => {
                entries.push((key, value));
                Ok(None)
            }
        }
    }

    /// Copy of the current entries, in insertion order.
    pub fn entries(&self) -> Vec<(Value, Value)> {
        self.read().clone()
    }

    pub fn with_entries<R>(&self, f: impl FnOnce(&[(Value, Value)]) -> R) -> R {
        f(&self.read())
    }

    pub fn ptr_eq(&self, other: &MapRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for MapRef {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (left, right) = (self.read(), other.read());
        left.len() == right.len()
            && left
                .iter()
                .all(|(key, value)| right.iter().any(|(k, v)| k == key && v == value))
    }
}

impl fmt::Debug for MapRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.read().iter().map(|(k, v)| (k, v)))
            .finish()
    }
}
