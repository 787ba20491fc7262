//! Stack of variable scopes for one evaluation.
//!
//! Selection and projection enter a fresh scope for every element they visit,
//! so a variable bound while evaluating one element never leaks into the next:
//! ```text
//! people.?[(#n = name.length()) > 3]   // `#n` lives in the element's scope
//! ```
//! Lookup walks from the innermost scope outwards; the first binding wins.

use core::fmt;

use ecow::EcoString;
use hashbrown::HashMap;

/// One level of bindings.
#[derive(Debug, Clone)]
pub struct Scope<T> {
    bindings: HashMap<EcoString, T>,
}

impl<T> Default for Scope<T> {
    fn default() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }
}

impl<T> Scope<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A scope pre-populated with `bindings`.
    pub fn from_bindings<I, S>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<EcoString>,
    {
        Self {
            bindings: bindings.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.bindings.get(name)
    }

    /// Bind `name`, returning the value it shadows in this scope.
    pub fn bind(&mut self, name: &str, value: T) -> Option<T> {
        self.bindings.insert(name.into(), value)
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut T> {
        self.bindings.get_mut(name)
    }
}

/// A stack of scopes, searched from innermost to outermost.
#[derive(Debug, Clone)]
pub struct ScopeStack<T> {
    scopes: Vec<Scope<T>>,
}

impl<T> Default for ScopeStack<T> {
    fn default() -> Self {
        Self { scopes: Vec::new() }
    }
}

impl<T> ScopeStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, scope: Scope<T>) {
        self.scopes.push(scope);
    }

    /// Pop the topmost scope.
    ///
    /// Returns an error if the stack is empty.
    pub fn pop(&mut self) -> Result<Scope<T>, PopError> {
        self.scopes.pop().ok_or(PopError::EmptyStack)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn lookup(&self, name: &str) -> Option<&T> {
        self.scopes.iter().rev().find_map(|scope| scope.lookup(name))
    }

    /// Bind a value in the topmost scope.
    pub fn bind_in_current(&mut self, name: &str, value: T) -> Result<(), BindError> {
        self.scopes
            .last_mut()
            .ok_or(BindError::NoScope)?
            .bind(name, value);
        Ok(())
    }

    /// Overwrite the innermost existing binding of `name`.
    ///
    /// Returns the value back if no scope binds `name`.
    pub fn assign(&mut self, name: &str, value: T) -> Result<(), T> {
        match self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(value),
        }
    }
}

/// Error when trying to bind a value in a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    /// No scope exists to bind in.
    NoScope,
}

impl fmt::Display for BindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindError::NoScope => write!(f, "No scope to bind in"),
        }
    }
}

/// Error when trying to pop a scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopError {
    /// The stack is empty.
    EmptyStack,
}

impl fmt::Display for PopError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PopError::EmptyStack => write!(f, "Cannot pop from empty scope stack"),
        }
    }
}
