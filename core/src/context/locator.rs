use std::sync::RwLock;

use ecow::EcoString;
use hashbrown::HashMap;

use crate::evaluator::{EvalError, EvalErrorKind};
use crate::types::TypeDescriptor;

/// Resolves the names used in type references and constructor calls.
pub trait TypeLocator: Send + Sync {
    fn find_type(&self, name: &str) -> Result<TypeDescriptor, EvalError>;
}

/// Built-in types, then registered classes, then registered classes under
/// each import prefix.
#[derive(Debug, Default)]
pub struct StandardTypeLocator {
    classes: RwLock<HashMap<EcoString, TypeDescriptor>>,
    imports: RwLock<Vec<EcoString>>,
}

impl StandardTypeLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `ty` locatable by its name.
    pub fn register(&self, ty: TypeDescriptor) {
        let name = EcoString::from(ty.name());
        write(&self.classes).insert(name, ty);
    }

    /// Add a package prefix tried for names that are not found as given.
    pub fn add_import(&self, prefix: impl Into<EcoString>) {
        write(&self.imports).push(prefix.into());
    }

    pub fn remove_import(&self, prefix: &str) {
        write(&self.imports).retain(|p| p != prefix);
    }

    fn lookup(&self, name: &str) -> Option<TypeDescriptor> {
        TypeDescriptor::builtin(name).or_else(|| read(&self.classes).get(name).cloned())
    }
}

impl TypeLocator for StandardTypeLocator {
    fn find_type(&self, name: &str) -> Result<TypeDescriptor, EvalError> {
        if let Some(ty) = self.lookup(name) {
            return Ok(ty);
        }
        let imports = read(&self.imports).clone();
        for prefix in imports {
            let qualified = if prefix.ends_with('.') {
                format!("{prefix}{name}")
            } else {
                format!("{prefix}.{name}")
            };
            if let Some(ty) = self.lookup(&qualified) {
                return Ok(ty);
            }
        }
        Err(EvalErrorKind::TypeNotFound { name: name.into() }.into())
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(std::sync::PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ClassDescriptor;

    #[test]
    fn test_builtin_names() {
        let locator = StandardTypeLocator::new();
        assert_eq!(locator.find_type("Integer").unwrap(), TypeDescriptor::Int);
        assert_eq!(locator.find_type("java.lang.String").unwrap(), TypeDescriptor::String);
    }

    #[test]
    fn test_registered_class_through_import() {
        let locator = StandardTypeLocator::new();
        let account = ClassDescriptor::new("com.bank.Account").into_type();
        locator.register(account.clone());
        assert!(locator.find_type("Account").is_err());
        locator.add_import("com.bank");
        assert_eq!(locator.find_type("Account").unwrap(), account);
    }

    #[test]
    fn test_unknown_type() {
        let err = StandardTypeLocator::new().find_type("Nope").unwrap_err();
        assert_eq!(err.code(), "E1041");
    }
}
