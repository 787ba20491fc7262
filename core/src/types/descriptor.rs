use core::fmt;
use std::sync::Arc;

use ecow::EcoString;
use smallvec::SmallVec;

use super::NumericKind;

/// Describes the dynamic type of a value.
///
/// Built-in types are plain variants; embedder types are [`ClassDescriptor`]s.
/// Two descriptors are equal when they name the same type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Boolean,
    Char,
    Byte,
    Short,
    Int,
    Long,
    BigInteger,
    Float,
    Double,
    BigDecimal,
    String,
    List,
    Map,
    /// The type of type references (`T(Name)`).
    Type,
    /// The top type; every value is assignable to it.
    Object,
    Class(Arc<ClassDescriptor>),
}

/// An embedder-defined type.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct ClassDescriptor {
    name: EcoString,
    /// Nearest first.
    supertypes: Vec<EcoString>,
    public: bool,
}

impl ClassDescriptor {
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            supertypes: Vec::new(),
            public: true,
        }
    }

    /// Declare supertypes, nearest first.
    pub fn with_supertypes<I, S>(mut self, supertypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EcoString>,
    {
        self.supertypes = supertypes.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the type as not directly referenceable from compiled code.
    pub fn non_public(mut self) -> Self {
        self.public = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supertypes(&self) -> &[EcoString] {
        &self.supertypes
    }

    pub fn is_public(&self) -> bool {
        self.public
    }

    pub fn into_type(self) -> TypeDescriptor {
        TypeDescriptor::Class(Arc::new(self))
    }
}

const NUMBER_SUPERTYPES: &[&str] = &["Number", "Comparable", "Object"];

impl TypeDescriptor {
    /// Descriptor for an embedder type (or an abstract type such as `Number`).
    pub fn named(name: impl Into<EcoString>) -> TypeDescriptor {
        ClassDescriptor::new(name).into_type()
    }

    /// Look up a built-in type by simple or qualified name.
    pub fn builtin(name: &str) -> Option<TypeDescriptor> {
        let simple = name.strip_prefix("java.lang.").unwrap_or(name);
        let simple = simple
            .strip_prefix("java.util.")
            .or_else(|| simple.strip_prefix("java.math."))
            .unwrap_or(simple);
        Some(match simple {
            "Boolean" | "boolean" => TypeDescriptor::Boolean,
            "Character" | "char" => TypeDescriptor::Char,
            "Byte" | "byte" => TypeDescriptor::Byte,
            "Short" | "short" => TypeDescriptor::Short,
            "Integer" | "int" => TypeDescriptor::Int,
            "Long" | "long" => TypeDescriptor::Long,
            "BigInteger" => TypeDescriptor::BigInteger,
            "Float" | "float" => TypeDescriptor::Float,
            "Double" | "double" => TypeDescriptor::Double,
            "BigDecimal" => TypeDescriptor::BigDecimal,
            "String" => TypeDescriptor::String,
            "List" | "ArrayList" => TypeDescriptor::List,
            "Map" | "HashMap" | "LinkedHashMap" => TypeDescriptor::Map,
            "Class" => TypeDescriptor::Type,
            "Object" => TypeDescriptor::Object,
            "Number" | "CharSequence" | "Comparable" | "Collection" | "Iterable" | "Math" => {
                TypeDescriptor::named(simple)
            }
            _ => return None,
        })
    }

    pub fn name(&self) -> &str {
        match self {
            TypeDescriptor::Boolean => "Boolean",
            TypeDescriptor::Char => "Character",
            TypeDescriptor::Byte => "Byte",
            TypeDescriptor::Short => "Short",
            TypeDescriptor::Int => "Integer",
            TypeDescriptor::Long => "Long",
            TypeDescriptor::BigInteger => "BigInteger",
            TypeDescriptor::Float => "Float",
            TypeDescriptor::Double => "Double",
            TypeDescriptor::BigDecimal => "BigDecimal",
            TypeDescriptor::String => "String",
            TypeDescriptor::List => "List",
            TypeDescriptor::Map => "Map",
            TypeDescriptor::Type => "Class",
            TypeDescriptor::Object => "Object",
            TypeDescriptor::Class(class) => class.name(),
        }
    }

    /// Names of the supertypes of this type, nearest first.
    ///
    /// Every type except `Object` itself ends with `Object`.
    pub fn supertypes(&self) -> SmallVec<[&str; 4]> {
        let mut names: SmallVec<[&str; 4]> = SmallVec::new();
        match self {
            TypeDescriptor::Object => return names,
            TypeDescriptor::Boolean | TypeDescriptor::Char => names.push("Comparable"),
            TypeDescriptor::String => {
                names.push("CharSequence");
                names.push("Comparable");
            }
            TypeDescriptor::List => {
                names.push("Collection");
                names.push("Iterable");
            }
            TypeDescriptor::Map | TypeDescriptor::Type => {}
            TypeDescriptor::Class(class) => {
                names.extend(class.supertypes().iter().map(EcoString::as_str));
            }
            _ if self.is_numeric() => {
                names.extend_from_slice(NUMBER_SUPERTYPES);
                return names;
            }
            _ => {}
        }
        if !names.contains(&"Object") {
            names.push("Object");
        }
        names
    }

    /// True if a value of this type can be used where `target` is declared.
    pub fn is_assignable_to(&self, target: &TypeDescriptor) -> bool {
        self.supertype_distance(target).is_some()
    }

    /// 0 for the same type, `1 + index` for a declared supertype.
    pub fn supertype_distance(&self, target: &TypeDescriptor) -> Option<u32> {
        if self.name() == target.name() {
            return Some(0);
        }
        self.supertypes()
            .iter()
            .position(|name| *name == target.name())
            .map(|index| index as u32 + 1)
    }

    pub fn numeric_kind(&self) -> Option<NumericKind> {
        Some(match self {
            TypeDescriptor::Byte => NumericKind::Byte,
            TypeDescriptor::Short => NumericKind::Short,
            TypeDescriptor::Int => NumericKind::Int,
            TypeDescriptor::Long => NumericKind::Long,
            TypeDescriptor::BigInteger => NumericKind::BigInteger,
            TypeDescriptor::Float => NumericKind::Float,
            TypeDescriptor::Double => NumericKind::Double,
            TypeDescriptor::BigDecimal => NumericKind::BigDecimal,
            _ => return None,
        })
    }

    pub fn is_numeric(&self) -> bool {
        self.numeric_kind().is_some()
    }

    /// Whether compiled code may reference this type directly.
    pub fn is_public(&self) -> bool {
        match self {
            TypeDescriptor::Class(class) => class.is_public(),
            _ => true,
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
