use super::*;

#[test]
fn test_builtin_names_resolve() {
    assert_eq!(TypeDescriptor::builtin("Integer"), Some(TypeDescriptor::Int));
    assert_eq!(TypeDescriptor::builtin("int"), Some(TypeDescriptor::Int));
    assert_eq!(TypeDescriptor::builtin("java.lang.String"), Some(TypeDescriptor::String));
    assert_eq!(TypeDescriptor::builtin("java.util.ArrayList"), Some(TypeDescriptor::List));
    assert_eq!(TypeDescriptor::builtin("java.math.BigDecimal"), Some(TypeDescriptor::BigDecimal));
    assert_eq!(TypeDescriptor::builtin("Account"), None);
}

#[test]
fn test_numbers_are_assignable_to_number() {
    let number = TypeDescriptor::named("Number");
    assert!(TypeDescriptor::Int.is_assignable_to(&number));
    assert!(TypeDescriptor::Double.is_assignable_to(&number));
    assert!(!TypeDescriptor::String.is_assignable_to(&number));
}

#[test]
fn test_everything_is_assignable_to_object() {
    for ty in [
        TypeDescriptor::Int,
        TypeDescriptor::String,
        TypeDescriptor::List,
        TypeDescriptor::Map,
        TypeDescriptor::named("Account"),
    ] {
        assert!(ty.is_assignable_to(&TypeDescriptor::Object), "{ty}");
    }
}

#[test]
fn test_class_supertype_distance() {
    let savings = ClassDescriptor::new("SavingsAccount")
        .with_supertypes(["Account", "Product"])
        .into_type();
    assert_eq!(savings.supertype_distance(&TypeDescriptor::named("SavingsAccount")), Some(0));
    assert_eq!(savings.supertype_distance(&TypeDescriptor::named("Account")), Some(1));
    assert_eq!(savings.supertype_distance(&TypeDescriptor::named("Product")), Some(2));
    assert_eq!(savings.supertype_distance(&TypeDescriptor::Object), Some(3));
    assert_eq!(savings.supertype_distance(&TypeDescriptor::String), None);
}

#[test]
fn test_non_public_class() {
    let hidden = ClassDescriptor::new("Hidden").non_public().into_type();
    assert!(!hidden.is_public());
    assert!(TypeDescriptor::Int.is_public());
}
