use super::StandardTypeConverter;
use super::matching::{MatchKind, Signature, describe_types, match_signature, select};
use crate::types::{ClassDescriptor, TypeDescriptor};

#[derive(Debug)]
struct Sig {
    label: &'static str,
    params: Vec<TypeDescriptor>,
    varargs: bool,
}

impl Signature for Sig {
    fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    fn is_varargs(&self) -> bool {
        self.varargs
    }
}

fn sig(label: &'static str, params: Vec<TypeDescriptor>) -> Sig {
    Sig {
        label,
        params,
        varargs: false,
    }
}

fn varargs(label: &'static str, params: Vec<TypeDescriptor>) -> Sig {
    Sig {
        label,
        params,
        varargs: true,
    }
}

fn pick<'a>(candidates: &'a [Sig], args: &[Option<TypeDescriptor>]) -> Option<&'a str> {
    select(candidates.iter(), args, &StandardTypeConverter)
        .unwrap()
        .map(|s| s.label)
}

#[test]
fn test_exact_match_wins_regardless_of_order() {
    use TypeDescriptor::*;
    let candidates = [sig("double", vec![Double]), sig("int", vec![Int])];
    assert_eq!(pick(&candidates, &[Some(Int)]), Some("int"));
}

#[test]
fn test_least_widening_wins() {
    use TypeDescriptor::*;
    let candidates = [
        sig("double", vec![Double]),
        sig("object", vec![Object]),
        sig("long", vec![Long]),
    ];
    assert_eq!(pick(&candidates, &[Some(Int)]), Some("long"));
    assert_eq!(pick(&candidates, &[Some(Float)]), Some("double"));
    assert_eq!(pick(&candidates, &[Some(String)]), Some("object"));
}

#[test]
fn test_fixed_arity_preferred_over_varargs_at_equal_distance() {
    use TypeDescriptor::*;
    let candidates = [varargs("varargs", vec![Long]), sig("fixed", vec![Long])];
    assert_eq!(pick(&candidates, &[Some(Int)]), Some("fixed"));
}

#[test]
fn test_varargs_accepts_empty_and_long_tails() {
    use TypeDescriptor::*;
    let candidates = [varargs("join", vec![String, String])];
    assert_eq!(pick(&candidates, &[Some(String)]), Some("join"));
    assert_eq!(
        pick(&candidates, &[Some(String), Some(String), Some(String)]),
        Some("join")
    );
    let m = match_signature(&candidates[0], &[Some(String), Some(String)], &StandardTypeConverter)
        .unwrap();
    assert_eq!(m.kind, MatchKind::Close);
}

#[test]
fn test_supertype_distance_ranks_nearer_type_first() {
    let savings = ClassDescriptor::new("Savings")
        .with_supertypes(["Account", "Asset"])
        .into_type();
    let candidates = [
        sig("asset", vec![TypeDescriptor::named("Asset")]),
        sig("account", vec![TypeDescriptor::named("Account")]),
    ];
    assert_eq!(pick(&candidates, &[Some(savings)]), Some("account"));
}

#[test]
fn test_null_argument_matches_any_parameter() {
    use TypeDescriptor::*;
    let candidates = [sig("string", vec![String])];
    assert_eq!(pick(&candidates, &[None]), Some("string"));
}

#[test]
fn test_single_conversion_match_is_used() {
    use TypeDescriptor::*;
    let candidates = [sig("int", vec![Int])];
    assert_eq!(pick(&candidates, &[Some(String)]), Some("int"));
}

#[test]
fn test_several_conversion_matches_are_ambiguous() {
    use TypeDescriptor::*;
    let candidates = [sig("int", vec![Int]), sig("bool", vec![Boolean])];
    let result = select(candidates.iter(), &[Some(String)], &StandardTypeConverter);
    assert!(result.is_err());
}

#[test]
fn test_arity_mismatch_is_no_match() {
    use TypeDescriptor::*;
    let candidates = [sig("two", vec![Int, Int])];
    assert_eq!(pick(&candidates, &[Some(Int)]), None);
}

#[test]
fn test_describe_types() {
    use TypeDescriptor::*;
    assert_eq!(describe_types(&[Some(Int), None, Some(String)]).as_str(), "Integer, null, String");
    assert!(describe_types(&[]).is_empty());
}
