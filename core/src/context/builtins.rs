//! Methods and constructors every standard context knows about.

use std::sync::Arc;

use bigdecimal::BigDecimal;
use ecow::EcoString;
use once_cell::sync::Lazy;

use super::{ConstructorDescriptor, EvaluationContext, MethodDescriptor};
use crate::evaluator::{CallError, EvalErrorKind};
use crate::types::TypeDescriptor;
use crate::values::{ListRef, MapRef, TypedValue, Value};

type Body = fn(&dyn EvaluationContext, &Value, &[Value]) -> Result<TypedValue, CallError>;

pub(crate) static METHODS: Lazy<Vec<Arc<MethodDescriptor>>> = Lazy::new(|| {
    use TypeDescriptor::{Int, Object, String};

    let string: &[(&str, Vec<TypeDescriptor>, Body)] = &[
        ("length", vec![], |_, t, _| {
            Ok(Value::Int(this_str(t)?.chars().count() as i32).into())
        }),
        ("toUpperCase", vec![], |_, t, _| {
            Ok(Value::str(this_str(t)?.to_uppercase()).into())
        }),
        ("toLowerCase", vec![], |_, t, _| {
            Ok(Value::str(this_str(t)?.to_lowercase()).into())
        }),
        ("trim", vec![], |_, t, _| Ok(Value::str(this_str(t)?.trim()).into())),
        ("isEmpty", vec![], |_, t, _| {
            Ok(Value::Bool(this_str(t)?.is_empty()).into())
        }),
        ("charAt", vec![Int], |_, t, args| {
            let s = this_str(t)?;
            let index = int_arg(args, 0)?;
            usize::try_from(index)
                .ok()
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Char(c).into())
                .ok_or_else(|| string_index_error(index, s))
        }),
        ("substring", vec![Int], |_, t, args| {
            let s = this_str(t)?;
            substring(s, int_arg(args, 0)?, s.chars().count() as i32)
        }),
        ("substring", vec![Int, Int], |_, t, args| {
            substring(this_str(t)?, int_arg(args, 0)?, int_arg(args, 1)?)
        }),
        ("concat", vec![String], |_, t, args| {
            let mut s = EcoString::from(this_str(t)?);
            s.push_str(str_arg(args, 0)?);
            Ok(Value::Str(s).into())
        }),
        ("contains", vec![String], |_, t, args| {
            Ok(Value::Bool(this_str(t)?.contains(str_arg(args, 0)?)).into())
        }),
        ("startsWith", vec![String], |_, t, args| {
            Ok(Value::Bool(this_str(t)?.starts_with(str_arg(args, 0)?)).into())
        }),
        ("endsWith", vec![String], |_, t, args| {
            Ok(Value::Bool(this_str(t)?.ends_with(str_arg(args, 0)?)).into())
        }),
        ("indexOf", vec![String], |_, t, args| {
            let s = this_str(t)?;
            let index = s
                .find(str_arg(args, 0)?)
                .map_or(-1, |byte| s[..byte].chars().count() as i32);
            Ok(Value::Int(index).into())
        }),
    ];

    let list: &[(&str, Vec<TypeDescriptor>, Body)] = &[
        ("size", vec![], |_, t, _| Ok(Value::Int(this_list(t)?.len() as i32).into())),
        ("isEmpty", vec![], |_, t, _| Ok(Value::Bool(this_list(t)?.is_empty()).into())),
        ("get", vec![Int], |_, t, args| {
            let list = this_list(t)?;
            let index = int_arg(args, 0)?;
            usize::try_from(index)
                .ok()
                .and_then(|i| list.get(i))
                .map(TypedValue::new)
                .ok_or_else(|| {
                    EvalErrorKind::IndexOutOfBounds {
                        index: index.into(),
                        size: list.len(),
                    }
                    .into()
                })
        }),
        ("contains", vec![Object], |_, t, args| {
            Ok(Value::Bool(this_list(t)?.contains(&args[0])).into())
        }),
        ("add", vec![Object], |_, t, args| {
            this_list(t)?.push(args[0].clone())?;
            Ok(Value::Bool(true).into())
        }),
    ];

    let map: &[(&str, Vec<TypeDescriptor>, Body)] = &[
        ("size", vec![], |_, t, _| Ok(Value::Int(this_map(t)?.len() as i32).into())),
        ("isEmpty", vec![], |_, t, _| Ok(Value::Bool(this_map(t)?.is_empty()).into())),
        ("get", vec![Object], |_, t, args| {
            Ok(this_map(t)?.get(&args[0]).map(TypedValue::new).unwrap_or_default())
        }),
        ("containsKey", vec![Object], |_, t, args| {
            Ok(Value::Bool(this_map(t)?.contains_key(&args[0])).into())
        }),
        ("put", vec![Object, Object], |_, t, args| {
            let previous = this_map(t)?.insert(args[0].clone(), args[1].clone())?;
            Ok(previous.map(TypedValue::new).unwrap_or_default())
        }),
    ];

    let object: &[(&str, Vec<TypeDescriptor>, Body)] = &[
        ("toString", vec![], |_, t, _| Ok(Value::str(t.to_string()).into())),
        ("equals", vec![Object], |_, t, args| Ok(Value::Bool(*t == args[0]).into())),
        ("getClass", vec![], |_, t, _| {
            Ok(t.type_descriptor().map(Value::Type).unwrap_or_default().into())
        }),
    ];

    let mut methods = Vec::new();
    for (owner, table) in [
        (TypeDescriptor::String, string),
        (TypeDescriptor::List, list),
        (TypeDescriptor::Map, map),
        (TypeDescriptor::Object, object),
    ] {
        for (name, params, body) in table {
            methods.push(Arc::new(MethodDescriptor::new(
                owner.clone(),
                *name,
                params.clone(),
                *body,
            )));
        }
    }
    methods.extend(math_methods());
    methods
});

fn math_methods() -> Vec<Arc<MethodDescriptor>> {
    use TypeDescriptor::{Double, Int, Long};

    let math = TypeDescriptor::named("Math");
    let table: [(&str, Vec<TypeDescriptor>, Body); 9] = [
        ("max", vec![Int, Int], |_, _, a| Ok(Value::Int(int_arg(a, 0)?.max(int_arg(a, 1)?)).into())),
        ("max", vec![Long, Long], |_, _, a| Ok(Value::Long(long_arg(a, 0)?.max(long_arg(a, 1)?)).into())),
        ("max", vec![Double, Double], |_, _, a| Ok(Value::Double(double_arg(a, 0)?.max(double_arg(a, 1)?)).into())),
        ("min", vec![Int, Int], |_, _, a| Ok(Value::Int(int_arg(a, 0)?.min(int_arg(a, 1)?)).into())),
        ("min", vec![Long, Long], |_, _, a| Ok(Value::Long(long_arg(a, 0)?.min(long_arg(a, 1)?)).into())),
        ("min", vec![Double, Double], |_, _, a| Ok(Value::Double(double_arg(a, 0)?.min(double_arg(a, 1)?)).into())),
        ("abs", vec![Int], |_, _, a| Ok(Value::Int(int_arg(a, 0)?.wrapping_abs()).into())),
        ("abs", vec![Long], |_, _, a| Ok(Value::Long(long_arg(a, 0)?.wrapping_abs()).into())),
        ("abs", vec![Double], |_, _, a| Ok(Value::Double(double_arg(a, 0)?.abs()).into())),
    ];
    table
        .into_iter()
        .map(|(name, params, body)| {
            Arc::new(MethodDescriptor::new(math.clone(), name, params, body).into_static())
        })
        .collect()
}

type ConstructorBody = fn(&dyn EvaluationContext, &[Value]) -> Result<TypedValue, CallError>;

/// Built-in constructors keyed by the simple type name used in `new`.
pub(crate) static CONSTRUCTORS: Lazy<Vec<(EcoString, Arc<ConstructorDescriptor>)>> =
    Lazy::new(|| {
        use TypeDescriptor::{List, Map, String};

        let table: [(&str, TypeDescriptor, Vec<TypeDescriptor>, ConstructorBody); 7] = [
            ("ArrayList", List, vec![], |_, _| Ok(Value::list(Vec::new()).into())),
            ("ArrayList", List, vec![List], |_, args| {
                let items = args[0].as_list().map(ListRef::snapshot).unwrap_or_default();
                Ok(Value::list(items).into())
            }),
            ("HashMap", Map, vec![], |_, _| Ok(Value::map(Vec::new()).into())),
            ("HashMap", Map, vec![Map], |_, args| {
                let entries = args[0].as_map().map(MapRef::entries).unwrap_or_default();
                Ok(Value::map(entries).into())
            }),
            ("String", String, vec![], |_, _| Ok(Value::str("").into())),
            ("String", String, vec![String], |_, args| Ok(args[0].clone().into())),
            ("BigDecimal", TypeDescriptor::BigDecimal, vec![String], |_, args| {
                let text = str_arg(args, 0)?;
                text.trim()
                    .parse::<BigDecimal>()
                    .map(|d| Value::Decimal(d).into())
                    .map_err(CallError::raised)
            }),
        ];
        table
            .into_iter()
            .map(|(name, ty, params, body)| {
                (name.into(), Arc::new(ConstructorDescriptor::new(ty, params, body)))
            })
            .collect()
    });

fn this_str(target: &Value) -> Result<&str, CallError> {
    target.as_str().ok_or_else(|| wrong_target("String", target))
}

fn this_list(target: &Value) -> Result<&ListRef, CallError> {
    target.as_list().ok_or_else(|| wrong_target("List", target))
}

fn this_map(target: &Value) -> Result<&MapRef, CallError> {
    target.as_map().ok_or_else(|| wrong_target("Map", target))
}

fn wrong_target(expected: &str, target: &Value) -> CallError {
    CallError::Unavailable(format!("expected a {expected} target, got {}", target.type_name()).into())
}

fn int_arg(args: &[Value], index: usize) -> Result<i32, CallError> {
    args.get(index)
        .and_then(Value::to_i32)
        .ok_or_else(|| invalid_argument(args, index))
}

fn long_arg(args: &[Value], index: usize) -> Result<i64, CallError> {
    args.get(index)
        .and_then(Value::to_i64)
        .ok_or_else(|| invalid_argument(args, index))
}

fn double_arg(args: &[Value], index: usize) -> Result<f64, CallError> {
    args.get(index)
        .and_then(Value::to_f64)
        .ok_or_else(|| invalid_argument(args, index))
}

fn str_arg(args: &[Value], index: usize) -> Result<&str, CallError> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| invalid_argument(args, index))
}

fn invalid_argument(args: &[Value], index: usize) -> CallError {
    let found = args.get(index).map_or_else(|| "nothing".into(), Value::type_name);
    EvalErrorKind::InvalidArgument {
        message: format!("argument {index} cannot be {found}").into(),
    }
    .into()
}

fn substring(s: &str, begin: i32, end: i32) -> Result<TypedValue, CallError> {
    let len = s.chars().count() as i32;
    if begin < 0 || end > len || begin > end {
        return Err(CallError::raised(format!(
            "begin {begin}, end {end}, length {len}"
        )));
    }
    let slice: String = s.chars().skip(begin as usize).take((end - begin) as usize).collect();
    Ok(Value::str(slice).into())
}

fn string_index_error(index: i32, s: &str) -> CallError {
    CallError::raised(format!(
        "index {index} out of bounds for length {}",
        s.chars().count()
    ))
}
