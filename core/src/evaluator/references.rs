//! Property, method, constructor and function references.
//!
//! Each reference caches what it resolved on the node. A cached entry is only
//! trusted while the target and argument types are unchanged and the strategy
//! that produced it is still registered on the context. A cached accessor or
//! executor that fails is forgotten and resolution runs once more before the
//! failure is reported.

use std::sync::Arc;

use tracing::trace;

use super::{CallError, EvalError, EvalErrorKind};
use crate::ast::{
    CachedAccessor, CachedConstructor, CachedFunction, CachedMethod, ConstructorReference,
    FunctionReference, MethodReference, Node, PropertyReference,
};
use crate::context::matching::{self, describe_types};
use crate::context::{EvaluationContext, MethodExecutor, accessors_for, is_registered};
use crate::state::ExpressionState;
use crate::types::TypeDescriptor;
use crate::values::{TypedValue, Value};

pub(crate) fn read_property(
    property: &PropertyReference,
    state: &mut ExpressionState<'_>,
    target: &TypedValue,
    grows: bool,
) -> Result<TypedValue, EvalError> {
    if target.is_null() {
        if property.null_safe {
            return Ok(TypedValue::NULL);
        }
        return Err(EvalErrorKind::PropertyOrFieldNotReadableOnNull {
            name: property.name.clone(),
        }
        .into());
    }

    let value = read_cached(property, state.context(), &target.value)?;
    if grows && value.is_null() && state.options().auto_grow_null_references {
        if let Some(grown) = auto_grow(property, state.context(), &target.value)? {
            return Ok(grown);
        }
    }
    Ok(value)
}

fn read_cached(
    property: &PropertyReference,
    context: &dyn EvaluationContext,
    target: &Value,
) -> Result<TypedValue, EvalError> {
    let target_type = target.type_descriptor();
    if let Some(cached) = property.read_cache.load() {
        if cached.target_type == target_type
            && is_registered(context.property_accessors(), &cached.accessor)
        {
            match cached.accessor.read(context, target, &property.name) {
                Ok(value) => return Ok(value),
                Err(error) => {
                    trace!(name = %property.name, %error, "Cached accessor failed, resolving again");
                    property.read_cache.clear();
                }
            }
        }
    }

    for accessor in accessors_for(context.property_accessors(), target_type.as_ref()) {
        if accessor.can_read(context, target, &property.name) {
            let value = accessor.read(context, target, &property.name)?;
            property.read_cache.store(CachedAccessor {
                accessor,
                target_type,
            });
            return Ok(value);
        }
    }
    Err(EvalErrorKind::PropertyOrFieldNotReadable {
        name: property.name.clone(),
        type_name: target.type_name(),
    }
    .into())
}

/// Instantiate a missing intermediate value in place.
///
/// `Ok(None)` leaves the null alone: no accessor can write the property, or
/// its declared type is unknown.
fn auto_grow(
    property: &PropertyReference,
    context: &dyn EvaluationContext,
    target: &Value,
) -> Result<Option<TypedValue>, EvalError> {
    let name = property.name.as_str();
    let writer = accessors_for(context.property_accessors(), target.type_descriptor().as_ref())
        .into_iter()
        .find(|accessor| accessor.can_write(context, target, name));
    let Some(writer) = writer else {
        return Ok(None);
    };
    let Some(ty) = writer.property_type(context, target, name) else {
        return Ok(None);
    };

    let created = match &ty {
        TypeDescriptor::List => Value::list(Vec::new()),
        TypeDescriptor::Map => Value::map(Vec::new()),
        _ => instantiate(context, &ty)
            .ok_or_else(|| EvalErrorKind::UnableToAutoGrow {
                name: property.name.clone(),
                type_name: ty.name().into(),
            })?,
    };
    trace!(name, ty = %ty, "Auto-growing null reference");
    writer.write(context, target, name, created.clone())?;
    Ok(Some(TypedValue::with_type(created, ty)))
}

/// Call a no-argument constructor of `ty`, if one resolves.
fn instantiate(context: &dyn EvaluationContext, ty: &TypeDescriptor) -> Option<Value> {
    context.constructor_resolvers().iter().find_map(|resolver| {
        let executor = resolver.resolve(context, ty.name(), &[]).ok()??;
        executor.execute(context, Vec::new()).ok().map(TypedValue::into_value)
    })
}

pub(crate) fn write_property(
    property: &PropertyReference,
    state: &mut ExpressionState<'_>,
    target: &TypedValue,
    value: Value,
) -> Result<(), EvalError> {
    if target.is_null() {
        return Err(EvalErrorKind::PropertyOrFieldNotWritableOnNull {
            name: property.name.clone(),
        }
        .into());
    }
    let context = state.context();
    let target = &target.value;
    let target_type = target.type_descriptor();

    if let Some(cached) = property.write_cache.load() {
        if cached.target_type == target_type
            && is_registered(context.property_accessors(), &cached.accessor)
        {
            match cached.accessor.write(context, target, &property.name, value.clone()) {
                Ok(()) => return Ok(()),
                Err(error) => {
                    trace!(name = %property.name, %error, "Cached accessor failed, resolving again");
                    property.write_cache.clear();
                }
            }
        }
    }

    for accessor in accessors_for(context.property_accessors(), target_type.as_ref()) {
        if accessor.can_write(context, target, &property.name) {
            accessor.write(context, target, &property.name, value)?;
            property.write_cache.store(CachedAccessor {
                accessor,
                target_type,
            });
            return Ok(());
        }
    }
    Err(EvalErrorKind::PropertyOrFieldNotWritable {
        name: property.name.clone(),
        type_name: target.type_name(),
    }
    .into())
}

pub(crate) fn can_write(context: &dyn EvaluationContext, target: &Value, name: &str) -> bool {
    !target.is_null()
        && accessors_for(context.property_accessors(), target.type_descriptor().as_ref())
            .iter()
            .any(|accessor| accessor.can_write(context, target, name))
}

/// Read through the accessors without touching any node cache.
pub(crate) fn read_uncached(
    context: &dyn EvaluationContext,
    target: &Value,
    name: &str,
) -> Result<TypedValue, EvalError> {
    for accessor in accessors_for(context.property_accessors(), target.type_descriptor().as_ref()) {
        if accessor.can_read(context, target, name) {
            return accessor.read(context, target, name);
        }
    }
    Err(EvalErrorKind::PropertyOrFieldNotReadable {
        name: name.into(),
        type_name: target.type_name(),
    }
    .into())
}

pub(crate) fn write_uncached(
    context: &dyn EvaluationContext,
    target: &Value,
    name: &str,
    value: Value,
) -> Result<(), EvalError> {
    for accessor in accessors_for(context.property_accessors(), target.type_descriptor().as_ref()) {
        if accessor.can_write(context, target, name) {
            return accessor.write(context, target, name, value);
        }
    }
    Err(EvalErrorKind::PropertyOrFieldNotWritable {
        name: name.into(),
        type_name: target.type_name(),
    }
    .into())
}

/// Evaluate call arguments against the current scope root.
pub(crate) fn evaluate_arguments(
    args: &[Node],
    state: &mut ExpressionState<'_>,
) -> Result<Vec<Value>, EvalError> {
    let scope_root = state.scope_root_object().clone();
    state.push_active_context_object(scope_root);
    let result = args
        .iter()
        .map(|arg| arg.get_value(state))
        .collect::<Result<Vec<_>, _>>();
    state.pop_active_context_object();
    result
}

fn types_of(args: &[Value]) -> Vec<Option<TypeDescriptor>> {
    args.iter().map(Value::type_descriptor).collect()
}

/// The type a method cache is keyed on. Static calls key on the type itself.
pub(crate) fn method_target_type(target: &Value) -> Option<TypeDescriptor> {
    match target {
        Value::Type(ty) => Some(ty.clone()),
        other => other.type_descriptor(),
    }
}

pub(crate) fn invoke_method(
    method: &MethodReference,
    state: &mut ExpressionState<'_>,
    target: &TypedValue,
) -> Result<TypedValue, EvalError> {
    if target.is_null() {
        if method.null_safe {
            return Ok(TypedValue::NULL);
        }
        return Err(EvalErrorKind::MethodCallOnNull {
            name: method.name.clone(),
        }
        .into());
    }
    let args = evaluate_arguments(&method.args, state)?;
    call_method(method, state.context(), &target.value, args)
}

/// Invoke `method` on `target` with evaluated arguments.
pub(crate) fn call_method(
    method: &MethodReference,
    context: &dyn EvaluationContext,
    target: &Value,
    args: Vec<Value>,
) -> Result<TypedValue, EvalError> {
    let arg_types = types_of(&args);
    let target_type = method_target_type(target);

    if let Some(cached) = method.cache.load() {
        if cached.target_type == target_type
            && cached.arg_types == arg_types
            && is_registered(context.method_resolvers(), &cached.resolver)
        {
            match cached.executor.execute(context, target, args.clone()) {
                Err(CallError::Unavailable(reason)) => {
                    trace!(name = %method.name, %reason, "Cached method unusable, resolving again");
                    method.cache.clear();
                }
                result => return result.map_err(|e| e.into_eval_error(&method.name)),
            }
        }
    }

    let (resolver, executor) = context
        .method_resolvers()
        .iter()
        .find_map(|resolver| {
            resolver
                .resolve(context, target, &method.name, &arg_types)
                .map(|found| found.map(|executor| (resolver.clone(), executor)))
                .transpose()
        })
        .transpose()?
        .ok_or_else(|| EvalErrorKind::MethodNotFound {
            name: method.name.clone(),
            type_name: target_type
                .as_ref()
                .map_or_else(|| target.type_name(), |ty| ty.name().into()),
            arg_types: describe_types(&arg_types),
        })?;

    trace!(name = %method.name, executor = ?executor, "Resolved method");
    method.cache.store(CachedMethod {
        resolver,
        executor: executor.clone(),
        target_type,
        arg_types,
    });
    executor
        .execute(context, target, args)
        .map_err(|e| e.into_eval_error(&method.name))
}

pub(crate) fn invoke_constructor(
    constructor: &ConstructorReference,
    state: &mut ExpressionState<'_>,
) -> Result<TypedValue, EvalError> {
    let args = evaluate_arguments(&constructor.args, state)?;
    let context = state.context();
    let arg_types = types_of(&args);
    let name = constructor.type_name.as_str();

    if let Some(cached) = constructor.cache.load() {
        if cached.arg_types == arg_types
            && is_registered(context.constructor_resolvers(), &cached.resolver)
        {
            match cached.executor.execute(context, args.clone()) {
                Err(CallError::Unavailable(reason)) => {
                    trace!(name, %reason, "Cached constructor unusable, resolving again");
                    constructor.cache.clear();
                }
                result => return result.map_err(|e| e.into_eval_error(name)),
            }
        }
    }

    let (resolver, executor) = context
        .constructor_resolvers()
        .iter()
        .find_map(|resolver| {
            resolver
                .resolve(context, name, &arg_types)
                .map(|found| found.map(|executor| (resolver.clone(), executor)))
                .transpose()
        })
        .transpose()?
        .ok_or_else(|| EvalErrorKind::ConstructorNotFound {
            type_name: constructor.type_name.clone(),
            arg_types: describe_types(&arg_types),
        })?;

    constructor.cache.store(CachedConstructor {
        resolver,
        executor: executor.clone(),
        arg_types,
    });
    executor
        .execute(context, args)
        .map_err(|e| e.into_eval_error(name))
}

pub(crate) fn invoke_function(
    function: &FunctionReference,
    state: &mut ExpressionState<'_>,
) -> Result<TypedValue, EvalError> {
    let args = evaluate_arguments(&function.args, state)?;
    let context = state.context();
    let arg_types = types_of(&args);
    let candidates = context.lookup_function(&function.name);

    let cached = function.cache.load().filter(|cached| {
        cached.arg_types == arg_types && is_registered(candidates, &cached.function)
    });
    let chosen = match cached {
        Some(cached) => cached.function.clone(),
        None => {
            let chosen = matching::select(candidates.iter(), &arg_types, context.type_converter())
                .map_err(|matching::Ambiguous| EvalErrorKind::AmbiguousMethod {
                    name: function.name.clone(),
                    arg_types: describe_types(&arg_types),
                })?
                .cloned()
                .ok_or_else(|| EvalErrorKind::FunctionNotFound {
                    name: function.name.clone(),
                    arg_types: describe_types(&arg_types),
                })?;
            function.cache.store(CachedFunction {
                function: chosen.clone(),
                arg_types,
            });
            chosen
        }
    };
    chosen
        .execute(context, &Value::Null, args)
        .map_err(|e| e.into_eval_error(&function.name))
}

/// The resolution a method node cached, if compiled code may call it.
pub(crate) fn compilable_method(method: &MethodReference) -> Option<Arc<CachedMethod>> {
    method.cache.load().filter(|cached| {
        cached.executor.is_compilable() && public_or_unknown(cached.executor.declaring_type())
    })
}

pub(crate) fn compilable_constructor(
    constructor: &ConstructorReference,
) -> Option<Arc<CachedConstructor>> {
    constructor.cache.load().filter(|cached| {
        cached.executor.is_compilable() && public_or_unknown(cached.executor.declaring_type())
    })
}

fn public_or_unknown(ty: Option<TypeDescriptor>) -> bool {
    ty.map_or(true, |ty| ty.is_public())
}

