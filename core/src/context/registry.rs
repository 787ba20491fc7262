//! Native callables and the registry-backed resolvers that find them.

use core::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use ecow::EcoString;
use hashbrown::HashMap;
use tracing::trace;

use super::matching::{self, describe_types};
use super::{
    ConstructorExecutor, ConstructorResolver, EvaluationContext, MethodExecutor, MethodResolver,
    builtins,
};
use crate::evaluator::{CallError, EvalError, EvalErrorKind};
use crate::types::TypeDescriptor;
use crate::values::{ListRef, TypedValue, Value};

pub use super::matching::Signature;

/// Body of a native method: `(context, target, converted arguments)`.
pub type NativeMethod = dyn Fn(&dyn EvaluationContext, &Value, &[Value]) -> Result<TypedValue, CallError>
    + Send
    + Sync;

/// Body of a native constructor: `(context, converted arguments)`.
pub type NativeConstructor =
    dyn Fn(&dyn EvaluationContext, &[Value]) -> Result<TypedValue, CallError> + Send + Sync;

/// A method implemented by the embedder (or built in).
///
/// Arguments are converted to the declared parameter types before the body
/// runs; a varargs tail arrives packed into a single list.
pub struct MethodDescriptor {
    name: EcoString,
    declaring_type: TypeDescriptor,
    params: Vec<TypeDescriptor>,
    varargs: bool,
    is_static: bool,
    compilable: bool,
    body: Arc<NativeMethod>,
}

impl MethodDescriptor {
    pub fn new<F>(
        declaring_type: TypeDescriptor,
        name: impl Into<EcoString>,
        params: Vec<TypeDescriptor>,
        body: F,
    ) -> Self
    where
        F: Fn(&dyn EvaluationContext, &Value, &[Value]) -> Result<TypedValue, CallError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            declaring_type,
            params,
            varargs: false,
            is_static: false,
            compilable: true,
            body: Arc::new(body),
        }
    }

    /// A free function for `#name(...)`; the body never sees a target.
    pub fn function<F>(name: impl Into<EcoString>, params: Vec<TypeDescriptor>, body: F) -> Self
    where
        F: Fn(&dyn EvaluationContext, &[Value]) -> Result<TypedValue, CallError>
            + Send
            + Sync
            + 'static,
    {
        Self::new(TypeDescriptor::Object, name, params, move |ctx, _, args| body(ctx, args))
            .into_static()
    }

    /// The last parameter accepts any number of trailing arguments.
    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    /// Called on the type (`T(Math).max(1, 2)`) rather than on an instance.
    pub fn into_static(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Keep compiled code from calling this method.
    pub fn not_compilable(mut self) -> Self {
        self.compilable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn declared_by(&self) -> &TypeDescriptor {
        &self.declaring_type
    }
}

impl Signature for MethodDescriptor {
    fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    fn is_varargs(&self) -> bool {
        self.varargs
    }
}

impl MethodExecutor for MethodDescriptor {
    fn execute(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        args: Vec<Value>,
    ) -> Result<TypedValue, CallError> {
        let args = convert_arguments(context, &self.params, self.varargs, args)?;
        (self.body)(context, target, &args)
    }

    fn is_compilable(&self) -> bool {
        self.compilable
    }

    fn declaring_type(&self) -> Option<TypeDescriptor> {
        Some(self.declaring_type.clone())
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}(", self.declaring_type, self.name)?;
        for (index, param) in self.params.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        if self.varargs {
            f.write_str("...")?;
        }
        f.write_str(")")
    }
}

/// A constructor implemented by the embedder (or built in).
pub struct ConstructorDescriptor {
    declaring_type: TypeDescriptor,
    params: Vec<TypeDescriptor>,
    varargs: bool,
    compilable: bool,
    body: Arc<NativeConstructor>,
}

impl ConstructorDescriptor {
    pub fn new<F>(declaring_type: TypeDescriptor, params: Vec<TypeDescriptor>, body: F) -> Self
    where
        F: Fn(&dyn EvaluationContext, &[Value]) -> Result<TypedValue, CallError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            declaring_type,
            params,
            varargs: false,
            compilable: true,
            body: Arc::new(body),
        }
    }

    pub fn varargs(mut self) -> Self {
        self.varargs = true;
        self
    }

    pub fn not_compilable(mut self) -> Self {
        self.compilable = false;
        self
    }

    pub fn declared_by(&self) -> &TypeDescriptor {
        &self.declaring_type
    }
}

impl Signature for ConstructorDescriptor {
    fn params(&self) -> &[TypeDescriptor] {
        &self.params
    }

    fn is_varargs(&self) -> bool {
        self.varargs
    }
}

impl ConstructorExecutor for ConstructorDescriptor {
    fn execute(
        &self,
        context: &dyn EvaluationContext,
        args: Vec<Value>,
    ) -> Result<TypedValue, CallError> {
        let args = convert_arguments(context, &self.params, self.varargs, args)?;
        (self.body)(context, &args)
    }

    fn is_compilable(&self) -> bool {
        self.compilable
    }

    fn declaring_type(&self) -> Option<TypeDescriptor> {
        Some(self.declaring_type.clone())
    }
}

impl fmt::Debug for ConstructorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "new {}({} params)", self.declaring_type, self.params.len())
    }
}

/// Convert `args` to `params`, packing a varargs tail into one list.
pub(crate) fn convert_arguments(
    context: &dyn EvaluationContext,
    params: &[TypeDescriptor],
    varargs: bool,
    args: Vec<Value>,
) -> Result<Vec<Value>, EvalError> {
    let Some(last) = params.len().checked_sub(1) else {
        return Ok(args);
    };
    let mut converted = Vec::with_capacity(params.len());
    let mut tail = Vec::new();
    for (index, arg) in args.into_iter().enumerate() {
        let param = &params[index.min(last)];
        let value = convert_argument(context, arg, param)?;
        if varargs && index >= last {
            tail.push(value);
        } else {
            converted.push(value);
        }
    }
    if varargs {
        converted.push(Value::List(ListRef::new(tail)));
    }
    Ok(converted)
}

fn convert_argument(
    context: &dyn EvaluationContext,
    arg: Value,
    param: &TypeDescriptor,
) -> Result<Value, EvalError> {
    if arg.is_null() || *param == TypeDescriptor::Object {
        return Ok(arg);
    }
    let from = arg.type_descriptor();
    if from.as_ref().is_some_and(|ty| ty.is_assignable_to(param)) {
        return Ok(arg);
    }
    if let Some(number) = param.numeric_kind().and_then(|kind| arg.to_numeric(kind)) {
        return Ok(number);
    }
    context
        .type_converter()
        .convert_value(&arg, from.as_ref(), param)
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// Resolves methods from per-type tables.
///
/// Instance methods are looked up on the target's type and then on each of
/// its supertypes. When the target is a type reference, its static methods
/// are used instead.
#[derive(Default)]
pub struct RegistryMethodResolver {
    methods: RwLock<HashMap<EcoString, Vec<Arc<MethodDescriptor>>>>,
}

impl RegistryMethodResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver preloaded with the `String`, `List`, `Map`, `Object` and
    /// `Math` methods.
    pub fn with_builtins() -> Self {
        let resolver = Self::new();
        for method in builtins::METHODS.iter() {
            resolver.register_arc(method.clone());
        }
        resolver
    }

    pub fn register(&self, method: MethodDescriptor) -> Arc<MethodDescriptor> {
        let method = Arc::new(method);
        self.register_arc(method.clone());
        method
    }

    pub fn register_arc(&self, method: Arc<MethodDescriptor>) {
        let owner = EcoString::from(method.declaring_type.name());
        write(&self.methods).entry(owner).or_default().push(method);
    }

    fn candidates(&self, target: &Value, name: &str) -> Vec<Arc<MethodDescriptor>> {
        let methods = read(&self.methods);
        let mut found = Vec::new();
        if let Value::Type(ty) = target {
            collect_named(&mut found, &methods, ty.name(), name, true);
            return found;
        }
        let Some(ty) = target.type_descriptor() else {
            return found;
        };
        collect_named(&mut found, &methods, ty.name(), name, false);
        for supertype in ty.supertypes() {
            collect_named(&mut found, &methods, supertype, name, false);
        }
        found
    }
}

fn collect_named(
    found: &mut Vec<Arc<MethodDescriptor>>,
    methods: &HashMap<EcoString, Vec<Arc<MethodDescriptor>>>,
    owner: &str,
    name: &str,
    want_static: bool,
) {
    if let Some(declared) = methods.get(owner) {
        found.extend(
            declared
                .iter()
                .filter(|m| m.name.as_str() == name && m.is_static == want_static)
                .cloned(),
        );
    }
}

impl MethodResolver for RegistryMethodResolver {
    fn resolve(
        &self,
        context: &dyn EvaluationContext,
        target: &Value,
        name: &str,
        arg_types: &[Option<TypeDescriptor>],
    ) -> Result<Option<Arc<dyn MethodExecutor>>, EvalError> {
        let candidates = self.candidates(target, name);
        if candidates.is_empty() {
            return Ok(None);
        }
        trace!(name, candidates = candidates.len(), "Ranking method overloads");
        match matching::select(candidates.iter(), arg_types, context.type_converter()) {
            Ok(Some(chosen)) => Ok(Some(chosen.clone() as Arc<dyn MethodExecutor>)),
            Ok(None) => Ok(None),
            Err(matching::Ambiguous) => Err(EvalErrorKind::AmbiguousMethod {
                name: name.into(),
                arg_types: describe_types(arg_types),
            }
            .into()),
        }
    }
}

impl fmt::Debug for RegistryMethodResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let methods = read(&self.methods);
        f.debug_struct("RegistryMethodResolver")
            .field("types", &methods.len())
            .finish()
    }
}

/// Resolves constructors from per-type tables, keyed by simple type name.
#[derive(Default)]
pub struct RegistryConstructorResolver {
    constructors: RwLock<HashMap<EcoString, Vec<Arc<ConstructorDescriptor>>>>,
}

impl RegistryConstructorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// A resolver preloaded with `ArrayList`, `HashMap`, `String` and
    /// `BigDecimal` constructors.
    pub fn with_builtins() -> Self {
        let resolver = Self::new();
        for (type_name, constructor) in builtins::CONSTRUCTORS.iter() {
            write(&resolver.constructors)
                .entry(type_name.clone())
                .or_default()
                .push(constructor.clone());
        }
        resolver
    }

    /// Register a constructor under its declaring type's name.
    pub fn register(&self, constructor: ConstructorDescriptor) -> Arc<ConstructorDescriptor> {
        let constructor = Arc::new(constructor);
        let name = simple_name(constructor.declaring_type.name()).into();
        write(&self.constructors)
            .entry(name)
            .or_default()
            .push(constructor.clone());
        constructor
    }
}

fn simple_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

impl ConstructorResolver for RegistryConstructorResolver {
    fn resolve(
        &self,
        context: &dyn EvaluationContext,
        type_name: &str,
        arg_types: &[Option<TypeDescriptor>],
    ) -> Result<Option<Arc<dyn ConstructorExecutor>>, EvalError> {
        let candidates = read(&self.constructors)
            .get(simple_name(type_name))
            .cloned()
            .unwrap_or_default();
        match matching::select(candidates.iter(), arg_types, context.type_converter()) {
            Ok(Some(chosen)) => Ok(Some(chosen.clone() as Arc<dyn ConstructorExecutor>)),
            Ok(None) => Ok(None),
            Err(matching::Ambiguous) => Err(EvalErrorKind::AmbiguousConstructor {
                type_name: type_name.into(),
                arg_types: describe_types(arg_types),
            }
            .into()),
        }
    }
}

impl fmt::Debug for RegistryConstructorResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let constructors = read(&self.constructors);
        f.debug_struct("RegistryConstructorResolver")
            .field("types", &constructors.len())
            .finish()
    }
}
