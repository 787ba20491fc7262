use std::sync::{Arc, PoisonError, RwLock};

use ecow::EcoString;
use hashbrown::HashMap;

use super::{
    ConstructorResolver, EvaluationContext, MethodDescriptor, MethodResolver, ObjectFieldAccessor,
    OperatorOverloader, PropertyAccessor, RegistryConstructorResolver, RegistryMethodResolver,
    StandardOperatorOverloader, StandardTypeComparator, StandardTypeConverter, StandardTypeLocator,
    TypeComparator, TypeConverter, TypeLocator,
};
use crate::values::{TypedValue, Value};

/// A ready-to-use [`EvaluationContext`].
///
/// Out of the box it reads host object fields, knows the built-in methods and
/// constructors, and uses the standard converter, comparator, overloader and
/// locator. Strategies are replaced or extended with the `with_*`/`add_*`
/// methods before the context is shared.
///
/// ```
/// use quill_core::context::{MapAccessor, StandardEvaluationContext};
/// use quill_core::values::Value;
///
/// let context = StandardEvaluationContext::new()
///     .with_root(Value::map(vec![(Value::str("name"), Value::str("quill"))]))
///     .add_property_accessor(MapAccessor);
/// # let _ = context;
/// ```
pub struct StandardEvaluationContext {
    root: TypedValue,
    variables: RwLock<HashMap<EcoString, TypedValue>>,
    property_accessors: Vec<Arc<dyn PropertyAccessor>>,
    method_resolvers: Vec<Arc<dyn MethodResolver>>,
    constructor_resolvers: Vec<Arc<dyn ConstructorResolver>>,
    functions: HashMap<EcoString, Vec<Arc<MethodDescriptor>>>,
    type_converter: Box<dyn TypeConverter>,
    type_comparator: Box<dyn TypeComparator>,
    operator_overloader: Box<dyn OperatorOverloader>,
    type_locator: Box<dyn TypeLocator>,
}

impl Default for StandardEvaluationContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardEvaluationContext {
    pub fn new() -> Self {
        Self {
            root: TypedValue::NULL,
            variables: RwLock::new(HashMap::new()),
            property_accessors: vec![Arc::new(ObjectFieldAccessor)],
            method_resolvers: vec![Arc::new(RegistryMethodResolver::with_builtins())],
            constructor_resolvers: vec![Arc::new(RegistryConstructorResolver::with_builtins())],
            functions: HashMap::new(),
            type_converter: Box::new(StandardTypeConverter),
            type_comparator: Box::new(StandardTypeComparator),
            operator_overloader: Box::new(StandardOperatorOverloader),
            type_locator: Box::new(StandardTypeLocator::new()),
        }
    }

    pub fn with_root(mut self, root: impl Into<Value>) -> Self {
        self.root = TypedValue::new(root.into());
        self
    }

    pub fn with_typed_root(mut self, root: TypedValue) -> Self {
        self.root = root;
        self
    }

    pub fn with_variable(self, name: &str, value: impl Into<Value>) -> Self {
        self.set_variable(name, TypedValue::new(value.into()));
        self
    }

    pub fn add_property_accessor(mut self, accessor: impl PropertyAccessor + 'static) -> Self {
        self.property_accessors.push(Arc::new(accessor));
        self
    }

    /// Replace the accessor list; an empty list makes every property
    /// unreadable.
    pub fn with_property_accessors(mut self, accessors: Vec<Arc<dyn PropertyAccessor>>) -> Self {
        self.property_accessors = accessors;
        self
    }

    pub fn add_method_resolver(mut self, resolver: impl MethodResolver + 'static) -> Self {
        self.method_resolvers.push(Arc::new(resolver));
        self
    }

    pub fn with_method_resolvers(mut self, resolvers: Vec<Arc<dyn MethodResolver>>) -> Self {
        self.method_resolvers = resolvers;
        self
    }

    pub fn add_constructor_resolver(mut self, resolver: impl ConstructorResolver + 'static) -> Self {
        self.constructor_resolvers.push(Arc::new(resolver));
        self
    }

    pub fn with_constructor_resolvers(
        mut self,
        resolvers: Vec<Arc<dyn ConstructorResolver>>,
    ) -> Self {
        self.constructor_resolvers = resolvers;
        self
    }

    /// Register an overload of `#name(...)`.
    pub fn register_function(mut self, function: MethodDescriptor) -> Self {
        let name = EcoString::from(function.name());
        self.functions
            .entry(name)
            .or_default()
            .push(Arc::new(function));
        self
    }

    pub fn with_type_converter(mut self, converter: impl TypeConverter + 'static) -> Self {
        self.type_converter = Box::new(converter);
        self
    }

    pub fn with_type_comparator(mut self, comparator: impl TypeComparator + 'static) -> Self {
        self.type_comparator = Box::new(comparator);
        self
    }

    pub fn with_operator_overloader(mut self, overloader: impl OperatorOverloader + 'static) -> Self {
        self.operator_overloader = Box::new(overloader);
        self
    }

    pub fn with_type_locator(mut self, locator: impl TypeLocator + 'static) -> Self {
        self.type_locator = Box::new(locator);
        self
    }

    /// Remove a registered accessor by identity. Cached references to it are
    /// dropped by the nodes on their next evaluation.
    pub fn remove_property_accessor(&mut self, accessor: &Arc<dyn PropertyAccessor>) {
        self.property_accessors
            .retain(|a| !super::same_strategy(a, accessor));
    }

    pub fn remove_method_resolver(&mut self, resolver: &Arc<dyn MethodResolver>) {
        self.method_resolvers
            .retain(|r| !super::same_strategy(r, resolver));
    }
}

impl EvaluationContext for StandardEvaluationContext {
    fn root_object(&self) -> TypedValue {
        self.root.clone()
    }

    fn lookup_variable(&self, name: &str) -> Option<TypedValue> {
        self.variables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn set_variable(&self, name: &str, value: TypedValue) {
        self.variables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), value);
    }

    fn property_accessors(&self) -> &[Arc<dyn PropertyAccessor>] {
        &self.property_accessors
    }

    fn method_resolvers(&self) -> &[Arc<dyn MethodResolver>] {
        &self.method_resolvers
    }

    fn constructor_resolvers(&self) -> &[Arc<dyn ConstructorResolver>] {
        &self.constructor_resolvers
    }

    fn type_converter(&self) -> &dyn TypeConverter {
        &*self.type_converter
    }

    fn type_comparator(&self) -> &dyn TypeComparator {
        &*self.type_comparator
    }

    fn operator_overloader(&self) -> &dyn OperatorOverloader {
        &*self.operator_overloader
    }

    fn type_locator(&self) -> &dyn TypeLocator {
        &*self.type_locator
    }

    fn lookup_function(&self, name: &str) -> &[Arc<MethodDescriptor>] {
        self.functions.get(name).map_or(&[][..], Vec::as_slice)
    }
}
