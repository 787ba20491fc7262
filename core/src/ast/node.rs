use std::sync::Arc;

use ecow::EcoString;

use super::{BinaryOp, BoolOp, ComparisonOp, ExitType, Published, SelectionKind, Span, StepOp, UnaryOp};
use crate::context::{
    ConstructorExecutor, ConstructorResolver, MethodDescriptor, MethodExecutor, MethodResolver,
    PropertyAccessor,
};
use crate::types::TypeDescriptor;
use crate::values::{ListRef, MapRef, TypedValue, Value};

/// A node of a parsed expression.
///
/// The structure is fixed at construction. What changes across evaluations
/// are the caches: the observed exit type here, and the resolved
/// accessors/executors on reference nodes.
#[derive(Debug)]
pub struct Node {
    pub span: Span,
    pub kind: NodeKind,
    pub(crate) exit_type: Published<ExitType>,
}

static_assertions::assert_impl_all!(Node: Send, Sync);

#[derive(Debug)]
pub enum NodeKind {
    Literal(TypedValue),
    /// A dotted chain `a.b.c()`.
    Compound(Vec<Node>),
    Property(PropertyReference),
    Method(MethodReference),
    Constructor(ConstructorReference),
    /// `#name`, including `#this` and `#root`.
    Variable(EcoString),
    Function(FunctionReference),
    Indexer(Indexer),
    InlineList(InlineList),
    InlineMap(InlineMap),
    Selection(Selection),
    Projection(Projection),
    TypeReference(TypeReference),
    Binary {
        op: BinaryOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Comparison {
        op: ComparisonOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Logical {
        op: BoolOp,
        left: Box<Node>,
        right: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    Step {
        op: StepOp,
        prefix: bool,
        operand: Box<Node>,
    },
    Ternary {
        condition: Box<Node>,
        then_branch: Box<Node>,
        else_branch: Box<Node>,
    },
    Elvis {
        value: Box<Node>,
        fallback: Box<Node>,
    },
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    Between {
        value: Box<Node>,
        range: Box<Node>,
    },
    InstanceOf {
        value: Box<Node>,
        ty: Box<Node>,
    },
}

impl NodeKind {
    /// Short name used in logs and compiler diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Literal(_) => "literal",
            NodeKind::Compound(_) => "compound",
            NodeKind::Property(_) => "property",
            NodeKind::Method(_) => "method",
            NodeKind::Constructor(_) => "constructor",
            NodeKind::Variable(_) => "variable",
            NodeKind::Function(_) => "function",
            NodeKind::Indexer(_) => "indexer",
            NodeKind::InlineList(_) => "inline list",
            NodeKind::InlineMap(_) => "inline map",
            NodeKind::Selection(_) => "selection",
            NodeKind::Projection(_) => "projection",
            NodeKind::TypeReference(_) => "type reference",
            NodeKind::Binary { .. } => "binary operator",
            NodeKind::Comparison { .. } => "comparison",
            NodeKind::Logical { .. } => "logical operator",
            NodeKind::Unary { .. } => "unary operator",
            NodeKind::Step { .. } => "increment/decrement",
            NodeKind::Ternary { .. } => "ternary",
            NodeKind::Elvis { .. } => "elvis",
            NodeKind::Assign { .. } => "assignment",
            NodeKind::Between { .. } => "between",
            NodeKind::InstanceOf { .. } => "instanceof",
        }
    }
}

impl Node {
    pub fn new(span: Span, kind: NodeKind) -> Self {
        Self {
            span,
            kind,
            exit_type: Published::new(),
        }
    }

    /// The result type this node has committed to, if its results so far
    /// were all of one public type.
    pub fn exit_type(&self) -> Option<TypeDescriptor> {
        self.exit_type.known()
    }

    /// Whether this node starts with the null-safe navigation marker.
    pub fn is_null_safe(&self) -> bool {
        match &self.kind {
            NodeKind::Property(p) => p.null_safe,
            NodeKind::Method(m) => m.null_safe,
            NodeKind::Indexer(i) => i.null_safe,
            NodeKind::Selection(s) => s.null_safe,
            NodeKind::Projection(p) => p.null_safe,
            _ => false,
        }
    }

    /// Whether this node navigates from the active context object.
    pub(crate) fn is_navigation(&self) -> bool {
        matches!(self.kind, NodeKind::Property(_) | NodeKind::Indexer(_))
    }

    /// Clear every cache in this subtree.
    pub fn reset_caches(&self) {
        self.exit_type.clear();
        match &self.kind {
            NodeKind::Property(p) => {
                p.read_cache.clear();
                p.write_cache.clear();
            }
            NodeKind::Method(m) => m.cache.clear(),
            NodeKind::Constructor(c) => c.cache.clear(),
            NodeKind::Function(f) => f.cache.clear(),
            NodeKind::TypeReference(t) => t.cache.clear(),
            _ => {}
        }
        for child in self.children() {
            child.reset_caches();
        }
    }

    /// Direct children, in evaluation order.
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Literal(_)
            | NodeKind::Property(_)
            | NodeKind::Variable(_)
            | NodeKind::TypeReference(_) => Vec::new(),
            NodeKind::Compound(children) => children.iter().collect(),
            NodeKind::Method(m) => m.args.iter().collect(),
            NodeKind::Constructor(c) => c.args.iter().collect(),
            NodeKind::Function(f) => f.args.iter().collect(),
            NodeKind::Indexer(i) => vec![&*i.index],
            NodeKind::InlineList(l) => l.elements.iter().collect(),
            NodeKind::InlineMap(m) => m.entries.iter().flat_map(|(k, v)| [k, v]).collect(),
            NodeKind::Selection(s) => vec![&*s.predicate],
            NodeKind::Projection(p) => vec![&*p.expression],
            NodeKind::Binary { left, right, .. }
            | NodeKind::Comparison { left, right, .. }
            | NodeKind::Logical { left, right, .. } => vec![&**left, &**right],
            NodeKind::Unary { operand, .. } | NodeKind::Step { operand, .. } => vec![&**operand],
            NodeKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => vec![&**condition, &**then_branch, &**else_branch],
            NodeKind::Elvis { value, fallback } => vec![&**value, &**fallback],
            NodeKind::Assign { target, value } => vec![&**target, &**value],
            NodeKind::Between { value, range } => vec![&**value, &**range],
            NodeKind::InstanceOf { value, ty } => vec![&**value, &**ty],
        }
    }

    /// A constant value this node folds to, if any.
    pub(crate) fn constant_value(&self) -> Option<Value> {
        match &self.kind {
            NodeKind::Literal(value) => Some(value.value.clone()),
            NodeKind::InlineList(list) => list.constant.clone().map(Value::List),
            NodeKind::InlineMap(map) => map.constant.clone().map(Value::Map),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct CachedAccessor {
    pub accessor: Arc<dyn PropertyAccessor>,
    pub target_type: Option<TypeDescriptor>,
}

#[derive(Debug)]
pub struct PropertyReference {
    pub name: EcoString,
    pub null_safe: bool,
    pub(crate) read_cache: Published<CachedAccessor>,
    pub(crate) write_cache: Published<CachedAccessor>,
}

impl PropertyReference {
    pub fn new(name: impl Into<EcoString>, null_safe: bool) -> Self {
        Self {
            name: name.into(),
            null_safe,
            read_cache: Published::new(),
            write_cache: Published::new(),
        }
    }

    /// The accessor chosen by the last successful read.
    pub fn cached_read_accessor(&self) -> Option<Arc<CachedAccessor>> {
        self.read_cache.load()
    }
}

#[derive(Debug)]
pub struct CachedMethod {
    pub resolver: Arc<dyn MethodResolver>,
    pub executor: Arc<dyn MethodExecutor>,
    pub target_type: Option<TypeDescriptor>,
    pub arg_types: Vec<Option<TypeDescriptor>>,
}

#[derive(Debug)]
pub struct MethodReference {
    pub name: EcoString,
    pub null_safe: bool,
    pub args: Vec<Node>,
    pub(crate) cache: Published<CachedMethod>,
}

impl MethodReference {
    pub fn new(name: impl Into<EcoString>, null_safe: bool, args: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            null_safe,
            args,
            cache: Published::new(),
        }
    }

    pub fn cached_executor(&self) -> Option<Arc<CachedMethod>> {
        self.cache.load()
    }
}

#[derive(Debug)]
pub struct CachedConstructor {
    pub resolver: Arc<dyn ConstructorResolver>,
    pub executor: Arc<dyn ConstructorExecutor>,
    pub arg_types: Vec<Option<TypeDescriptor>>,
}

#[derive(Debug)]
pub struct ConstructorReference {
    pub type_name: EcoString,
    pub args: Vec<Node>,
    pub(crate) cache: Published<CachedConstructor>,
}

impl ConstructorReference {
    pub fn new(type_name: impl Into<EcoString>, args: Vec<Node>) -> Self {
        Self {
            type_name: type_name.into(),
            args,
            cache: Published::new(),
        }
    }
}

#[derive(Debug)]
pub struct CachedFunction {
    pub function: Arc<MethodDescriptor>,
    pub arg_types: Vec<Option<TypeDescriptor>>,
}

#[derive(Debug)]
pub struct FunctionReference {
    pub name: EcoString,
    pub args: Vec<Node>,
    pub(crate) cache: Published<CachedFunction>,
}

impl FunctionReference {
    pub fn new(name: impl Into<EcoString>, args: Vec<Node>) -> Self {
        Self {
            name: name.into(),
            args,
            cache: Published::new(),
        }
    }
}

#[derive(Debug)]
pub struct Indexer {
    pub index: Box<Node>,
    pub null_safe: bool,
}

#[derive(Debug)]
pub struct InlineList {
    pub elements: Vec<Node>,
    /// Folded value when every element is constant.
    pub constant: Option<ListRef>,
}

impl InlineList {
    pub fn new(elements: Vec<Node>) -> Self {
        let constant = elements
            .iter()
            .map(Node::constant_value)
            .collect::<Option<Vec<_>>>()
            .map(ListRef::frozen);
        Self { elements, constant }
    }
}

#[derive(Debug)]
pub struct InlineMap {
    pub entries: Vec<(Node, Node)>,
    pub constant: Option<MapRef>,
}

impl InlineMap {
    /// Bare identifier keys (`{name: 'x'}`) become string literals.
    pub fn new(entries: Vec<(Node, Node)>) -> Self {
        let entries: Vec<(Node, Node)> = entries
            .into_iter()
            .map(|(key, value)| (bare_key_to_literal(key), value))
            .collect();
        let constant = entries
            .iter()
            .map(|(k, v)| Some((k.constant_value()?, v.constant_value()?)))
            .collect::<Option<Vec<_>>>()
            .map(MapRef::frozen);
        Self { entries, constant }
    }
}

fn bare_key_to_literal(key: Node) -> Node {
    match key.kind {
        NodeKind::Property(PropertyReference {
            name,
            null_safe: false,
            ..
        }) => Node::new(key.span, NodeKind::Literal(TypedValue::new(Value::Str(name)))),
        kind => Node::new(key.span, kind),
    }
}

#[derive(Debug)]
pub struct Selection {
    pub kind: SelectionKind,
    pub predicate: Box<Node>,
    pub null_safe: bool,
}

#[derive(Debug)]
pub struct Projection {
    pub expression: Box<Node>,
    pub null_safe: bool,
}

#[derive(Debug)]
pub struct TypeReference {
    pub name: EcoString,
    pub(crate) cache: Published<TypeDescriptor>,
}

impl TypeReference {
    pub fn new(name: impl Into<EcoString>) -> Self {
        Self {
            name: name.into(),
            cache: Published::new(),
        }
    }
}
