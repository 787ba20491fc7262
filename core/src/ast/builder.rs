//! Helpers for building trees by hand.
//!
//! ```
//! use quill_core::ast::builder::*;
//! use quill_core::ast::BinaryOp;
//!
//! // 3 + 4 * 2
//! let tree = binary(BinaryOp::Add, int(3), binary(BinaryOp::Mul, int(4), int(2)));
//! ```

use ecow::EcoString;

use super::*;
use crate::values::{TypedValue, Value};

impl Node {
    /// Set the source span.
    pub fn at(mut self, start: usize, end: usize) -> Node {
        self.span = Span::new(start, end);
        self
    }
}

fn node(kind: NodeKind) -> Node {
    Node::new(Span::default(), kind)
}

pub fn literal(value: impl Into<Value>) -> Node {
    node(NodeKind::Literal(TypedValue::new(value.into())))
}

pub fn null() -> Node {
    node(NodeKind::Literal(TypedValue::NULL))
}

pub fn int(value: i32) -> Node {
    literal(Value::Int(value))
}

pub fn long(value: i64) -> Node {
    literal(Value::Long(value))
}

pub fn double(value: f64) -> Node {
    literal(Value::Double(value))
}

pub fn boolean(value: bool) -> Node {
    literal(Value::Bool(value))
}

pub fn string(value: &str) -> Node {
    literal(Value::str(value))
}

pub fn chain(children: Vec<Node>) -> Node {
    node(NodeKind::Compound(children))
}

pub fn property(name: impl Into<EcoString>) -> Node {
    node(NodeKind::Property(PropertyReference::new(name, false)))
}

/// `?.name`
pub fn safe_property(name: impl Into<EcoString>) -> Node {
    node(NodeKind::Property(PropertyReference::new(name, true)))
}

pub fn method(name: impl Into<EcoString>, args: Vec<Node>) -> Node {
    node(NodeKind::Method(MethodReference::new(name, false, args)))
}

pub fn safe_method(name: impl Into<EcoString>, args: Vec<Node>) -> Node {
    node(NodeKind::Method(MethodReference::new(name, true, args)))
}

/// `new Type(args)`
pub fn construct(type_name: impl Into<EcoString>, args: Vec<Node>) -> Node {
    node(NodeKind::Constructor(ConstructorReference::new(type_name, args)))
}

/// `#name`
pub fn variable(name: impl Into<EcoString>) -> Node {
    node(NodeKind::Variable(name.into()))
}

/// `#name(args)`
pub fn function(name: impl Into<EcoString>, args: Vec<Node>) -> Node {
    node(NodeKind::Function(FunctionReference::new(name, args)))
}

/// `[index]`
pub fn index(index: Node) -> Node {
    node(NodeKind::Indexer(Indexer {
        index: Box::new(index),
        null_safe: false,
    }))
}

/// `?.[index]`
pub fn safe_index(index: Node) -> Node {
    node(NodeKind::Indexer(Indexer {
        index: Box::new(index),
        null_safe: true,
    }))
}

/// `{a, b, c}`
pub fn list(elements: Vec<Node>) -> Node {
    node(NodeKind::InlineList(InlineList::new(elements)))
}

/// `{k1: v1, k2: v2}`
pub fn map(entries: Vec<(Node, Node)>) -> Node {
    node(NodeKind::InlineMap(InlineMap::new(entries)))
}

pub fn select(kind: SelectionKind, predicate: Node) -> Node {
    node(NodeKind::Selection(Selection {
        kind,
        predicate: Box::new(predicate),
        null_safe: false,
    }))
}

pub fn safe_select(kind: SelectionKind, predicate: Node) -> Node {
    node(NodeKind::Selection(Selection {
        kind,
        predicate: Box::new(predicate),
        null_safe: true,
    }))
}

/// `![expression]`
pub fn project(expression: Node) -> Node {
    node(NodeKind::Projection(Projection {
        expression: Box::new(expression),
        null_safe: false,
    }))
}

pub fn safe_project(expression: Node) -> Node {
    node(NodeKind::Projection(Projection {
        expression: Box::new(expression),
        null_safe: true,
    }))
}

/// `T(name)`
pub fn type_ref(name: impl Into<EcoString>) -> Node {
    node(NodeKind::TypeReference(TypeReference::new(name)))
}

pub fn binary(op: BinaryOp, left: Node, right: Node) -> Node {
    node(NodeKind::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn compare(op: ComparisonOp, left: Node, right: Node) -> Node {
    node(NodeKind::Comparison {
        op,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn and(left: Node, right: Node) -> Node {
    node(NodeKind::Logical {
        op: BoolOp::And,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn or(left: Node, right: Node) -> Node {
    node(NodeKind::Logical {
        op: BoolOp::Or,
        left: Box::new(left),
        right: Box::new(right),
    })
}

pub fn unary(op: UnaryOp, operand: Node) -> Node {
    node(NodeKind::Unary {
        op,
        operand: Box::new(operand),
    })
}

pub fn not(operand: Node) -> Node {
    unary(UnaryOp::Not, operand)
}

pub fn step(op: StepOp, prefix: bool, operand: Node) -> Node {
    node(NodeKind::Step {
        op,
        prefix,
        operand: Box::new(operand),
    })
}

/// `x++`
pub fn post_inc(operand: Node) -> Node {
    step(StepOp::Increment, false, operand)
}

/// `++x`
pub fn pre_inc(operand: Node) -> Node {
    step(StepOp::Increment, true, operand)
}

/// `x--`
pub fn post_dec(operand: Node) -> Node {
    step(StepOp::Decrement, false, operand)
}

/// `--x`
pub fn pre_dec(operand: Node) -> Node {
    step(StepOp::Decrement, true, operand)
}

pub fn ternary(condition: Node, then_branch: Node, else_branch: Node) -> Node {
    node(NodeKind::Ternary {
        condition: Box::new(condition),
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
    })
}

pub fn elvis(value: Node, fallback: Node) -> Node {
    node(NodeKind::Elvis {
        value: Box::new(value),
        fallback: Box::new(fallback),
    })
}

pub fn assign(target: Node, value: Node) -> Node {
    node(NodeKind::Assign {
        target: Box::new(target),
        value: Box::new(value),
    })
}

pub fn between(value: Node, range: Node) -> Node {
    node(NodeKind::Between {
        value: Box::new(value),
        range: Box::new(range),
    })
}

pub fn instance_of(value: Node, ty: Node) -> Node {
    node(NodeKind::InstanceOf {
        value: Box::new(value),
        ty: Box::new(ty),
    })
}
