//! Bytecode compiler implementation.

use core::mem;

use tracing::trace;

use super::CompileError;
use crate::api::EvaluationOptions;
use crate::ast::{BinaryOp, BoolOp, ComparisonOp, Node, NodeKind, Span, UnaryOp};
use crate::evaluator::references::{compilable_constructor, compilable_method};
use crate::types::{NumericKind, TypeDescriptor};
use crate::values::Value;
use crate::vm::{CallSite, Code, Instruction};

/// Largest operand reachable with a single `WideArg` prefix.
const MAX_OPERAND: usize = 0xFFFF;

/// Bytecode compiler that turns an evaluated expression tree into VM code.
///
/// The tree must already have been interpreted: the compiler specialises the
/// code for the exit types and the accessors/executors cached on its nodes.
/// Every value whose shape could differ on a later evaluation is guarded, so
/// the code either produces what interpretation would or stops with a type
/// shape fault.
///
/// The operand stack is tracked precisely to set an exact `max_stack_size`.
pub struct BytecodeCompiler {
    /// Constant pool for literal values and guard types.
    constants: Vec<Value>,

    /// Pinned accessors, executors and variable names.
    sites: Vec<CallSite>,

    /// Bytecode instructions
    instructions: Vec<Instruction>,

    /// Source span of each instruction, parallel to `instructions`.
    spans: Vec<Span>,

    /// Span attached to instructions emitted now.
    current_span: Span,

    /// Current stack depth during compilation
    current_stack_depth: usize,

    /// Maximum stack depth observed
    max_stack_size: usize,
}

impl Default for BytecodeCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl BytecodeCompiler {
    /// Create a new bytecode compiler.
    pub fn new() -> Self {
        Self {
            constants: Vec::new(),
            sites: Vec::new(),
            instructions: Vec::new(),
            spans: Vec::new(),
            current_span: Span::default(),
            current_stack_depth: 0,
            max_stack_size: 0,
        }
    }

    /// Compile `node` in one call.
    ///
    /// Fails when any part of the tree is unsupported, has no committed exit
    /// type, or references a cache that is empty or not compilable.
    pub fn compile(node: &Node, options: &EvaluationOptions) -> Result<Code, CompileError> {
        if options.auto_grow_null_references || options.auto_grow_collections {
            return Err(CompileError::AutoGrowEnabled);
        }
        let mut compiler = Self::new();
        compiler.compile_node(node)?;
        compiler.current_span = node.span.clone();
        compiler.emit(Instruction::Return);
        compiler.pop_stack();
        let code = compiler.finalize(static_type(node));
        trace!(
            instructions = code.instructions.len(),
            constants = code.constants.len(),
            sites = code.sites.len(),
            max_stack_size = code.max_stack_size,
            "Compiled expression"
        );
        Ok(code)
    }

    fn finalize(self, exit_type: Option<TypeDescriptor>) -> Code {
        debug_assert_eq!(self.current_stack_depth, 0, "Unbalanced stack after Return");
        Code {
            constants: self.constants,
            sites: self.sites,
            instructions: self.instructions,
            spans: self.spans,
            max_stack_size: self.max_stack_size,
            exit_type,
        }
    }

    // === Stack Management ===

    /// Push a value onto the stack (increases depth by 1).
    fn push_stack(&mut self) {
        self.current_stack_depth += 1;
        if self.current_stack_depth > self.max_stack_size {
            self.max_stack_size = self.current_stack_depth;
        }
    }

    /// Pop a value from the stack (decreases depth by 1).
    fn pop_stack(&mut self) {
        debug_assert!(self.current_stack_depth > 0, "Stack underflow");
        self.current_stack_depth -= 1;
    }

    /// Pop N values from the stack.
    fn pop_stack_n(&mut self, n: usize) {
        debug_assert!(
            self.current_stack_depth >= n,
            "Stack underflow: trying to pop {} but depth is {}",
            n,
            self.current_stack_depth
        );
        self.current_stack_depth -= n;
    }

    // === Instruction Emission ===

    fn emit(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
        self.spans.push(self.current_span.clone());
    }

    /// Emit an instruction whose operand may need a `WideArg` prefix.
    fn emit_indexed(
        &mut self,
        make: fn(u8) -> Instruction,
        index: usize,
        overflow: CompileError,
    ) -> Result<(), CompileError> {
        if index > MAX_OPERAND {
            return Err(overflow);
        }
        if index > 0xFF {
            self.emit(Instruction::WideArg((index >> 8) as u8));
        }
        self.emit(make((index & 0xFF) as u8));
        Ok(())
    }

    /// Push a constant, using the immediate forms where they fit.
    fn emit_constant(&mut self, value: Value) -> Result<(), CompileError> {
        match value {
            Value::Int(n) if i8::try_from(n).is_ok() => self.emit(Instruction::ConstInt(n as i8)),
            Value::Bool(b) => self.emit(Instruction::ConstBool(b as u8)),
            Value::Null => self.emit(Instruction::ConstNull),
            other => {
                let index = self.add_constant(other);
                self.emit_indexed(Instruction::ConstLoad, index, CompileError::TooManyConstants)?;
            }
        }
        self.push_stack();
        Ok(())
    }

    /// Guard the value on top of the stack against `node`'s exit type.
    fn guard(&mut self, node: &Node) -> Result<(), CompileError> {
        match node.exit_type() {
            Some(ty) => {
                let index = self.add_constant(Value::Type(ty));
                self.emit_indexed(Instruction::CheckType, index, CompileError::TooManyConstants)
            }
            None => Ok(()),
        }
    }

    fn widen(&mut self, from: NumericKind, to: NumericKind) {
        if from != to {
            self.emit(Instruction::Widen(to as u8));
        }
    }

    /// Point every instruction from `start` on at `span`.
    fn restamp(&mut self, start: usize, span: &Span) {
        for slot in &mut self.spans[start..] {
            *slot = span.clone();
        }
    }

    // === Constant Pool and Sites ===

    /// Add a constant to the pool and return its index.
    ///
    /// Type descriptors and strings are shared; guards repeat the same types.
    fn add_constant(&mut self, value: Value) -> usize {
        if matches!(value, Value::Type(_) | Value::Str(_)) {
            if let Some(existing) = self.constants.iter().position(|c| *c == value) {
                return existing;
            }
        }
        self.constants.push(value);
        self.constants.len() - 1
    }

    fn add_site(&mut self, site: CallSite) -> Result<usize, CompileError> {
        if self.sites.len() > MAX_OPERAND {
            return Err(CompileError::TooManySites);
        }
        self.sites.push(site);
        Ok(self.sites.len() - 1)
    }

    // === Jump Patching Infrastructure ===

    /// Reserve two slots for a forward jump and return the first.
    ///
    /// The first slot becomes a `WideArg` when the offset needs it.
    fn jump_placeholder(&mut self) -> usize {
        let placeholder_index = self.instructions.len();
        self.emit(Instruction::Nop);
        self.emit(Instruction::Nop);
        placeholder_index
    }

    /// Get the current instruction index (for use as a jump label).
    fn label(&self) -> usize {
        self.instructions.len()
    }

    /// Patch a jump placeholder with the actual jump instruction.
    ///
    /// Offsets are relative to the instruction after the jump.
    fn patch_jump(
        &mut self,
        placeholder_index: usize,
        target_label: usize,
        make_jump: fn(u8) -> Instruction,
    ) -> Result<(), CompileError> {
        let offset = target_label - placeholder_index - 2;
        if offset > MAX_OPERAND {
            return Err(CompileError::JumpTooFar);
        }
        self.instructions[placeholder_index] = if offset > 0xFF {
            Instruction::WideArg((offset >> 8) as u8)
        } else {
            Instruction::Nop
        };
        self.instructions[placeholder_index + 1] = make_jump((offset & 0xFF) as u8);
        Ok(())
    }

    fn patch_null_exits(&mut self, exits: Vec<usize>) -> Result<(), CompileError> {
        let end = self.label();
        for placeholder in exits {
            self.patch_jump(placeholder, end, Instruction::JumpIfNull)?;
        }
        Ok(())
    }

    // === Nodes ===

    /// Compile a node evaluated against the scope root, leaving its value on
    /// the stack.
    fn compile_node(&mut self, node: &Node) -> Result<(), CompileError> {
        let saved = mem::replace(&mut self.current_span, node.span.clone());
        let result = self.compile_kind(node);
        self.current_span = saved;
        result
    }

    fn compile_kind(&mut self, node: &Node) -> Result<(), CompileError> {
        require_exit_type(node)?;
        match &node.kind {
            NodeKind::Literal(value) => self.emit_constant(value.value.clone()),
            NodeKind::Compound(children) => self.compile_chain(node, children),
            NodeKind::Property(_) | NodeKind::Method(_) | NodeKind::Indexer(_) => {
                self.emit(Instruction::LoadRoot);
                self.push_stack();
                let mut exits = Vec::new();
                self.compile_link(node, None, &mut exits)?;
                self.patch_null_exits(exits)
            }
            NodeKind::Constructor(constructor) => {
                let cached = compilable_constructor(constructor)
                    .ok_or_else(|| not_compilable(node, "no compilable constructor resolved"))?;
                if cached.arg_types.len() != constructor.args.len() {
                    return Err(not_compilable(node, "resolved for a different arity"));
                }
                let site = self.add_site(CallSite::Constructor {
                    type_name: constructor.type_name.clone(),
                    resolver: cached.resolver.clone(),
                    executor: cached.executor.clone(),
                    arg_types: cached.arg_types.clone(),
                })?;
                for arg in &constructor.args {
                    self.compile_node(arg)?;
                }
                self.emit_indexed(Instruction::NewObject, site, CompileError::TooManySites)?;
                self.pop_stack_n(constructor.args.len());
                self.push_stack();
                self.guard(node)
            }
            NodeKind::Variable(name) => {
                let site = self.add_site(CallSite::Variable { name: name.clone() })?;
                self.emit_indexed(Instruction::LoadVariable, site, CompileError::TooManySites)?;
                self.push_stack();
                self.guard(node)
            }
            NodeKind::TypeReference(reference) => {
                let ty = reference
                    .cache
                    .load()
                    .ok_or_else(|| not_compilable(node, "type not resolved yet"))?;
                self.emit_constant(Value::Type((*ty).clone()))
            }
            NodeKind::InlineList(list) => match &list.constant {
                Some(constant) => self.emit_constant(Value::List(constant.clone())),
                None => Err(not_compilable(node, "elements are not constant")),
            },
            NodeKind::InlineMap(map) => match &map.constant {
                Some(constant) => self.emit_constant(Value::Map(constant.clone())),
                None => Err(not_compilable(node, "entries are not constant")),
            },
            NodeKind::Binary { op, left, right } => self.compile_binary(node, *op, left, right),
            NodeKind::Comparison { op, left, right } => self.compile_comparison(*op, left, right),
            NodeKind::Logical { op, left, right } => self.compile_logical(*op, left, right),
            NodeKind::Unary { op, operand } => self.compile_unary(node, *op, operand),
            NodeKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.compile_node(condition)?;
                let to_else = self.jump_placeholder();
                self.pop_stack();
                self.compile_node(then_branch)?;
                let to_end = self.jump_placeholder();
                let else_label = self.label();
                self.pop_stack();
                self.compile_node(else_branch)?;
                let end = self.label();
                self.patch_jump(to_else, else_label, Instruction::PopJumpIfFalse)?;
                self.patch_jump(to_end, end, Instruction::JumpForward)?;
                self.guard(node)
            }
            NodeKind::Elvis { value, fallback } => {
                self.compile_node(value)?;
                let to_end = self.jump_placeholder();
                self.pop_stack();
                self.compile_node(fallback)?;
                let end = self.label();
                self.patch_jump(to_end, end, Instruction::ElvisJump)?;
                self.guard(node)
            }
            NodeKind::Function(_)
            | NodeKind::Selection(_)
            | NodeKind::Projection(_)
            | NodeKind::Step { .. }
            | NodeKind::Assign { .. }
            | NodeKind::Between { .. }
            | NodeKind::InstanceOf { .. } => Err(not_compilable(node, "no compiled form")),
        }
    }

    /// A dotted chain. A null-safe step that meets null ends the whole chain
    /// with null; errors inside a step carry that step's span.
    fn compile_chain(&mut self, node: &Node, children: &[Node]) -> Result<(), CompileError> {
        let Some((first, rest)) = children.split_first() else {
            return Err(not_compilable(node, "empty chain"));
        };
        let mut exits = Vec::new();

        let start = self.label();
        if matches!(
            first.kind,
            NodeKind::Property(_) | NodeKind::Method(_) | NodeKind::Indexer(_)
        ) {
            let saved = mem::replace(&mut self.current_span, first.span.clone());
            self.emit(Instruction::LoadRoot);
            self.current_span = saved;
            self.push_stack();
            self.compile_link(first, None, &mut exits)?;
        } else {
            self.compile_node(first)?;
        }
        self.restamp(start, &first.span);

        let mut receiver = static_type(first);
        for child in rest {
            let start = self.label();
            self.compile_link(child, receiver.take(), &mut exits)?;
            self.restamp(start, &child.span);
            receiver = static_type(child);
        }
        self.patch_null_exits(exits)
    }

    /// Compile one step of a chain. The receiver is on top of the stack and
    /// is replaced by the step's value.
    fn compile_link(
        &mut self,
        node: &Node,
        receiver: Option<TypeDescriptor>,
        exits: &mut Vec<usize>,
    ) -> Result<(), CompileError> {
        let saved = mem::replace(&mut self.current_span, node.span.clone());
        let result = self.compile_link_kind(node, receiver, exits);
        self.current_span = saved;
        result
    }

    fn compile_link_kind(
        &mut self,
        node: &Node,
        receiver: Option<TypeDescriptor>,
        exits: &mut Vec<usize>,
    ) -> Result<(), CompileError> {
        require_exit_type(node)?;
        match &node.kind {
            NodeKind::Property(property) => {
                let cached = property
                    .cached_read_accessor()
                    .filter(|cached| cached.accessor.is_compilable())
                    .ok_or_else(|| not_compilable(node, "no compilable accessor resolved"))?;
                let site = self.add_site(CallSite::Property {
                    name: property.name.clone(),
                    accessor: cached.accessor.clone(),
                    target_type: cached.target_type.clone(),
                })?;
                if property.null_safe {
                    exits.push(self.jump_placeholder());
                }
                self.emit_indexed(Instruction::GetProperty, site, CompileError::TooManySites)?;
                self.guard(node)
            }
            NodeKind::Method(method) => {
                let cached = compilable_method(method)
                    .ok_or_else(|| not_compilable(node, "no compilable method resolved"))?;
                if cached.arg_types.len() != method.args.len() {
                    return Err(not_compilable(node, "resolved for a different arity"));
                }
                let site = self.add_site(CallSite::Method {
                    name: method.name.clone(),
                    resolver: cached.resolver.clone(),
                    executor: cached.executor.clone(),
                    target_type: cached.target_type.clone(),
                    arg_types: cached.arg_types.clone(),
                })?;
                if method.null_safe {
                    exits.push(self.jump_placeholder());
                } else {
                    self.emit_indexed(Instruction::NullCheck, site, CompileError::TooManySites)?;
                }
                for arg in &method.args {
                    self.compile_node(arg)?;
                }
                self.emit_indexed(Instruction::CallMethod, site, CompileError::TooManySites)?;
                self.pop_stack_n(method.args.len());
                self.guard(node)
            }
            NodeKind::Indexer(indexer) => {
                let site = self.add_site(CallSite::Index)?;
                if indexer.null_safe {
                    exits.push(self.jump_placeholder());
                } else {
                    self.emit_indexed(Instruction::NullCheck, site, CompileError::TooManySites)?;
                }
                match (&indexer.index.kind, &receiver) {
                    // `map[key]` looks up the bare name itself.
                    (NodeKind::Property(key), Some(TypeDescriptor::Map)) => {
                        let saved =
                            mem::replace(&mut self.current_span, indexer.index.span.clone());
                        let emitted = self.emit_constant(Value::Str(key.name.clone()));
                        self.current_span = saved;
                        emitted?;
                    }
                    (NodeKind::Property(_), None) => {
                        return Err(not_compilable(node, "bare key on a receiver of unknown type"));
                    }
                    _ => self.compile_node(&indexer.index)?,
                }
                self.emit(Instruction::IndexGet);
                self.pop_stack();
                self.guard(node)
            }
            NodeKind::Variable(name) if name == "this" => Ok(()),
            NodeKind::Variable(_)
            | NodeKind::Literal(_)
            | NodeKind::TypeReference(_)
            | NodeKind::InlineList(_)
            | NodeKind::InlineMap(_) => {
                self.emit(Instruction::Pop);
                self.pop_stack();
                self.compile_kind(node)
            }
            _ => Err(not_compilable(node, "cannot follow a dot in compiled code")),
        }
    }

    fn compile_binary(
        &mut self,
        node: &Node,
        op: BinaryOp,
        left: &Node,
        right: &Node,
    ) -> Result<(), CompileError> {
        let (left_type, right_type) = (static_type(left), static_type(right));
        let kinds = (
            left_type.as_ref().and_then(TypeDescriptor::numeric_kind),
            right_type.as_ref().and_then(TypeDescriptor::numeric_kind),
        );
        if let (Some(l), Some(r)) = kinds {
            let kind = l.promote(r);
            if !kind.is_primitive() {
                return Err(not_compilable(node, "arbitrary precision arithmetic"));
            }
            if op == BinaryOp::Pow && kind != NumericKind::Double {
                return Err(not_compilable(node, "result type of '^' depends on the operands"));
            }
            self.compile_node(left)?;
            self.widen(l, kind);
            self.compile_node(right)?;
            self.widen(r, kind);
            let byte = op.as_byte();
            self.emit(match kind {
                NumericKind::Int => Instruction::IntBinOp(byte),
                NumericKind::Long => Instruction::LongBinOp(byte),
                NumericKind::Float => Instruction::FloatBinOp(byte),
                _ => Instruction::DoubleBinOp(byte),
            });
            self.pop_stack();
            return Ok(());
        }

        let is_string = |ty: &Option<TypeDescriptor>| *ty == Some(TypeDescriptor::String);
        if op == BinaryOp::Add && (is_string(&left_type) || is_string(&right_type)) {
            self.compile_node(left)?;
            self.compile_node(right)?;
            self.emit(Instruction::StringConcat);
            self.pop_stack();
            return Ok(());
        }
        Err(not_compilable(node, "operands are neither primitive numbers nor strings"))
    }

    fn compile_comparison(
        &mut self,
        op: ComparisonOp,
        left: &Node,
        right: &Node,
    ) -> Result<(), CompileError> {
        let kinds = (
            static_type(left).and_then(|ty| ty.numeric_kind()),
            static_type(right).and_then(|ty| ty.numeric_kind()),
        );
        if let (Some(l), Some(r)) = kinds {
            // Float operands compare exactly at double precision.
            let kind = match l.promote(r) {
                NumericKind::Float => NumericKind::Double,
                kind => kind,
            };
            if kind.is_primitive() {
                self.compile_node(left)?;
                self.widen(l, kind);
                self.compile_node(right)?;
                self.widen(r, kind);
                self.emit(match kind {
                    NumericKind::Int => Instruction::IntCmpOp(op),
                    NumericKind::Long => Instruction::LongCmpOp(op),
                    _ => Instruction::DoubleCmpOp(op),
                });
                self.pop_stack();
                return Ok(());
            }
        }
        self.compile_node(left)?;
        self.compile_node(right)?;
        self.emit(Instruction::CmpOp(op));
        self.pop_stack();
        Ok(())
    }

    /// Short-circuit `and`/`or`:
    ///
    /// ```text
    ///     <left>;  PopJumpIf{False,True} SHORT
    ///     <right>; PopJumpIf{False,True} SHORT
    ///     ConstBool(!short); JumpForward END
    /// SHORT:
    ///     ConstBool(short)
    /// END:
    /// ```
    fn compile_logical(&mut self, op: BoolOp, left: &Node, right: &Node) -> Result<(), CompileError> {
        let (short_jump, short_value): (fn(u8) -> Instruction, bool) = match op {
            BoolOp::And => (Instruction::PopJumpIfFalse, false),
            BoolOp::Or => (Instruction::PopJumpIfTrue, true),
        };

        self.compile_node(left)?;
        let first = self.jump_placeholder();
        self.pop_stack();
        self.compile_node(right)?;
        let second = self.jump_placeholder();
        self.pop_stack();

        self.emit(Instruction::ConstBool(!short_value as u8));
        self.push_stack();
        let to_end = self.jump_placeholder();

        let short = self.label();
        self.pop_stack();
        self.emit(Instruction::ConstBool(short_value as u8));
        self.push_stack();
        let end = self.label();

        self.patch_jump(first, short, short_jump)?;
        self.patch_jump(second, short, short_jump)?;
        self.patch_jump(to_end, end, Instruction::JumpForward)
    }

    fn compile_unary(&mut self, node: &Node, op: UnaryOp, operand: &Node) -> Result<(), CompileError> {
        if op == UnaryOp::Not {
            self.compile_node(operand)?;
            self.emit(Instruction::Not);
            return Ok(());
        }

        let kind = static_type(operand)
            .and_then(|ty| ty.numeric_kind())
            .ok_or_else(|| not_compilable(node, "operand is not numeric"))?;
        match op {
            UnaryOp::Plus => {
                self.compile_node(operand)?;
                // Re-asserts the kind, so a null operand faults.
                self.emit(Instruction::Widen(kind as u8));
            }
            _ => {
                let (negate, at) = match kind {
                    NumericKind::Byte | NumericKind::Short | NumericKind::Int => {
                        (Instruction::NegInt, NumericKind::Int)
                    }
                    NumericKind::Long => (Instruction::NegLong, kind),
                    NumericKind::Float => (Instruction::NegFloat, kind),
                    NumericKind::Double => (Instruction::NegDouble, kind),
                    _ => return Err(not_compilable(node, "arbitrary precision negation")),
                };
                self.compile_node(operand)?;
                self.widen(kind, at);
                self.emit(negate);
            }
        }
        Ok(())
    }
}

/// The type a node is known to produce: a literal's own type, otherwise the
/// exit type the interpreter observed.
fn static_type(node: &Node) -> Option<TypeDescriptor> {
    match &node.kind {
        NodeKind::Literal(value) => value.value.type_descriptor(),
        _ => node.exit_type(),
    }
}

fn require_exit_type(node: &Node) -> Result<(), CompileError> {
    if matches!(node.kind, NodeKind::Literal(_)) || node.exit_type().is_some() {
        Ok(())
    } else {
        Err(not_compilable(node, "no stable exit type"))
    }
}

fn not_compilable(node: &Node, reason: &'static str) -> CompileError {
    CompileError::NotCompilable {
        kind: node.kind.name(),
        span: node.span.clone(),
        reason,
    }
}
