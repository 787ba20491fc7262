use std::sync::Arc;

use ecow::EcoString;
use hashbrown::{HashMap, HashSet};

use crate::ast::Span;
use crate::context::{
    ConstructorExecutor, ConstructorResolver, MethodExecutor, MethodResolver, PropertyAccessor,
};
use crate::evaluator::{EvalError, EvalErrorKind};
use crate::types::TypeDescriptor;
use crate::values::Value;
use crate::vm::Instruction;

/// A compiled expression.
pub struct Code {
    pub constants: Vec<Value>,
    /// Accessors and executors resolved by the interpreter, pinned for the
    /// reference instructions.
    pub sites: Vec<CallSite>,
    pub instructions: Vec<Instruction>,
    /// Source span of the node each instruction was emitted for.
    pub spans: Vec<Span>,
    pub max_stack_size: usize,
    /// The result type the whole expression committed to.
    pub exit_type: Option<TypeDescriptor>,
}

static_assertions::assert_impl_all!(Code: Send, Sync);

/// What a reference instruction calls, and the shape it was resolved for.
#[derive(Debug)]
pub enum CallSite {
    Property {
        name: EcoString,
        accessor: Arc<dyn PropertyAccessor>,
        target_type: Option<TypeDescriptor>,
    },
    Method {
        name: EcoString,
        resolver: Arc<dyn MethodResolver>,
        executor: Arc<dyn MethodExecutor>,
        target_type: Option<TypeDescriptor>,
        arg_types: Vec<Option<TypeDescriptor>>,
    },
    Constructor {
        type_name: EcoString,
        resolver: Arc<dyn ConstructorResolver>,
        executor: Arc<dyn ConstructorExecutor>,
        arg_types: Vec<Option<TypeDescriptor>>,
    },
    Variable {
        name: EcoString,
    },
    Index,
}

impl CallSite {
    /// Number of arguments a call pops.
    pub fn arity(&self) -> usize {
        match self {
            CallSite::Method { arg_types, .. } | CallSite::Constructor { arg_types, .. } => {
                arg_types.len()
            }
            _ => 0,
        }
    }

    /// The error raised when this site meets a null target.
    pub fn null_target_error(&self) -> EvalError {
        match self {
            CallSite::Property { name, .. } => {
                EvalErrorKind::PropertyOrFieldNotReadableOnNull { name: name.clone() }.into()
            }
            CallSite::Method { name, .. } => {
                EvalErrorKind::MethodCallOnNull { name: name.clone() }.into()
            }
            _ => EvalErrorKind::CannotIndexIntoNull.into(),
        }
    }
}

impl core::fmt::Debug for Code {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        writeln!(f, "Code {{")?;
        writeln!(f, "  max_stack_size: {}", self.max_stack_size)?;
        if let Some(ty) = &self.exit_type {
            writeln!(f, "  exit_type: {}", ty)?;
        }

        // Print constants pool
        if !self.constants.is_empty() {
            writeln!(f, "  constants: [")?;
            for (i, constant) in self.constants.iter().enumerate() {
                writeln!(f, "    [{}] = {:?}", i, constant)?;
            }
            writeln!(f, "  ]")?;
        } else {
            writeln!(f, "  constants: []")?;
        }

        if !self.sites.is_empty() {
            writeln!(f, "  sites: [")?;
            for (i, site) in self.sites.iter().enumerate() {
                writeln!(f, "    [{}] = {:?}", i, site)?;
            }
            writeln!(f, "  ]")?;
        }

        // First pass: collect all jump targets to determine which addresses need labels
        let mut jump_targets: HashSet<usize> = HashSet::new();
        let mut wide_arg: usize = 0;

        for (addr, instr) in self.instructions.iter().enumerate() {
            if let Instruction::WideArg(high) = instr {
                wide_arg = (wide_arg | (*high as usize)) << 8;
                continue;
            }

            if let Some(offset) = instr.jump_offset() {
                let full_offset = wide_arg | (offset as usize);
                // Jump is relative to NEXT instruction: target = addr + 1 + offset
                jump_targets.insert(addr + 1 + full_offset);
            }
            wide_arg = 0;
        }

        // Assign label numbers to targets (sorted for deterministic output)
        let mut sorted_targets: Vec<_> = jump_targets.into_iter().collect();
        sorted_targets.sort();
        let label_map: HashMap<usize, usize> = sorted_targets
            .into_iter()
            .enumerate()
            .map(|(i, addr)| (addr, i))
            .collect();

        // Second pass: print instructions with labels
        writeln!(f, "  instructions:")?;
        wide_arg = 0;

        for (addr, instr) in self.instructions.iter().enumerate() {
            let label_prefix = match label_map.get(&addr) {
                Some(label_num) => format!("L{}:", label_num),
                None => String::new(),
            };

            if let Instruction::WideArg(high) = instr {
                wide_arg = (wide_arg | (*high as usize)) << 8;
                writeln!(f, "    {:4} {:>4}  {:?}", addr, label_prefix, instr)?;
                continue;
            }

            if let Some(offset) = instr.jump_offset() {
                let target = addr + 1 + (wide_arg | (offset as usize));
                let target_label = label_map
                    .get(&target)
                    .map(|l| format!("L{}", l))
                    .unwrap_or_else(|| format!("@{}", target));
                writeln!(
                    f,
                    "    {:4} {:>4}  {:?} (to {})",
                    addr, label_prefix, instr, target_label
                )?;
            } else {
                writeln!(f, "    {:4} {:>4}  {:?}", addr, label_prefix, instr)?;
            }
            wide_arg = 0;
        }

        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_labels_jump_targets() {
        let code = Code {
            constants: vec![],
            sites: vec![],
            instructions: vec![
                Instruction::ConstBool(1),
                Instruction::PopJumpIfFalse(2),
                Instruction::ConstInt(1),
                Instruction::JumpForward(1),
                Instruction::ConstInt(2),
                Instruction::Return,
            ],
            spans: vec![Span::default(); 6],
            max_stack_size: 1,
            exit_type: Some(TypeDescriptor::Int),
        };
        let listing = format!("{:?}", code);
        assert!(listing.contains("exit_type: Integer"));
        assert!(listing.contains("(to L0)"));
        assert!(listing.contains("(to L1)"));
        assert!(listing.contains("L0:  ConstInt(2)"));
    }

    #[test]
    fn test_null_target_errors() {
        let site = CallSite::Variable { name: "x".into() };
        assert!(matches!(site.null_target_error().kind, EvalErrorKind::CannotIndexIntoNull));
        assert_eq!(CallSite::Index.arity(), 0);
    }
}
