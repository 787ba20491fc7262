//! Quill VM Instructions - Fixed 16-bit Format
//!
//! This module defines the instruction set of the stack machine compiled
//! expressions run on.
//!
//! # Instruction Format
//!
//! **ALL instructions are exactly 16 bits (2 bytes)**:
//! ```text
//! ┌────────────┬────────────┐
//! │    Tag     │  Operand   │
//! │  (8 bits)  │  (8 bits)  │
//! └────────────┴────────────┘
//! ```
//!
//! Using `#[repr(C, u8)]`, the enum naturally maps to this 2-byte layout:
//! - Discriminant (tag) = 1 byte
//! - Payload (operand) = 0 or 1 byte
//! - Total size = 2 bytes with no padding
//!
//! # Design Principles
//!
//! - **Stack-based**: All operations consume operands from stack and push results
//! - **Fixed-width**: Every instruction is exactly 16 bits
//! - **Type-explicit**: Separate instructions per numeric kind; a value of the
//!   wrong kind is a type-shape fault, never a coercion
//! - **Guarded**: Results of dynamic reads are checked against the type the
//!   interpreter observed before later instructions rely on it
//! - **Parameterized ops**: Binary operations use operand to encode operation (saves opcodes)
//!
//! # Wide Arguments
//!
//! For operands > 255, use the `WideArg` prefix:
//! ```ignore
//! WideArg(high_byte)      // Sets high byte for next instruction
//! ConstLoad(low_byte)     // Combined: (high << 8) | low = 16-bit index
//! ```
//!
//! # Stack Discipline
//!
//! Stack effect notation: `[..., operand1, operand2] -> [..., result]`.
//! A trailing `!` marks instructions that can raise an evaluation error.

use core::fmt;

use crate::ast::ComparisonOp;

/// A single VM instruction (exactly 16 bits)
///
/// The `#[repr(C, u8)]` ensures:
/// - First byte is the discriminant (opcode)
/// - Second byte is the operand (if present)
/// - Total size is exactly 2 bytes
#[repr(C, u8)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    // ========================================================================
    // Special (0x00)
    // ========================================================================
    /// Halt execution
    ///
    /// Having Halt at 0x00 means zeroed bytecode stops instead of running
    /// garbage. The VM reports it as a type-shape fault.
    Halt = 0x00,

    // ========================================================================
    // Stack & Constants (0x01 - 0x09)
    // ========================================================================
    /// Push constant from pool
    /// Operand: u8 index (supports WideArg) | Stack: [...] -> [..., value]
    ConstLoad(u8) = 0x01,

    /// Push small signed integer (-128 to 127) as an `Int`
    /// Operand: i8 value | Stack: [...] -> [..., int]
    /// Does not support WideArg.
    ConstInt(i8) = 0x02,

    /// Push the Bool value (arg != 0)
    /// Stack: [...] -> [..., arg != 0]
    ConstBool(u8) = 0x04,

    /// Wide argument prefix - modifies next instruction's operand
    ///
    /// The next instruction will use a 16-bit operand:
    /// `(this_operand << 8) | next_operand`
    WideArg(u8) = 0x05,

    /// Push null
    /// Stack: [...] -> [..., null]
    ConstNull = 0x06,

    /// Pop top value
    /// Stack: [..., a] -> [...]
    Pop = 0x08,

    // ========================================================================
    // Evaluation context (0x0A - 0x0F)
    // ========================================================================
    /// Push the root object
    /// Stack: [...] -> [..., root]
    LoadRoot = 0x0A,

    /// Look up a variable by the name recorded at a call site
    /// Operand: u8 site index | Stack: [...] -> [..., value]
    LoadVariable(u8) = 0x0B,

    // ========================================================================
    // Arithmetic - Int (0x10 - 0x17)
    // ========================================================================
    /// Int binary operation
    ///
    /// Operand encodes the operation:
    /// - `b'+'` (0x2B): Addition (wrapping)
    /// - `b'-'` (0x2D): Subtraction (wrapping)
    /// - `b'*'` (0x2A): Multiplication (wrapping)
    /// - `b'/'` (0x2F): Division (can error)
    /// - `b'%'` (0x25): Modulo (can error)
    ///
    /// Stack: [..., a: Int, b: Int] -> [..., result: Int(|!)]
    IntBinOp(u8) = 0x10,

    /// Int negation (wrapping): -a
    /// Stack: [..., a: Int] -> [..., -a: Int]
    NegInt = 0x11,

    /// Int comparison operation
    /// Stack: [..., a: Int, b: Int] -> [..., result: Bool]
    IntCmpOp(ComparisonOp) = 0x14,

    // ========================================================================
    // Arithmetic - Long (0x18 - 0x1F)
    // ========================================================================
    /// Long binary operation, same operand encoding as IntBinOp
    /// Stack: [..., a: Long, b: Long] -> [..., result: Long(|!)]
    LongBinOp(u8) = 0x18,

    /// Stack: [..., a: Long] -> [..., -a: Long]
    NegLong = 0x19,

    /// Stack: [..., a: Long, b: Long] -> [..., result: Bool]
    LongCmpOp(ComparisonOp) = 0x1C,

    // ========================================================================
    // Arithmetic - Float (0x20 - 0x27)
    // ========================================================================
    /// Float binary operation
    ///
    /// Same operand encoding as IntBinOp. Never errors: division by zero
    /// follows IEEE 754.
    ///
    /// Stack: [..., a: Float, b: Float] -> [..., result: Float]
    FloatBinOp(u8) = 0x20,

    /// Stack: [..., a: Float] -> [..., -a: Float]
    NegFloat = 0x21,

    // Float comparisons run as DoubleCmpOp after widening.

    // ========================================================================
    // Arithmetic - Double (0x28 - 0x2F)
    // ========================================================================
    /// Double binary operation, including `b'^'` (power)
    /// Stack: [..., a: Double, b: Double] -> [..., result: Double]
    DoubleBinOp(u8) = 0x28,

    /// Stack: [..., a: Double] -> [..., -a: Double]
    NegDouble = 0x29,

    /// Stack: [..., a: Double, b: Double] -> [..., result: Bool]
    DoubleCmpOp(ComparisonOp) = 0x2A,

    // ========================================================================
    // Logical, Generic & Conversions (0x30 - 0x37)
    // ========================================================================
    /// Logical NOT: !a
    /// Stack: [..., a: Bool] -> [..., !a: Bool]
    Not = 0x32,

    /// Comparison through the evaluation context, exactly as interpreted:
    /// equality by value, relational operators through the type comparator.
    /// Stack: [..., a, b] -> [..., result: Bool!]
    CmpOp(ComparisonOp) = 0x35,

    /// String concatenation; one operand must be a String
    /// Stack: [..., a, b] -> [..., a + b: String]
    StringConcat = 0x36,

    /// Widen a numeric value to a numeric kind
    /// Operand: `NumericKind` discriminant | Stack: [..., n] -> [..., n']
    Widen(u8) = 0x37,

    // ========================================================================
    // Control Flow (0x38 - 0x3F)
    // ========================================================================
    /// Unconditional jump (offset in instructions, not bytes)
    ///
    /// Operand: u8 offset (supports WideArg)
    /// Stack: [...] -> [...]
    ///
    /// Jump is relative to the NEXT instruction.
    JumpForward(u8) = 0x38,

    /// Pop and Jump if false
    /// Operand: u8 offset | Stack: [..., cond: Bool] -> [...]
    PopJumpIfFalse(u8) = 0x39,

    /// Pop and Jump if true
    /// Operand: u8 offset | Stack: [..., cond: Bool] -> [...]
    PopJumpIfTrue(u8) = 0x3A,

    /// Jump if the top of the stack is null, leaving it in place
    ///
    /// Implements null-safe navigation: the null becomes the result of the
    /// whole chain.
    ///
    /// Operand: u8 offset | Stack: [..., a] -> [..., a]
    JumpIfNull(u8) = 0x3B,

    /// Keep the top value and jump if it is present (neither null nor the
    /// empty string); otherwise pop it and fall through to the fallback.
    ///
    /// Operand: u8 offset
    /// Stack when present: [..., a] -> [..., a] (jumps forward)
    /// Stack when absent: [..., a] -> [...] (falls through)
    ElvisJump(u8) = 0x3C,

    /// Return from the routine
    /// Stack: [..., retval] -> [retval]
    Return = 0x3E,

    // ========================================================================
    // References (0x40 - 0x4F)
    // ========================================================================
    /// Read a property through the accessor recorded at a call site
    /// Operand: u8 site index | Stack: [..., target] -> [..., value!]
    GetProperty(u8) = 0x40,

    /// Call the method executor recorded at a call site
    /// Operand: u8 site index | Stack: [..., target, arg1, ..., argN] -> [..., result!]
    CallMethod(u8) = 0x41,

    /// Call the constructor executor recorded at a call site
    /// Operand: u8 site index | Stack: [..., arg1, ..., argN] -> [..., object!]
    NewObject(u8) = 0x42,

    /// Index into a list, map or string
    /// Stack: [..., target, index] -> [..., element!]
    IndexGet = 0x43,

    /// Raise the site's null-target error if the top of the stack is null
    /// Operand: u8 site index | Stack: [..., a] -> [..., a!]
    NullCheck(u8) = 0x44,

    // ========================================================================
    // Type Guards (0xB0 - 0xBF)
    // ========================================================================
    /// Fault unless the top value is null or of the type in the constant pool
    /// Operand: u8 constant index | Stack: [..., a] -> [..., a]
    CheckType(u8) = 0xB0,

    // ========================================================================
    // Meta & Debug Operations (0xD0 - 0xDF)
    // ========================================================================
    /// No operation. Also fills the unused half of short jumps.
    Nop = 0xD0,
    // 0xD1-0xFF reserved
}
static_assertions::assert_eq_size!(Instruction, [u8; 2]);

impl Instruction {
    /// Size of an instruction in bytes
    pub const SIZE: usize = 2;

    /// Check if this instruction can raise an evaluation error
    pub const fn can_error(&self) -> bool {
        matches!(
            self,
            Self::IntBinOp(b'/')
                | Self::IntBinOp(b'%')
                | Self::LongBinOp(b'/')
                | Self::LongBinOp(b'%')
                | Self::CmpOp(_)
                | Self::GetProperty(_)
                | Self::CallMethod(_)
                | Self::NewObject(_)
                | Self::IndexGet
                | Self::NullCheck(_)
        )
    }

    /// Check if this is a control flow instruction
    pub const fn is_control_flow(&self) -> bool {
        matches!(
            self,
            Self::JumpForward(_)
                | Self::PopJumpIfFalse(_)
                | Self::PopJumpIfTrue(_)
                | Self::JumpIfNull(_)
                | Self::ElvisJump(_)
                | Self::Return
        )
    }

    /// Forward offset of a jump instruction.
    pub const fn jump_offset(&self) -> Option<u8> {
        match self {
            Self::JumpForward(offset)
            | Self::PopJumpIfFalse(offset)
            | Self::PopJumpIfTrue(offset)
            | Self::JumpIfNull(offset)
            | Self::ElvisJump(offset) => Some(*offset),
            _ => None,
        }
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Binary operations - show operator as char
            Self::IntBinOp(op) => write!(f, "IntBinOp({})", *op as char),
            Self::LongBinOp(op) => write!(f, "LongBinOp({})", *op as char),
            Self::FloatBinOp(op) => write!(f, "FloatBinOp({})", *op as char),
            Self::DoubleBinOp(op) => write!(f, "DoubleBinOp({})", *op as char),

            // Comparisons - use ComparisonOp's Debug
            Self::IntCmpOp(op) => write!(f, "IntCmpOp({:?})", op),
            Self::LongCmpOp(op) => write!(f, "LongCmpOp({:?})", op),
            Self::DoubleCmpOp(op) => write!(f, "DoubleCmpOp({:?})", op),
            Self::CmpOp(op) => write!(f, "CmpOp({:?})", op),

            Self::Widen(kind) => match crate::types::NumericKind::from_u8(*kind) {
                Some(kind) => write!(f, "Widen({:?})", kind),
                None => write!(f, "Widen(0x{:02X})", kind),
            },

            Self::Halt => write!(f, "Halt"),
            Self::ConstLoad(idx) => write!(f, "ConstLoad({})", idx),
            Self::ConstInt(val) => write!(f, "ConstInt({})", val),
            Self::ConstBool(val) => write!(f, "ConstBool({})", *val != 0),
            Self::WideArg(high) => write!(f, "WideArg(0x{:02X})", high),
            Self::ConstNull => write!(f, "ConstNull"),
            Self::Pop => write!(f, "Pop"),
            Self::LoadRoot => write!(f, "LoadRoot"),
            Self::LoadVariable(site) => write!(f, "LoadVariable({})", site),
            Self::NegInt => write!(f, "NegInt"),
            Self::NegLong => write!(f, "NegLong"),
            Self::NegFloat => write!(f, "NegFloat"),
            Self::NegDouble => write!(f, "NegDouble"),
            Self::Not => write!(f, "Not"),
            Self::StringConcat => write!(f, "StringConcat"),
            Self::JumpForward(offset) => write!(f, "JumpForward({})", offset),
            Self::PopJumpIfFalse(offset) => write!(f, "{:18} {}", "PopJumpIfFalse", offset),
            Self::PopJumpIfTrue(offset) => write!(f, "{:18} {}", "PopJumpIfTrue", offset),
            Self::JumpIfNull(offset) => write!(f, "{:18} {}", "JumpIfNull", offset),
            Self::ElvisJump(offset) => write!(f, "{:18} {}", "ElvisJump", offset),
            Self::Return => write!(f, "Return"),
            Self::GetProperty(site) => write!(f, "GetProperty({})", site),
            Self::CallMethod(site) => write!(f, "CallMethod({})", site),
            Self::NewObject(site) => write!(f, "NewObject({})", site),
            Self::IndexGet => write!(f, "IndexGet"),
            Self::NullCheck(site) => write!(f, "NullCheck({})", site),
            Self::CheckType(idx) => write!(f, "CheckType({})", idx),
            Self::Nop => write!(f, "Nop"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_size() {
        // Critical: instructions must be exactly 2 bytes
        assert_eq!(core::mem::size_of::<Instruction>(), 2);
        assert_eq!(Instruction::SIZE, 2);
    }

    #[test]
    fn test_instruction_alignment() {
        assert_eq!(core::mem::align_of::<Instruction>(), 1);
    }

    #[test]
    fn test_parameterized_ops() {
        let add = Instruction::IntBinOp(b'+');
        let sub = Instruction::IntBinOp(b'-');
        assert_ne!(add, sub);

        let lt = Instruction::DoubleCmpOp(ComparisonOp::Lt);
        let gt = Instruction::DoubleCmpOp(ComparisonOp::Gt);
        assert_ne!(lt, gt);
    }

    #[test]
    fn test_can_error() {
        assert!(Instruction::IntBinOp(b'/').can_error());
        assert!(!Instruction::IntBinOp(b'+').can_error());
        assert!(!Instruction::DoubleBinOp(b'/').can_error());
        assert!(Instruction::GetProperty(0).can_error());
        assert!(!Instruction::CheckType(0).can_error());
    }

    #[test]
    fn test_control_flow() {
        assert!(Instruction::JumpForward(10).is_control_flow());
        assert!(Instruction::JumpIfNull(1).is_control_flow());
        assert!(Instruction::Return.is_control_flow());
        assert!(!Instruction::IntBinOp(b'+').is_control_flow());
        assert_eq!(Instruction::ElvisJump(3).jump_offset(), Some(3));
        assert_eq!(Instruction::Pop.jump_offset(), None);
    }

    #[test]
    fn test_debug_formatting() {
        assert_eq!(format!("{:?}", Instruction::IntBinOp(b'+')), "IntBinOp(+)");
        assert_eq!(format!("{:?}", Instruction::LongCmpOp(ComparisonOp::Lt)), "LongCmpOp(Lt)");
        assert_eq!(format!("{:?}", Instruction::Widen(6)), "Widen(Double)");
        assert_eq!(format!("{:?}", Instruction::ConstBool(1)), "ConstBool(true)");
    }
}
