use core::fmt;

/// Arithmetic operators. Also the operation handed to the operator
/// overloader when the operands are not numeric.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "^",
        }
    }

    /// Operand byte used by the typed arithmetic instructions.
    pub fn as_byte(self) -> u8 {
        self.symbol().as_bytes()[0]
    }

    pub fn from_byte(byte: u8) -> Option<BinaryOp> {
        Some(match byte {
            b'+' => BinaryOp::Add,
            b'-' => BinaryOp::Sub,
            b'*' => BinaryOp::Mul,
            b'/' => BinaryOp::Div,
            b'%' => BinaryOp::Mod,
            b'^' => BinaryOp::Pow,
            _ => return None,
        })
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub fn symbol(self) -> &'static str {
        match self {
            ComparisonOp::Eq => "==",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        }
    }

    /// Whether an ordering satisfies this relational operator.
    pub fn holds(self, ordering: core::cmp::Ordering) -> bool {
        use core::cmp::Ordering::*;
        match self {
            ComparisonOp::Eq => ordering == Equal,
            ComparisonOp::Ne => ordering != Equal,
            ComparisonOp::Lt => ordering == Less,
            ComparisonOp::Le => ordering != Greater,
            ComparisonOp::Gt => ordering == Greater,
            ComparisonOp::Ge => ordering != Less,
        }
    }

    /// Like [`holds`](Self::holds), for operands that may be unordered (NaN).
    /// Only `!=` holds between unordered operands.
    pub fn holds_partial(self, ordering: Option<core::cmp::Ordering>) -> bool {
        match ordering {
            Some(ordering) => self.holds(ordering),
            None => self == ComparisonOp::Ne,
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

/// `++` / `--`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StepOp {
    Increment,
    Decrement,
}

/// `?[]` selects all matches, `^[]` the first, `$[]` the last.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SelectionKind {
    All,
    First,
    Last,
}
