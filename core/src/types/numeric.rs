//! The numeric promotion ladder.

use super::TypeDescriptor;

/// Numeric kinds, ordered by promotion rank.
///
/// When two numeric operands meet, the result kind is the higher of the two,
/// with anything below `Int` promoted to `Int`:
///
/// ```text
/// BigDecimal > Double > Float > BigInteger > Long > Int (Short, Byte)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum NumericKind {
    Byte = 0,
    Short = 1,
    Int = 2,
    Long = 3,
    BigInteger = 4,
    Float = 5,
    Double = 6,
    BigDecimal = 7,
}

/// Primitive widening chain used for overload ranking.
const WIDENING_CHAIN: [NumericKind; 6] = [
    NumericKind::Byte,
    NumericKind::Short,
    NumericKind::Int,
    NumericKind::Long,
    NumericKind::Float,
    NumericKind::Double,
];

impl NumericKind {
    /// Result kind of a binary arithmetic operation between `self` and `other`.
    pub fn promote(self, other: NumericKind) -> NumericKind {
        self.max(other).max(NumericKind::Int)
    }

    pub fn descriptor(self) -> TypeDescriptor {
        match self {
            NumericKind::Byte => TypeDescriptor::Byte,
            NumericKind::Short => TypeDescriptor::Short,
            NumericKind::Int => TypeDescriptor::Int,
            NumericKind::Long => TypeDescriptor::Long,
            NumericKind::BigInteger => TypeDescriptor::BigInteger,
            NumericKind::Float => TypeDescriptor::Float,
            NumericKind::Double => TypeDescriptor::Double,
            NumericKind::BigDecimal => TypeDescriptor::BigDecimal,
        }
    }

    /// True for the kinds the bytecode has dedicated instructions for.
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            NumericKind::Int | NumericKind::Long | NumericKind::Float | NumericKind::Double
        )
    }

    /// Number of widening steps from `self` to `target`, if `self` widens to it.
    pub fn widening_steps(self, target: NumericKind) -> Option<u32> {
        let from = WIDENING_CHAIN.iter().position(|k| *k == self)?;
        let to = WIDENING_CHAIN.iter().position(|k| *k == target)?;
        (to >= from).then(|| (to - from) as u32)
    }

    pub fn from_u8(byte: u8) -> Option<NumericKind> {
        Some(match byte {
            0 => NumericKind::Byte,
            1 => NumericKind::Short,
            2 => NumericKind::Int,
            3 => NumericKind::Long,
            4 => NumericKind::BigInteger,
            5 => NumericKind::Float,
            6 => NumericKind::Double,
            7 => NumericKind::BigDecimal,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_promotion_is_symmetric() {
        use NumericKind::*;
        let kinds = [Byte, Short, Int, Long, BigInteger, Float, Double, BigDecimal];
        for a in kinds {
            for b in kinds {
                assert_eq!(a.promote(b), b.promote(a), "{a:?} vs {b:?}");
            }
        }
    }

    #[test]
    fn test_promotion_ladder() {
        use NumericKind::*;
        assert_eq!(Short.promote(Byte), Int);
        assert_eq!(Int.promote(Long), Long);
        assert_eq!(Long.promote(BigInteger), BigInteger);
        assert_eq!(BigInteger.promote(Float), Float);
        assert_eq!(Float.promote(Double), Double);
        assert_eq!(Double.promote(BigDecimal), BigDecimal);
    }

    #[test]
    fn test_widening_steps() {
        use NumericKind::*;
        assert_eq!(Int.widening_steps(Int), Some(0));
        assert_eq!(Int.widening_steps(Long), Some(1));
        assert_eq!(Byte.widening_steps(Double), Some(5));
        assert_eq!(Long.widening_steps(Int), None);
        assert_eq!(Int.widening_steps(BigDecimal), None);
    }

    #[test]
    fn test_from_u8_roundtrips_discriminant() {
        assert_eq!(NumericKind::from_u8(NumericKind::Double as u8), Some(NumericKind::Double));
        assert_eq!(NumericKind::from_u8(42), None);
    }
}
