use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// CompareOp
///
/// Condition operator plus its capability table. Every per-operator rule the
/// builder and compiler apply is answered here, never at the call site.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[repr(u8)]
pub enum CompareOp {
    Equal = 0x01,
    NotEqual = 0x02,
    Greater = 0x03,
    GreaterOrEqual = 0x04,
    Less = 0x05,
    LessOrEqual = 0x06,
    In = 0x07,
    NotIn = 0x08,
    Like = 0x09,
    NotLike = 0x0a,
    IsNull = 0x0b,
    IsNotNull = 0x0c,
    Between = 0x0d,
    NotBetween = 0x0e,
    BitsAnd = 0x0f,
    BitsOr = 0x10,
}

impl CompareOp {
    pub const ALL: [Self; 16] = [
        Self::Equal,
        Self::NotEqual,
        Self::Greater,
        Self::GreaterOrEqual,
        Self::Less,
        Self::LessOrEqual,
        Self::In,
        Self::NotIn,
        Self::Like,
        Self::NotLike,
        Self::IsNull,
        Self::IsNotNull,
        Self::Between,
        Self::NotBetween,
        Self::BitsAnd,
        Self::BitsOr,
    ];

    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    /// Operators that take no right-hand operand.
    #[must_use]
    pub const fn is_nullary(self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// Operators that need a totally ordered field.
    #[must_use]
    pub const fn requires_ordering(self) -> bool {
        matches!(
            self,
            Self::Greater
                | Self::GreaterOrEqual
                | Self::Less
                | Self::LessOrEqual
                | Self::Between
                | Self::NotBetween
        )
    }

    #[must_use]
    pub const fn is_range(self) -> bool {
        matches!(self, Self::Between | Self::NotBetween)
    }

    #[must_use]
    pub const fn is_membership(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    #[must_use]
    pub const fn is_pattern(self) -> bool {
        matches!(self, Self::Like | Self::NotLike)
    }

    #[must_use]
    pub const fn is_bitwise(self) -> bool {
        matches!(self, Self::BitsAnd | Self::BitsOr)
    }

    /// Case-insensitive comparison is only defined for these operators.
    #[must_use]
    pub const fn supports_case_insensitive(self) -> bool {
        matches!(
            self,
            Self::Equal | Self::NotEqual | Self::In | Self::NotIn | Self::Like | Self::NotLike
        )
    }

    /// Operators legal between two fields (no NULL or range semantics).
    #[must_use]
    pub const fn supports_field_operand(self) -> bool {
        !matches!(
            self,
            Self::IsNull | Self::IsNotNull | Self::Between | Self::NotBetween
        )
    }

    /// Operators whose collection form expands into an OR-chain of
    /// per-value comparisons.
    #[must_use]
    pub const fn chains_collections(self) -> bool {
        matches!(
            self,
            Self::Greater
                | Self::GreaterOrEqual
                | Self::Less
                | Self::LessOrEqual
                | Self::Like
                | Self::NotLike
                | Self::BitsAnd
        )
    }

    /// Binary infix symbol for plain comparisons.
    #[must_use]
    pub const fn symbol(self) -> Option<&'static str> {
        match self {
            Self::Equal => Some("="),
            Self::NotEqual => Some("<>"),
            Self::Greater => Some(">"),
            Self::GreaterOrEqual => Some(">="),
            Self::Less => Some("<"),
            Self::LessOrEqual => Some("<="),
            Self::Like => Some("LIKE"),
            Self::NotLike => Some("NOT LIKE"),
            _ => None,
        }
    }
}
