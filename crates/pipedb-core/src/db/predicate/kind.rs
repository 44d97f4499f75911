use serde::{Deserialize, Serialize};
use std::fmt;

///
/// PredicateKind
///
/// Closed set of field predicate shapes. Every kind has exactly one
/// complement, and `complement` is an involution.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PredicateKind {
    AlwaysTrue = 0x01,
    AlwaysFalse = 0x02,
    IsNull = 0x03,
    IsNotNull = 0x04,
    Equal = 0x05,
    NotEqual = 0x06,
    GreaterThan = 0x07,
    LessOrEqual = 0x08,
    GreaterOrEqual = 0x09,
    LessThan = 0x0a,
    Between = 0x0b,
    NotBetween = 0x0c,
    In = 0x0d,
    NotIn = 0x0e,
    StartsWith = 0x0f,
    NotStartsWith = 0x10,
    EndsWith = 0x11,
    NotEndsWith = 0x12,
    Contains = 0x13,
    NotContains = 0x14,
}

///
/// Arity
/// Operand count accepted by a predicate kind.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Arity {
    Nullary,
    Unary,
    Binary,
    Variadic,
}

impl PredicateKind {
    pub const ALL: [Self; 20] = [
        Self::AlwaysTrue,
        Self::AlwaysFalse,
        Self::IsNull,
        Self::IsNotNull,
        Self::Equal,
        Self::NotEqual,
        Self::GreaterThan,
        Self::LessOrEqual,
        Self::GreaterOrEqual,
        Self::LessThan,
        Self::Between,
        Self::NotBetween,
        Self::In,
        Self::NotIn,
        Self::StartsWith,
        Self::NotStartsWith,
        Self::EndsWith,
        Self::NotEndsWith,
        Self::Contains,
        Self::NotContains,
    ];

    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn complement(self) -> Self {
        match self {
            Self::AlwaysTrue => Self::AlwaysFalse,
            Self::AlwaysFalse => Self::AlwaysTrue,
            Self::IsNull => Self::IsNotNull,
            Self::IsNotNull => Self::IsNull,
            Self::Equal => Self::NotEqual,
            Self::NotEqual => Self::Equal,
            Self::GreaterThan => Self::LessOrEqual,
            Self::LessOrEqual => Self::GreaterThan,
            Self::GreaterOrEqual => Self::LessThan,
            Self::LessThan => Self::GreaterOrEqual,
            Self::Between => Self::NotBetween,
            Self::NotBetween => Self::Between,
            Self::In => Self::NotIn,
            Self::NotIn => Self::In,
            Self::StartsWith => Self::NotStartsWith,
            Self::NotStartsWith => Self::StartsWith,
            Self::EndsWith => Self::NotEndsWith,
            Self::NotEndsWith => Self::EndsWith,
            Self::Contains => Self::NotContains,
            Self::NotContains => Self::Contains,
        }
    }

    #[must_use]
    pub const fn arity(self) -> Arity {
        match self {
            Self::AlwaysTrue | Self::AlwaysFalse | Self::IsNull | Self::IsNotNull => {
                Arity::Nullary
            }
            Self::Between | Self::NotBetween => Arity::Binary,
            Self::In | Self::NotIn => Arity::Variadic,
            _ => Arity::Unary,
        }
    }

    /// Kinds that decide null values themselves instead of failing them.
    #[must_use]
    pub const fn is_null_total(self) -> bool {
        matches!(self.arity(), Arity::Nullary)
    }

    /// Kinds that only apply to text fields.
    #[must_use]
    pub const fn is_text_match(self) -> bool {
        matches!(
            self,
            Self::StartsWith
                | Self::NotStartsWith
                | Self::EndsWith
                | Self::NotEndsWith
                | Self::Contains
                | Self::NotContains
        )
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::AlwaysTrue => "always_true",
            Self::AlwaysFalse => "always_false",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::Equal => "equal",
            Self::NotEqual => "not_equal",
            Self::GreaterThan => "greater_than",
            Self::LessOrEqual => "less_or_equal",
            Self::GreaterOrEqual => "greater_or_equal",
            Self::LessThan => "less_than",
            Self::Between => "between",
            Self::NotBetween => "not_between",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::StartsWith => "starts_with",
            Self::NotStartsWith => "not_starts_with",
            Self::EndsWith => "ends_with",
            Self::NotEndsWith => "not_ends_with",
            Self::Contains => "contains",
            Self::NotContains => "not_contains",
        }
    }
}

impl fmt::Display for PredicateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
