use std::fmt;

use serde::{Deserialize, Serialize};

/// Comparison operator of a [`Comparison`](super::Comparison) constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operator {
    EqualTo,
    NotEqualTo,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Like,
}

impl Operator {
    /// The closed set of operators.
    pub const ALL: [Operator; 7] = [
        Self::EqualTo,
        Self::NotEqualTo,
        Self::LessThan,
        Self::LessThanOrEqualTo,
        Self::GreaterThan,
        Self::GreaterThanOrEqualTo,
        Self::Like,
    ];

    /// Symbol used in statements.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::EqualTo => "=",
            Self::NotEqualTo => "<>",
            Self::LessThan => "<",
            Self::LessThanOrEqualTo => "<=",
            Self::GreaterThan => ">",
            Self::GreaterThanOrEqualTo => ">=",
            Self::Like => "LIKE",
        }
    }

    /// Constant-style name used in error messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::EqualTo => "EQUAL_TO",
            Self::NotEqualTo => "NOT_EQUAL_TO",
            Self::LessThan => "LESS_THAN",
            Self::LessThanOrEqualTo => "LESS_THAN_OR_EQUAL_TO",
            Self::GreaterThan => "GREATER_THAN",
            Self::GreaterThanOrEqualTo => "GREATER_THAN_OR_EQUAL_TO",
            Self::Like => "LIKE",
        }
    }

    /// Looks an operator up by its statement symbol.
    #[must_use]
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.symbol().eq_ignore_ascii_case(symbol))
    }

    /// The four ordered comparisons.
    #[must_use]
    pub const fn is_range(&self) -> bool {
        matches!(
            self,
            Self::LessThan | Self::LessThanOrEqualTo | Self::GreaterThan | Self::GreaterThanOrEqualTo
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}
