//! Comparison operators for condition rules.
//!
//! The [`Op`] enum names the four operators a stored rule can use. Operator
//! names that are not recognised are kept as [`Op::Unknown`] so that a rule
//! written by a newer editor still loads; unknown operators evaluate to true.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RuleError;

/// Comparison operator for a condition rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Op {
    /// Exact match; membership for list-valued facts.
    Is,
    /// Negation of [`Op::Is`].
    IsNot,
    /// Substring match; any-item substring match for list-valued facts.
    Contains,
    /// Negation of [`Op::Contains`].
    NotContains,
    /// An operator name this version does not understand.
    Unknown(String),
}

impl Op {
    /// Returns the stored name of this operator.
    pub fn as_str(&self) -> &str {
        match self {
            Op::Is => "is",
            Op::IsNot => "is_not",
            Op::Contains => "contains",
            Op::NotContains => "not_contains",
            Op::Unknown(name) => name,
        }
    }

    /// Returns `true` for the negated operators.
    pub fn is_negated(&self) -> bool {
        matches!(self, Op::IsNot | Op::NotContains)
    }

    /// Returns the positive form of a negated operator.
    ///
    /// `IsNot` becomes `Is`, `NotContains` becomes `Contains`; the others are
    /// returned unchanged.
    pub fn positive(&self) -> Op {
        match self {
            Op::IsNot => Op::Is,
            Op::NotContains => Op::Contains,
            other => other.clone(),
        }
    }
}

impl FromStr for Op {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "is" => Ok(Op::Is),
            "is_not" => Ok(Op::IsNot),
            "contains" => Ok(Op::Contains),
            "not_contains" => Ok(Op::NotContains),
            other => Err(RuleError::UnknownOperator(other.to_string())),
        }
    }
}

impl From<String> for Op {
    fn from(s: String) -> Self {
        s.parse().unwrap_or(Op::Unknown(s))
    }
}

impl From<Op> for String {
    fn from(op: Op) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
