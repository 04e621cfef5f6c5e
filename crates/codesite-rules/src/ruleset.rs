//! Rule trees: a match mode plus a list of rules.
//!
//! The stored shape is `{"match": "all" | "any", "rules": [...]}`. An empty or
//! absent tree is unconditional.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RuleError};
use crate::op::Op;
use crate::rule::Rule;
use crate::traits::Facts;
use crate::value::RuleValue;

/// How the rules of a [`RuleSet`] combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MatchMode {
    /// Every rule must be true.
    #[default]
    All,
    /// At least one rule must be true.
    Any,
}

impl MatchMode {
    /// Returns the stored name of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchMode::All => "all",
            MatchMode::Any => "any",
        }
    }
}

impl FromStr for MatchMode {
    type Err = RuleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "all" => Ok(MatchMode::All),
            "any" => Ok(MatchMode::Any),
            other => Err(RuleError::UnknownMatchMode(other.to_string())),
        }
    }
}

/// Anything other than `all` combines with OR.
impl From<String> for MatchMode {
    fn from(s: String) -> Self {
        if s == "all" {
            MatchMode::All
        } else {
            MatchMode::Any
        }
    }
}

impl From<MatchMode> for String {
    fn from(mode: MatchMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A condition rule tree.
///
/// # Example
///
/// ```
/// use codesite_rules::{Facts, Op, RuleSet, Value};
///
/// struct Request;
///
/// impl Facts for Request {
///     fn fact(&self, field: &str) -> Option<Value<'_>> {
///         match field {
///             "post_type" => Some(Value::Text("post")),
///             "logged_in" => Some(Value::Bool(false)),
///             _ => None,
///         }
///     }
/// }
///
/// let members_only = RuleSet::all()
///     .rule("post_type", Op::Is, "post")
///     .rule("logged_in", Op::Is, true);
/// assert!(!members_only.evaluate(&Request));
///
/// let either = RuleSet::any()
///     .rule("post_type", Op::Is, "post")
///     .rule("logged_in", Op::Is, true);
/// assert!(either.evaluate(&Request));
///
/// assert!(RuleSet::default().evaluate(&Request));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSet {
    /// How the rules combine.
    #[serde(rename = "match")]
    pub match_mode: MatchMode,
    /// The rules, evaluated in order.
    pub rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty AND tree.
    pub fn all() -> Self {
        RuleSet {
            match_mode: MatchMode::All,
            rules: Vec::new(),
        }
    }

    /// Creates an empty OR tree.
    pub fn any() -> Self {
        RuleSet {
            match_mode: MatchMode::Any,
            rules: Vec::new(),
        }
    }

    /// Adds a rule.
    pub fn rule(mut self, field: &str, op: Op, value: impl Into<RuleValue>) -> Self {
        self.rules.push(Rule::new(field, op, value));
        self
    }

    /// Returns `true` when the tree has no rules and therefore always matches.
    pub fn is_unconditional(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates the tree against the request facts.
    ///
    /// ```text
    /// empty        => true
    /// match = all  => every rule true
    /// match = any  => at least one rule true
    /// ```
    pub fn evaluate<F: Facts + ?Sized>(&self, facts: &F) -> bool {
        if self.rules.is_empty() {
            return true;
        }
        match self.match_mode {
            MatchMode::All => self.rules.iter().all(|rule| rule.evaluate(facts)),
            MatchMode::Any => self.rules.iter().any(|rule| rule.evaluate(facts)),
        }
    }

    /// Parses a stored tree, falling back to the empty tree on any error.
    ///
    /// Blank input, invalid JSON, and JSON that is not an object all yield the
    /// unconditional tree.
    pub fn from_json(json: &str) -> Self {
        if json.trim().is_empty() {
            return RuleSet::default();
        }
        match serde_json::from_str::<serde_json::Value>(json) {
            Ok(value) => RuleSet::from_json_value(value),
            Err(_) => RuleSet::default(),
        }
    }

    /// Converts an already-decoded value, falling back to the empty tree.
    ///
    /// A JSON string is decoded once more, since storage layers often keep the
    /// tree as an encoded string column.
    pub fn from_json_value(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(encoded) => RuleSet::from_json(&encoded),
            value @ serde_json::Value::Object(_) => {
                serde_json::from_value(value).unwrap_or_default()
            }
            _ => RuleSet::default(),
        }
    }

    /// Parses a stored tree, reporting malformed input.
    ///
    /// Unlike [`RuleSet::from_json`], unknown operators and match modes are
    /// errors here.
    pub fn from_json_strict(json: &str) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_str(json)?;
        if let Some(mode) = raw.get("match").and_then(|m| m.as_str()) {
            mode.parse::<MatchMode>()?;
        }
        let set: RuleSet = serde_json::from_value(raw)?;
        for rule in &set.rules {
            if let Op::Unknown(name) = &rule.operator {
                return Err(RuleError::UnknownOperator(name.clone()));
            }
        }
        Ok(set)
    }
}
