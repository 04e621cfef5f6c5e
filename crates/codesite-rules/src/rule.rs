//! A single condition rule.
//!
//! A [`Rule`] names a request field, an operator and an expected value. Rules
//! are evaluated against a [`Facts`] source describing the current request.

use serde::{Deserialize, Serialize};

use crate::op::Op;
use crate::traits::Facts;
use crate::value::{RuleValue, Value};

/// A single condition: `{field, operator, value}`.
///
/// # Example
///
/// ```
/// use codesite_rules::{Facts, Op, Rule, Value};
///
/// struct Request;
///
/// impl Facts for Request {
///     fn fact(&self, field: &str) -> Option<Value<'_>> {
///         match field {
///             "post_type" => Some(Value::Text("product")),
///             _ => None,
///         }
///     }
/// }
///
/// assert!(Rule::new("post_type", Op::Is, "product").evaluate(&Request));
/// assert!(Rule::new("post_type", Op::IsNot, "page").evaluate(&Request));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    /// The request field to inspect.
    pub field: String,
    /// How to compare.
    pub operator: Op,
    /// What to compare against.
    pub value: RuleValue,
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            field: String::new(),
            operator: Op::Is,
            value: RuleValue::default(),
        }
    }
}

impl Rule {
    /// Creates a new rule.
    pub fn new(field: impl Into<String>, operator: Op, value: impl Into<RuleValue>) -> Self {
        Rule {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Evaluates this rule against the request facts.
    ///
    /// - `meta` rules carry `key:expected` in their value and compare the
    ///   post meta `key`; a value without `:` never matches.
    /// - `logged_in` coerces the rule value to a boolean.
    /// - Fields the environment does not know, and unknown operators, are true.
    pub fn evaluate<F: Facts + ?Sized>(&self, facts: &F) -> bool {
        if let Op::Unknown(_) = self.operator {
            return true;
        }

        match self.field.as_str() {
            "meta" => {
                let value = self.value.as_text();
                let Some((key, expected)) = value.split_once(':') else {
                    return false;
                };
                let actual = facts
                    .fact(&format!("meta:{key}"))
                    .unwrap_or(Value::Text(""));
                compare(&actual, &self.operator, expected)
            }
            "logged_in" => match facts.fact("logged_in") {
                Some(Value::Bool(actual)) => {
                    let equal = actual == self.value.truthy();
                    if self.operator.is_negated() {
                        !equal
                    } else {
                        equal
                    }
                }
                Some(other) => compare(&other, &self.operator, &self.value.as_text()),
                None => true,
            },
            field => match facts.fact(field) {
                Some(actual) => compare(&actual, &self.operator, &self.value.as_text()),
                None => true,
            },
        }
    }
}

/// Compares a fact against an expected string.
fn compare(actual: &Value<'_>, op: &Op, expected: &str) -> bool {
    let positive = match (actual, op.positive()) {
        (Value::Text(s), Op::Is) => *s == expected,
        (Value::Text(s), Op::Contains) => s.contains(expected),
        (Value::List(_), Op::Is) => actual.contains_item(expected),
        (Value::List(items), Op::Contains) => items.iter().any(|item| item.contains(expected)),
        (Value::Bool(b), Op::Is) => b.to_string() == expected,
        (Value::Bool(b), Op::Contains) => b.to_string().contains(expected),
        (Value::None, _) => false,
        (_, Op::Unknown(_)) => return true,
        // positive() never yields a negated operator
        (_, Op::IsNot | Op::NotContains) => false,
    };

    if op.is_negated() {
        !positive
    } else {
        positive
    }
}
