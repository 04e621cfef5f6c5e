//! Fact values and rule values.
//!
//! [`Value`] is what the request environment reports for a field at
//! evaluation time (borrowed from the environment). [`RuleValue`] is the owned
//! expected value stored in a rule.

use serde::{Deserialize, Serialize};

/// Runtime value of a request fact, borrowed from the environment.
///
/// # Example
///
/// ```
/// use codesite_rules::Value;
///
/// let categories = vec!["news".to_string(), "sport".to_string()];
/// let fact = Value::list(&categories);
/// assert!(fact.contains_item("news"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    /// Single string fact (post type, author login, meta value).
    Text(&'a str),
    /// List-valued fact (category slugs, tag slugs, user roles).
    List(Vec<&'a str>),
    /// Boolean fact (`logged_in`).
    Bool(bool),
    /// The environment has no value for this field.
    None,
}

impl<'a> Value<'a> {
    /// Builds a list value from owned strings.
    pub fn list<S: AsRef<str>>(items: &'a [S]) -> Self {
        Value::List(items.iter().map(|s| s.as_ref()).collect())
    }

    /// Returns `true` if this is a `None` value.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Extracts the string value, if present.
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Extracts the boolean value, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns `true` if a list value holds exactly `item`.
    pub fn contains_item(&self, item: &str) -> bool {
        match self {
            Value::List(items) => items.iter().any(|i| *i == item),
            _ => false,
        }
    }
}

/// Expected value stored in a rule.
///
/// Stored rules come from JSON written by an editor, so the value may be a
/// string, a boolean, or a number. Numbers compare as their decimal text;
/// anything else (null, arrays, objects) becomes the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "serde_json::Value", into = "serde_json::Value")]
pub enum RuleValue {
    /// String value.
    Text(String),
    /// Boolean value.
    Bool(bool),
}

impl RuleValue {
    /// Returns the value as text.
    ///
    /// Booleans render as `"true"` / `"false"`.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            RuleValue::Text(s) => std::borrow::Cow::Borrowed(s),
            RuleValue::Bool(b) => std::borrow::Cow::Owned(b.to_string()),
        }
    }

    /// Coerces the value to a boolean: `true` and `"true"` are true.
    pub fn truthy(&self) -> bool {
        match self {
            RuleValue::Bool(b) => *b,
            RuleValue::Text(s) => s == "true",
        }
    }
}

impl Default for RuleValue {
    fn default() -> Self {
        RuleValue::Text(String::new())
    }
}

impl From<serde_json::Value> for RuleValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => RuleValue::Text(s),
            serde_json::Value::Bool(b) => RuleValue::Bool(b),
            serde_json::Value::Number(n) => RuleValue::Text(n.to_string()),
            _ => RuleValue::Text(String::new()),
        }
    }
}

impl From<RuleValue> for serde_json::Value {
    fn from(value: RuleValue) -> Self {
        match value {
            RuleValue::Text(s) => serde_json::Value::String(s),
            RuleValue::Bool(b) => serde_json::Value::Bool(b),
        }
    }
}

impl From<&str> for RuleValue {
    fn from(s: &str) -> Self {
        RuleValue::Text(s.to_string())
    }
}

impl From<String> for RuleValue {
    fn from(s: String) -> Self {
        RuleValue::Text(s)
    }
}

impl From<bool> for RuleValue {
    fn from(b: bool) -> Self {
        RuleValue::Bool(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn list_membership() {
        let roles = vec!["editor".to_string(), "author".to_string()];
        let value = Value::list(&roles);
        assert!(value.contains_item("editor"));
        assert!(!value.contains_item("edit"));
        assert!(!Value::Text("editor").contains_item("editor"));
    }

    #[test]
    fn rule_value_from_json() {
        assert_eq!(RuleValue::from(json!("news")), RuleValue::Text("news".into()));
        assert_eq!(RuleValue::from(json!(true)), RuleValue::Bool(true));
        assert_eq!(RuleValue::from(json!(42)), RuleValue::Text("42".into()));
        assert_eq!(RuleValue::from(json!(null)), RuleValue::Text(String::new()));
    }

    #[test]
    fn truthiness() {
        assert!(RuleValue::Bool(true).truthy());
        assert!(RuleValue::Text("true".into()).truthy());
        assert!(!RuleValue::Text("1".into()).truthy());
        assert!(!RuleValue::Text("TRUE".into()).truthy());
        assert!(!RuleValue::Bool(false).truthy());
    }

    #[test]
    fn text_view_of_bool() {
        assert_eq!(RuleValue::Bool(false).as_text(), "false");
        assert_eq!(RuleValue::Text("x".into()).as_text(), "x");
    }
}
