//! The [`Facts`] trait, implemented by whatever describes the current request.

use crate::value::Value;

/// Source of request facts for rule evaluation.
///
/// Field names are the rule field names (`category`, `tag`, `post_format`,
/// `author`, `post_type`, `logged_in`, `user_role`). Post meta is requested as
/// `meta:<key>`.
///
/// Return `None` for a field the environment does not know about at all; such
/// rules evaluate to true. Return `Some(Value::Text(""))` or an empty list for
/// a known field that simply has no value for this request.
///
/// # Example
///
/// ```
/// use codesite_rules::{Facts, Value};
///
/// struct Visitor {
///     logged_in: bool,
///     roles: Vec<String>,
/// }
///
/// impl Facts for Visitor {
///     fn fact(&self, field: &str) -> Option<Value<'_>> {
///         match field {
///             "logged_in" => Some(Value::Bool(self.logged_in)),
///             "user_role" => Some(Value::list(&self.roles)),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Facts {
    /// Returns the value of `field` for the current request.
    fn fact(&self, field: &str) -> Option<Value<'_>>;
}

impl<T: Facts + ?Sized> Facts for &T {
    fn fact(&self, field: &str) -> Option<Value<'_>> {
        (**self).fact(field)
    }
}
