//! Condition rule trees for choosing which page template applies to a request.
//!
//! A stored template carries a rule tree such as
//!
//! ```json
//! {"match": "any", "rules": [
//!     {"field": "category", "operator": "is", "value": "news"},
//!     {"field": "logged_in", "operator": "is", "value": true}
//! ]}
//! ```
//!
//! and the resolver asks whether the tree holds for the current request. The
//! request is described through the [`Facts`] trait.
//!
//! # Evaluation Semantics
//!
//! ```text
//! empty tree   => true
//! match = all  => every rule true      (the default)
//! match = any  => at least one rule    (also any unrecognised mode)
//! ```
//!
//! | Operator | Text fact | List fact |
//! |----------|-----------|-----------|
//! | `is` | equal | membership |
//! | `is_not` | not equal | not a member |
//! | `contains` | substring | some item has the substring |
//! | `not_contains` | no substring | no item has the substring |
//!
//! Comparisons are case-sensitive. Unknown fields and unknown operators are
//! true. `logged_in` coerces the rule value to a boolean, and `meta` rules
//! carry `key:expected` in their value.
//!
//! # Quick Start
//!
//! ```rust
//! use codesite_rules::{Facts, RuleSet, Value};
//!
//! struct Request {
//!     categories: Vec<String>,
//! }
//!
//! impl Facts for Request {
//!     fn fact(&self, field: &str) -> Option<Value<'_>> {
//!         match field {
//!             "category" => Some(Value::list(&self.categories)),
//!             _ => None,
//!         }
//!     }
//! }
//!
//! let tree = RuleSet::from_json(
//!     r#"{"match": "all", "rules": [{"field": "category", "operator": "is", "value": "news"}]}"#,
//! );
//! let request = Request { categories: vec!["news".into()] };
//! assert!(tree.evaluate(&request));
//! ```

mod error;
mod op;
mod rule;
mod ruleset;
mod traits;
mod value;

pub use error::{Result, RuleError};
pub use op::Op;
pub use rule::Rule;
pub use ruleset::{MatchMode, RuleSet};
pub use traits::Facts;
pub use value::{RuleValue, Value};
