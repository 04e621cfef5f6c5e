//! `{{field|filter:arg}}` substitution.
//!
//! # Syntax
//!
//! ```text
//! {{post_title}}
//! {{post_excerpt|words:10|upper}}
//! {{post_date|date:F j, Y}}
//! {{post_meta:subtitle|default:Untitled}}
//! ```
//!
//! The identifier may contain ASCII letters, digits, `_`, `:`, `-` and `.`.
//! Filters are separated by `|`; a filter's argument is everything after its
//! first `:` up to the next `|`.
//!
//! A `{{` that does not open a well-formed token (for example `{{ user.name }}`
//! with spaces, meant for a template-logic engine further down the chain) is
//! copied through untouched, and scanning retries one byte later, so
//! `{{{post_id}}}` becomes `{7}`. Substituted text is never scanned again, so a
//! post title containing `{{site_name}}` stays literal.
//!
//! # Example
//!
//! ```rust
//! use codesite_render::dynamic::{parse, ParseContext};
//! use codesite_render::{PostRecord, RequestEnvironment, RequestKind};
//!
//! let env = RequestEnvironment::new(RequestKind::Single).with_post(PostRecord {
//!     id: 3,
//!     title: "Release notes".into(),
//!     ..PostRecord::default()
//! });
//! let ctx = ParseContext::new(&env);
//! assert_eq!(parse("<h1>{{post_title|upper}}</h1>", &ctx), "<h1>RELEASE NOTES</h1>");
//! assert_eq!(parse("{{ post_title }}", &ctx), "{{ post_title }}");
//! ```

mod date;
mod fields;
mod filters;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};

use crate::environment::{PostRecord, RequestEnvironment};

pub use date::{format_date, parse_date};
pub use fields::{FieldRegistry, FieldResolver};
pub use filters::{escape_html, format_value, is_empty_value, Filter, FilterRegistry};

pub(crate) use filters::{esc_url, trim_words};

/// Data a parse runs against: the request plus ad-hoc values.
///
/// `data["post_id"]`, when present, selects which post the `post_*` fields
/// describe; otherwise they describe the queried post.
#[derive(Debug, Clone)]
pub struct ParseContext<'a> {
    pub env: &'a RequestEnvironment,
    pub data: Map<String, Value>,
}

impl<'a> ParseContext<'a> {
    pub fn new(env: &'a RequestEnvironment) -> Self {
        ParseContext {
            env,
            data: Map::new(),
        }
    }

    /// A context whose `post_*` fields describe post `post_id`.
    pub fn for_post(env: &'a RequestEnvironment, post_id: u64) -> Self {
        Self::new(env).with("post_id", post_id)
    }

    /// Adds a value reachable as `{{key}}` when no resolver claims the name.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn post_id(&self) -> Option<u64> {
        match self.data.get("post_id") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            Some(_) => None,
            None => self.env.post_id(),
        }
    }

    /// The post `post_*` fields read from.
    pub fn post(&self) -> Option<&'a PostRecord> {
        match self.data.get("post_id") {
            Some(_) => self.post_id().and_then(|id| self.env.find_post(id)),
            None => self.env.post.as_ref(),
        }
    }

    /// The clock for `current_year` and `current_date`.
    pub fn now(&self) -> DateTime<Utc> {
        self.env.now
    }

    pub fn date_format(&self) -> &'a str {
        &self.env.site.date_format
    }
}

/// A parsed `{{...}}` token.
#[derive(Debug, PartialEq)]
struct Token<'s> {
    field: &'s str,
    filters: Vec<(&'s str, Option<&'s str>)>,
}

fn is_field_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.')
}

fn is_filter_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parses the text after a `{{`, returning the token and the bytes consumed
/// including the closing `}}`.
fn scan_token(after_open: &str) -> Option<(Token<'_>, usize)> {
    let close = after_open.find("}}")?;
    let inner = &after_open[..close];
    let mut parts = inner.split('|');
    let field = parts.next()?;
    if field.is_empty() || !field.chars().all(is_field_char) {
        return None;
    }
    let mut filters = Vec::new();
    for spec in parts {
        let (name, arg) = match spec.split_once(':') {
            Some((name, arg)) => (name, Some(arg)),
            None => (spec, None),
        };
        if name.is_empty() || !name.chars().all(is_filter_char) {
            return None;
        }
        filters.push((name, arg));
    }
    Some((Token { field, filters }, close + 2))
}

/// The substitution engine: a field registry plus a filter registry.
#[derive(Debug, Clone)]
pub struct DynamicContent {
    fields: FieldRegistry,
    filters: FilterRegistry,
}

impl Default for DynamicContent {
    fn default() -> Self {
        DynamicContent {
            fields: FieldRegistry::with_builtins(),
            filters: FilterRegistry::with_builtins(),
        }
    }
}

impl DynamicContent {
    /// Creates an engine with the built-in fields and filters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(&self) -> &FieldRegistry {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut FieldRegistry {
        &mut self.fields
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut FilterRegistry {
        &mut self.filters
    }

    /// Substitutes every well-formed token in `content`.
    pub fn parse(&self, content: &str, ctx: &ParseContext<'_>) -> String {
        self.parse_with(content, ctx, |value| value)
    }

    /// Like [`parse`](Self::parse), passing every substituted value through
    /// `protect` before it is appended.
    pub fn parse_with<P>(&self, content: &str, ctx: &ParseContext<'_>, protect: P) -> String
    where
        P: Fn(String) -> String,
    {
        let mut out = String::with_capacity(content.len());
        let mut rest = content;
        while let Some(open) = rest.find("{{") {
            out.push_str(&rest[..open]);
            match scan_token(&rest[open + 2..]) {
                Some((token, consumed)) => {
                    out.push_str(&protect(self.evaluate(&token, ctx)));
                    rest = &rest[open + 2 + consumed..];
                }
                None => {
                    out.push('{');
                    rest = &rest[open + 1..];
                }
            }
        }
        out.push_str(rest);
        out
    }

    fn evaluate(&self, token: &Token<'_>, ctx: &ParseContext<'_>) -> String {
        let value = self.fields.resolve(token.field, ctx);
        let value = token
            .filters
            .iter()
            .fold(value, |value, (name, arg)| self.filters.apply(name, value, *arg, ctx));
        format_value(&value)
    }
}

static DEFAULT_ENGINE: Lazy<DynamicContent> = Lazy::new(DynamicContent::default);

/// Parses with the built-in fields and filters.
pub fn parse(content: &str, ctx: &ParseContext<'_>) -> String {
    DEFAULT_ENGINE.parse(content, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::RequestKind;
    use chrono::{Datelike, TimeZone};

    fn env() -> RequestEnvironment {
        let mut env = RequestEnvironment::new(RequestKind::Single).with_post(PostRecord {
            id: 7,
            title: "Hello {{site_name}}".into(),
            excerpt: "alpha beta gamma delta epsilon zeta eta theta iota kappa lambda mu".into(),
            ..PostRecord::default()
        });
        env.site.name = "Acme".into();
        env
    }

    #[test]
    fn scans_tokens() {
        let (token, consumed) = scan_token("post_title|truncate:5|upper}} tail").unwrap();
        assert_eq!(token.field, "post_title");
        assert_eq!(token.filters, vec![("truncate", Some("5")), ("upper", None)]);
        assert_eq!(consumed, "post_title|truncate:5|upper}}".len());
        assert!(scan_token(" post_title }}").is_none());
        assert!(scan_token("post_title|}}").is_none());
        assert!(scan_token("}}").is_none());
        assert!(scan_token("post_title").is_none());
    }

    #[test]
    fn current_year_is_four_digits() {
        let env = RequestEnvironment::default();
        let ctx = ParseContext::new(&env);
        let year = parse("{{current_year}}", &ctx);
        assert_eq!(year.len(), 4);
        assert_eq!(year, env.now.year().to_string());
    }

    #[test]
    fn substitutes_and_filters() {
        let env = env();
        let ctx = ParseContext::new(&env);
        assert_eq!(parse("{{post_title|upper}}", &ctx), "HELLO {{SITE_NAME}}");
        assert_eq!(parse("[{{bogus_field}}]", &ctx), "[]");
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let env = env();
        let ctx = ParseContext::new(&env);
        assert_eq!(parse("{{post_title}}", &ctx), "Hello {{site_name}}");
    }

    #[test]
    fn protect_sees_only_substituted_text() {
        let env = env();
        let ctx = ParseContext::new(&env);
        let engine = DynamicContent::new();
        assert_eq!(
            engine.parse_with("<{{post_id}}>{{ x }}", &ctx, |value| format!("[{}]", value)),
            "<[7]>{{ x }}"
        );
    }

    #[test]
    fn filters_chain_left_to_right() {
        let env = env();
        let ctx = ParseContext::new(&env);
        assert_eq!(
            parse("{{post_excerpt|words:10|upper}}", &ctx),
            "ALPHA BETA GAMMA DELTA EPSILON ZETA ETA THETA IOTA KAPPA&HELLIP;"
        );
    }

    #[test]
    fn filter_arguments_keep_spaces_and_commas() {
        let mut env = env();
        env.now = Utc.with_ymd_and_hms(2024, 7, 4, 12, 0, 0).unwrap();
        let ctx = ParseContext::new(&env).with("launch", "2024-01-15");
        assert_eq!(parse("{{launch|date:D, M j}}", &ctx), "Mon, Jan 15");
        assert_eq!(parse("{{missing|default:n/a, sorry}}", &ctx), "n/a, sorry");
    }

    #[test]
    fn malformed_openers_are_literal() {
        let env = env();
        let ctx = ParseContext::new(&env);
        assert_eq!(parse("a {{ b {{post_id}} c", &ctx), "a {{ b 7 c");
        assert_eq!(parse("{{ user.name }}", &ctx), "{{ user.name }}");
        assert_eq!(parse("{{unclosed", &ctx), "{{unclosed");
        assert_eq!(parse("{{{post_id}}}", &ctx), "{7}");
        assert_eq!(parse("{{ {{post_id}}", &ctx), "{{ 7");
    }

    #[test]
    fn context_data_and_post_override() {
        let mut env = env();
        env.posts.push(PostRecord {
            id: 8,
            title: "Second".into(),
            ..PostRecord::default()
        });
        let ctx = ParseContext::for_post(&env, 8).with("label", 42);
        assert_eq!(parse("{{post_title}} {{label}} {{post_id}}", &ctx), "Second 42 8");
        assert_eq!(ctx.post_id(), Some(8));
    }

    #[test]
    fn custom_registrations() {
        let env = env();
        let ctx = ParseContext::new(&env);
        let mut engine = DynamicContent::new();
        engine
            .filters_mut()
            .register("shout", |v: Value, _: Option<&str>, _: &ParseContext<'_>| {
                Value::String(format!("{}!", format_value(&v)))
            });
        engine
            .fields_mut()
            .register_exact("answer", |_: &str, _: &ParseContext<'_>| Some(Value::from(42)));
        assert_eq!(engine.parse("{{answer|shout}}", &ctx), "42!");
    }
}
