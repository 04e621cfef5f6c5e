//! Filters applied after a field resolves: `{{post_title|upper|truncate:20}}`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::date::{format_date, parse_date};
use super::ParseContext;

/// Transforms a field value.
///
/// `arg` is everything after the first `:` of the filter spec, so
/// `date:F j, Y` receives `Some("F j, Y")`.
pub trait Filter: Send + Sync {
    fn apply(&self, value: Value, arg: Option<&str>, ctx: &ParseContext<'_>) -> Value;
}

impl<F> Filter for F
where
    F: Fn(Value, Option<&str>, &ParseContext<'_>) -> Value + Send + Sync,
{
    fn apply(&self, value: Value, arg: Option<&str>, ctx: &ParseContext<'_>) -> Value {
        (self)(value, arg, ctx)
    }
}

/// Filters by name. Unknown names leave the value alone.
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: HashMap<String, Arc<dyn Filter>>,
}

impl fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.filters.keys().collect();
        names.sort();
        f.debug_struct("FilterRegistry").field("filters", &names).finish()
    }
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every built-in filter.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("upper", upper);
        registry.register("lower", lower);
        registry.register("ucfirst", ucfirst);
        registry.register("ucwords", ucwords);
        registry.register("truncate", truncate);
        registry.register("words", words);
        registry.register("date", date);
        registry.register("default", default);
        registry.register("escape", escape);
        registry.register("raw", raw);
        registry.register("strip_tags", strip_tags_filter);
        registry.register("nl2br", nl2br);
        registry.register("json", json);
        registry.register("urlencode", urlencode);
        registry.register("esc_attr", escape);
        registry.register("esc_url", esc_url_filter);
        registry
    }

    /// Registers (or replaces) a filter.
    pub fn register<F: Filter + 'static>(&mut self, name: &str, filter: F) {
        self.filters.insert(name.to_string(), Arc::new(filter));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Applies the named filter; unknown names return `value` unchanged.
    pub fn apply(&self, name: &str, value: Value, arg: Option<&str>, ctx: &ParseContext<'_>) -> Value {
        match self.filters.get(name) {
            Some(filter) => filter.apply(value, arg, ctx),
            None => value,
        }
    }
}

/// Text form of a value: strings as-is, null as empty, containers as JSON.
pub fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Null => String::new(),
        Value::Array(_) | Value::Object(_) => value.to_string(),
    }
}

/// Emptiness as the `default` filter sees it.
pub fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

fn text_filter(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    Value::String(f(&format_value(value)))
}

fn count_arg(arg: Option<&str>, default: usize) -> usize {
    arg.and_then(|a| a.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(default)
}

fn upper(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    text_filter(&value, str::to_uppercase)
}

fn lower(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    text_filter(&value, str::to_lowercase)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn ucfirst(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    text_filter(&value, capitalize)
}

fn ucwords(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    text_filter(&value, |s| {
        let mut out = String::with_capacity(s.len());
        let mut at_word_start = true;
        for c in s.chars() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = c.is_whitespace();
        }
        out
    })
}

fn truncate(value: Value, arg: Option<&str>, _: &ParseContext<'_>) -> Value {
    let length = count_arg(arg, 100);
    text_filter(&value, |s| {
        if s.chars().count() > length {
            let cut: String = s.chars().take(length).collect();
            format!("{}...", cut)
        } else {
            s.to_string()
        }
    })
}

/// Keeps the first `count` words of the tag-stripped text, appending
/// `&hellip;` when anything was cut.
pub(crate) fn trim_words(text: &str, count: usize) -> String {
    let stripped = strip_tags(text);
    let words: Vec<&str> = stripped.split_whitespace().collect();
    if words.len() > count {
        format!("{}&hellip;", words[..count].join(" "))
    } else {
        words.join(" ")
    }
}

fn words(value: Value, arg: Option<&str>, _: &ParseContext<'_>) -> Value {
    let count = count_arg(arg, 20);
    text_filter(&value, |s| trim_words(s, count))
}

fn date(value: Value, arg: Option<&str>, ctx: &ParseContext<'_>) -> Value {
    let format = arg.filter(|a| !a.is_empty()).unwrap_or(ctx.date_format());
    let parsed = match &value {
        Value::Number(n) => n.as_i64().and_then(|secs| parse_date(&secs.to_string())),
        other => parse_date(&format_value(other)),
    };
    match parsed {
        Some(dt) => Value::String(format_date(&dt, format)),
        None => value,
    }
}

fn default(value: Value, arg: Option<&str>, _: &ParseContext<'_>) -> Value {
    if is_empty_value(&value) {
        Value::String(arg.unwrap_or_default().to_string())
    } else {
        value
    }
}

/// Escapes `& < > " '` for HTML text and attribute values.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}

fn escape(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    text_filter(&value, escape_html)
}

fn raw(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    value
}

static SCRIPT_STYLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>").expect("valid regex")
});
static TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

pub(crate) fn strip_tags(s: &str) -> String {
    let without_code = SCRIPT_STYLE.replace_all(s, "");
    TAG.replace_all(&without_code, "").trim().to_string()
}

fn strip_tags_filter(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    text_filter(&value, strip_tags)
}

fn nl2br(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    text_filter(&value, |s| {
        let mut out = String::with_capacity(s.len());
        let mut chars = s.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\r' if chars.peek() == Some(&'\n') => {
                    chars.next();
                    out.push_str("<br />\r\n");
                }
                '\n' | '\r' => {
                    out.push_str("<br />");
                    out.push(c);
                }
                other => out.push(other),
            }
        }
        out
    })
}

fn json(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    Value::String(value.to_string())
}

/// Form-style URL encoding: spaces become `+`.
pub(crate) fn urlencode_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => out.push(byte as char),
            b' ' => out.push('+'),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

fn urlencode(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    text_filter(&value, urlencode_str)
}

const URL_SCHEMES: &[&str] = &[
    "http", "https", "ftp", "ftps", "mailto", "news", "irc", "irc6", "ircs", "gopher", "nntp",
    "feed", "telnet", "mms", "rtsp", "sms", "svn", "tel", "fax", "xmpp", "webcal", "urn",
];

/// Cleans a URL for output in an attribute.
///
/// Disallowed schemes (`javascript:`) yield the empty string; spaces are
/// encoded, characters that never belong in a URL are dropped, and `&` and
/// `'` are entity-encoded.
pub(crate) fn esc_url(s: &str) -> String {
    let url = s.trim();
    if url.is_empty() {
        return String::new();
    }
    if let Some((scheme, _)) = url.split_once(':') {
        let is_scheme = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if is_scheme && !URL_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str()) {
            return String::new();
        }
    }
    let mut out = String::with_capacity(url.len());
    for c in url.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '&' => out.push_str("&#038;"),
            '\'' => out.push_str("&#039;"),
            c if c.is_ascii_alphanumeric() || !c.is_ascii() => out.push(c),
            '-' | '~' | '+' | '_' | '.' | '?' | '#' | '=' | '!' | ';' | ',' | '/' | ':' | '%'
            | '@' | '$' | '|' | '*' | '(' | ')' | '[' | ']' => out.push(c),
            _ => {}
        }
    }
    out
}

fn esc_url_filter(value: Value, _: Option<&str>, _: &ParseContext<'_>) -> Value {
    text_filter(&value, esc_url)
}
