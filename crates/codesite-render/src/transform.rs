//! Content transformers run on every fragment after field substitution.
//!
//! A [`TransformerChain`] is an ordered list of [`Transformer`]s; each
//! receives the previous one's output. The default chain holds only the
//! [`ShortcodeTransformer`]. [`TemplateLogic`] hands fragments to a
//! `minijinja` environment for loops and conditionals and is opt-in.
//!
//! Any closure `Fn(&str, &ParseContext) -> String` is a transformer:
//!
//! ```rust
//! use codesite_render::dynamic::ParseContext;
//! use codesite_render::transform::TransformerChain;
//! use codesite_render::RequestEnvironment;
//!
//! let chain = TransformerChain::new()
//!     .with(|html: &str, _: &ParseContext<'_>| html.replace("(c)", "&copy;"));
//! let env = RequestEnvironment::default();
//! assert_eq!(chain.apply("(c) 2024", &ParseContext::new(&env)), "&copy; 2024");
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use minijinja::Environment;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use crate::dynamic::{format_value, ParseContext};

/// Rewrites a fragment of markup.
pub trait Transformer: Send + Sync {
    fn transform(&self, content: &str, ctx: &ParseContext<'_>) -> String;

    /// Makes one substituted field value inert for this stage, so that text
    /// coming from posts or users is never read as this stage's syntax.
    fn protect(&self, value: String) -> String {
        value
    }
}

impl<F> Transformer for F
where
    F: Fn(&str, &ParseContext<'_>) -> String + Send + Sync,
{
    fn transform(&self, content: &str, ctx: &ParseContext<'_>) -> String {
        (self)(content, ctx)
    }
}

/// Ordered transformers.
#[derive(Clone, Default)]
pub struct TransformerChain {
    stages: Vec<Arc<dyn Transformer>>,
}

impl fmt::Debug for TransformerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformerChain")
            .field("stages", &self.stages.len())
            .finish()
    }
}

impl TransformerChain {
    /// An empty chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain holding the shortcode transformer.
    pub fn with_defaults() -> Self {
        Self::new().with(ShortcodeTransformer::new())
    }

    /// Appends a stage.
    pub fn with<T: Transformer + 'static>(mut self, transformer: T) -> Self {
        self.push(transformer);
        self
    }

    pub fn push<T: Transformer + 'static>(&mut self, transformer: T) {
        self.stages.push(Arc::new(transformer));
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Protects a substituted value for every stage. The last stage wraps
    /// first, so each stage unwraps its own layer on the way through.
    pub fn protect(&self, value: String) -> String {
        self.stages
            .iter()
            .rev()
            .fold(value, |acc, stage| stage.protect(acc))
    }

    /// Runs every stage in order.
    pub fn apply(&self, content: &str, ctx: &ParseContext<'_>) -> String {
        self.stages
            .iter()
            .fold(content.to_string(), |acc, stage| stage.transform(&acc, ctx))
    }
}

/// Shortcode attributes. Positional attributes are keyed `"0"`, `"1"`, ...
pub type Attributes = BTreeMap<String, String>;

/// Expands one shortcode.
///
/// `inner` is the enclosed content for the `[tag]...[/tag]` form and `None`
/// for the self-closing form.
pub trait ShortcodeHandler: Send + Sync {
    fn render(&self, attrs: &Attributes, inner: Option<&str>, ctx: &ParseContext<'_>) -> String;
}

impl<F> ShortcodeHandler for F
where
    F: Fn(&Attributes, Option<&str>, &ParseContext<'_>) -> String + Send + Sync,
{
    fn render(&self, attrs: &Attributes, inner: Option<&str>, ctx: &ParseContext<'_>) -> String {
        (self)(attrs, inner, ctx)
    }
}

static SCD_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<SCD>(.*?)</SCD>").expect("valid regex"));
static SHORTCODE_OPEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([A-Za-z0-9_-]+)((?:\s[^\]]*?)?)(/?)\]").expect("valid regex"));
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"([A-Za-z0-9_-]+)\s*=\s*"([^"]*)"|([A-Za-z0-9_-]+)\s*=\s*'([^']*)'|([A-Za-z0-9_-]+)\s*=\s*([^\s'"]+)|"([^"]*)"|'([^']*)'|(\S+)"#,
    )
    .expect("valid regex")
});

/// Parses a shortcode attribute string such as `id="4" size=large hero`.
pub fn parse_attributes(text: &str) -> Attributes {
    let mut attrs = Attributes::new();
    let mut position = 0usize;
    for caps in ATTRIBUTE.captures_iter(text) {
        let named = [(1, 2), (3, 4), (5, 6)]
            .iter()
            .find_map(|&(k, v)| Some((caps.get(k)?, caps.get(v)?)));
        match named {
            Some((key, value)) => {
                attrs.insert(key.as_str().to_ascii_lowercase(), value.as_str().to_string());
            }
            None => {
                if let Some(value) = caps.get(7).or(caps.get(8)).or(caps.get(9)) {
                    attrs.insert(position.to_string(), value.as_str().to_string());
                    position += 1;
                }
            }
        }
    }
    attrs
}

/// Expands `<SCD>...</SCD>` wrappers.
///
/// Inside a wrapper, registered shortcodes (`[tag attr="v"]`,
/// `[tag]inner[/tag]`) are replaced by their handler's output. Unregistered
/// shortcodes are left as written; the wrapper itself is always removed.
///
/// ```
/// use codesite_render::dynamic::ParseContext;
/// use codesite_render::transform::{Attributes, ShortcodeTransformer, Transformer};
/// use codesite_render::RequestEnvironment;
///
/// let mut shortcodes = ShortcodeTransformer::new();
/// shortcodes.register("badge", |attrs: &Attributes, inner: Option<&str>, _: &ParseContext<'_>| {
///     format!("<b class=\"{}\">{}</b>", attrs["tone"], inner.unwrap_or(""))
/// });
/// let env = RequestEnvironment::default();
/// let ctx = ParseContext::new(&env);
/// assert_eq!(
///     shortcodes.transform("<SCD>[badge tone=new]Hot[/badge]</SCD> [badge]", &ctx),
///     "<b class=\"new\">Hot</b> [badge]"
/// );
/// ```
#[derive(Clone, Default)]
pub struct ShortcodeTransformer {
    handlers: HashMap<String, Arc<dyn ShortcodeHandler>>,
}

impl fmt::Debug for ShortcodeTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&String> = self.handlers.keys().collect();
        tags.sort();
        f.debug_struct("ShortcodeTransformer").field("tags", &tags).finish()
    }
}

impl ShortcodeTransformer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the handler for `tag`.
    pub fn register<H: ShortcodeHandler + 'static>(&mut self, tag: &str, handler: H) {
        self.handlers.insert(tag.to_string(), Arc::new(handler));
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Expands the shortcodes in `text`, which is the content of one wrapper.
    pub fn expand(&self, text: &str, ctx: &ParseContext<'_>) -> String {
        let mut out = String::with_capacity(text.len());
        let mut pos = 0;
        while let Some(caps) = SHORTCODE_OPEN.captures_at(text, pos) {
            let Some(whole) = caps.get(0) else {
                break;
            };
            let tag = &caps[1];
            out.push_str(&text[pos..whole.start()]);
            let Some(handler) = self.handlers.get(tag) else {
                out.push_str(whole.as_str());
                pos = whole.end();
                continue;
            };
            let attrs = parse_attributes(&caps[2]);
            let self_closing = !caps[3].is_empty();
            let closing = format!("[/{}]", tag);
            let enclosed = if self_closing {
                None
            } else {
                text[whole.end()..]
                    .find(&closing)
                    .map(|offset| whole.end() + offset)
            };
            match enclosed {
                Some(close_at) => {
                    let inner = &text[whole.end()..close_at];
                    out.push_str(&handler.render(&attrs, Some(inner), ctx));
                    pos = close_at + closing.len();
                }
                None => {
                    out.push_str(&handler.render(&attrs, None, ctx));
                    pos = whole.end();
                }
            }
        }
        out.push_str(&text[pos..]);
        out
    }
}

impl Transformer for ShortcodeTransformer {
    fn transform(&self, content: &str, ctx: &ParseContext<'_>) -> String {
        if !content.contains("<SCD>") {
            return content.to_string();
        }
        SCD_BLOCK
            .replace_all(content, |caps: &regex::Captures<'_>| self.expand(&caps[1], ctx))
            .into_owned()
    }
}

/// Renders fragments through `minijinja`.
///
/// The template sees `post`, `posts`, `user`, `site` and `request` (the
/// request kind) plus every value of the parse context's data. Fragments
/// without `{%` or `{{` are returned as they are; render errors are logged
/// and the fragment passes through unchanged.
///
/// Substituted field values are escaped (see [`Transformer::protect`]), so a
/// post title such as `Hi {{ user.email }}` renders as written.
///
/// ```
/// use codesite_render::dynamic::ParseContext;
/// use codesite_render::transform::{TemplateLogic, Transformer};
/// use codesite_render::{PostRecord, RequestEnvironment, RequestKind};
///
/// let env = RequestEnvironment::new(RequestKind::Single).with_post(PostRecord {
///     title: "Notes".into(),
///     ..PostRecord::default()
/// });
/// let logic = TemplateLogic::new();
/// let html = logic.transform("{% if post %}<h1>{{ post.title }}</h1>{% endif %}", &ParseContext::new(&env));
/// assert_eq!(html, "<h1>Notes</h1>");
/// ```
pub struct TemplateLogic {
    env: Environment<'static>,
}

impl fmt::Debug for TemplateLogic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateLogic").finish_non_exhaustive()
    }
}

impl Default for TemplateLogic {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateLogic {
    pub fn new() -> Self {
        let mut env = Environment::new();
        register_filters(&mut env);
        TemplateLogic { env }
    }

    /// Gives access to the underlying environment, for registering filters
    /// and globals.
    pub fn environment_mut(&mut self) -> &mut Environment<'static> {
        &mut self.env
    }

    fn context(ctx: &ParseContext<'_>) -> Map<String, Value> {
        let mut data = ctx.data.clone();
        let to_value = |v: Result<Value, serde_json::Error>| v.unwrap_or(Value::Null);
        data.insert("post".into(), to_value(serde_json::to_value(ctx.post())));
        data.insert("posts".into(), to_value(serde_json::to_value(&ctx.env.posts)));
        data.insert("user".into(), to_value(serde_json::to_value(&ctx.env.user)));
        data.insert("site".into(), to_value(serde_json::to_value(&ctx.env.site)));
        data.insert("request".into(), to_value(serde_json::to_value(ctx.env.kind)));
        data
    }
}

impl Transformer for TemplateLogic {
    fn transform(&self, content: &str, ctx: &ParseContext<'_>) -> String {
        if !content.contains("{%") && !content.contains("{{") {
            return content.to_string();
        }
        match self.env.render_str(content, Self::context(ctx)) {
            Ok(rendered) => rendered,
            Err(err) => {
                warn!(%err, "template logic failed; fragment passed through unchanged");
                content.to_string()
            }
        }
    }

    fn protect(&self, value: String) -> String {
        escape_delimiters(&value)
    }
}

/// Rewrites every `{` that could open a `{{`, `{%` or `{#` delimiter, along
/// with a leading `{`, `%` or `#` and a trailing `{`, as a string expression.
fn escape_delimiters(value: &str) -> String {
    if !value.contains(['{', '%', '#']) {
        return value.to_string();
    }
    let mut out = String::with_capacity(value.len() + 16);
    let mut chars = value.chars().peekable();
    let mut first = true;
    while let Some(c) = chars.next() {
        let opens = match c {
            '{' => first || matches!(chars.peek(), None | Some('{' | '%' | '#')),
            '%' | '#' => first,
            _ => false,
        };
        if opens {
            out.push_str("{{ '");
            out.push(c);
            out.push_str("' }}");
        } else {
            out.push(c);
        }
        first = false;
    }
    out
}

/// Filters available inside template-logic fragments.
fn register_filters(env: &mut Environment<'static>) {
    env.add_filter("words", |value: minijinja::Value, count: Option<usize>| -> String {
        crate::dynamic::trim_words(&value.to_string(), count.unwrap_or(20))
    });
    env.add_filter("esc_url", |value: String| -> String { crate::dynamic::esc_url(&value) });
    env.add_filter("text", |value: minijinja::Value| -> String {
        let json = serde_json::to_value(&value).unwrap_or(Value::Null);
        format_value(&json)
    });
}
