//! Field resolution for `{{field}}` tokens.
//!
//! Resolvers are registered under an exact name (`current_year`) or a
//! prefix (`post_`). Lookup tries the exact name first, then the longest
//! registered prefix the field starts with, so `post_meta:color` goes to the
//! `post_meta:` resolver rather than `post_`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::date::format_date;
use super::filters::{escape_html, trim_words};
use super::ParseContext;

/// Produces the value of a field.
///
/// Returning `None` declines the field; the engine then looks the name up in
/// the parse context's data and finally substitutes the empty string.
///
/// Closures taking `(&str, &ParseContext)` implement this trait:
///
/// ```
/// use codesite_render::dynamic::{FieldRegistry, ParseContext};
/// use codesite_render::RequestEnvironment;
///
/// let mut fields = FieldRegistry::new();
/// fields.register_prefix("shop:", |field: &str, _: &ParseContext<'_>| {
///     Some(serde_json::json!(field.trim_start_matches("shop:").to_uppercase()))
/// });
/// let env = RequestEnvironment::default();
/// let ctx = ParseContext::new(&env);
/// assert_eq!(fields.resolve("shop:cart", &ctx), serde_json::json!("CART"));
/// ```
pub trait FieldResolver: Send + Sync {
    /// Resolves `field`, which is the full identifier including any prefix.
    fn resolve(&self, field: &str, ctx: &ParseContext<'_>) -> Option<Value>;
}

impl<F> FieldResolver for F
where
    F: Fn(&str, &ParseContext<'_>) -> Option<Value> + Send + Sync,
{
    fn resolve(&self, field: &str, ctx: &ParseContext<'_>) -> Option<Value> {
        (self)(field, ctx)
    }
}

/// Exact-name and prefix resolvers.
#[derive(Clone, Default)]
pub struct FieldRegistry {
    exact: HashMap<String, Arc<dyn FieldResolver>>,
    prefixes: Vec<(String, Arc<dyn FieldResolver>)>,
}

impl fmt::Debug for FieldRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut exact: Vec<&String> = self.exact.keys().collect();
        exact.sort();
        f.debug_struct("FieldRegistry")
            .field("exact", &exact)
            .field(
                "prefixes",
                &self.prefixes.iter().map(|(p, _)| p).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl FieldRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with the built-in site, post, user, menu, widget,
    /// custom-field and clock resolvers.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_exact("current_year", current_year);
        registry.register_exact("current_date", current_date);
        registry.register_prefix("site_", site_field);
        registry.register_prefix("post_", post_field);
        registry.register_prefix("post_meta:", post_meta);
        registry.register_prefix("user_", user_field);
        registry.register_prefix("acf:", custom_field);
        registry.register_prefix("menu:", menu);
        registry.register_prefix("widget:", widget_area);
        registry
    }

    /// Registers (or replaces) the resolver for an exact field name.
    pub fn register_exact<R: FieldResolver + 'static>(&mut self, name: &str, resolver: R) {
        self.exact.insert(name.to_string(), Arc::new(resolver));
    }

    /// Registers (or replaces) the resolver for a field-name prefix.
    pub fn register_prefix<R: FieldResolver + 'static>(&mut self, prefix: &str, resolver: R) {
        let resolver: Arc<dyn FieldResolver> = Arc::new(resolver);
        match self.prefixes.iter_mut().find(|(p, _)| p == prefix) {
            Some(slot) => slot.1 = resolver,
            None => self.prefixes.push((prefix.to_string(), resolver)),
        }
    }

    fn lookup(&self, field: &str) -> Option<&Arc<dyn FieldResolver>> {
        if let Some(resolver) = self.exact.get(field) {
            return Some(resolver);
        }
        self.prefixes
            .iter()
            .filter(|(prefix, _)| field.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, resolver)| resolver)
    }

    /// Resolves a field; never fails.
    ///
    /// Falls back to the context data, then to the empty string.
    pub fn resolve(&self, field: &str, ctx: &ParseContext<'_>) -> Value {
        self.lookup(field)
            .and_then(|resolver| resolver.resolve(field, ctx))
            .or_else(|| ctx.data.get(field).cloned())
            .unwrap_or_else(|| Value::String(String::new()))
    }
}

fn text(s: impl Into<String>) -> Option<Value> {
    Some(Value::String(s.into()))
}

fn current_year(_: &str, ctx: &ParseContext<'_>) -> Option<Value> {
    text(format_date(&ctx.now(), "Y"))
}

fn current_date(_: &str, ctx: &ParseContext<'_>) -> Option<Value> {
    text(format_date(&ctx.now(), ctx.date_format()))
}

fn site_field(field: &str, ctx: &ParseContext<'_>) -> Option<Value> {
    let site = &ctx.env.site;
    match field {
        "site_name" => text(&site.name),
        "site_description" => text(&site.description),
        "site_url" => text(&site.url),
        "site_logo" => text(&site.logo_url),
        "site_logo_img" if site.logo_url.is_empty() => text(""),
        "site_logo_img" => text(format!(
            "<img src=\"{}\" class=\"codesite-logo\" alt=\"{}\">",
            escape_html(&site.logo_url),
            escape_html(&site.name)
        )),
        "site_admin_email" => text(&site.admin_email),
        "site_language" => text(&site.language),
        _ => None,
    }
}

fn term_links(terms: &[crate::environment::Term]) -> String {
    terms
        .iter()
        .map(|t| format!("<a href=\"{}\">{}</a>", escape_html(&t.url), escape_html(&t.name)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn post_field(field: &str, ctx: &ParseContext<'_>) -> Option<Value> {
    let post = ctx.post()?;
    let date_format = ctx.date_format();
    match field {
        "post_title" => text(&post.title),
        "post_content" => text(&post.content),
        "post_excerpt" if post.excerpt.trim().is_empty() => text(trim_words(&post.content, 55)),
        "post_excerpt" => text(&post.excerpt),
        "post_date" => text(post.date.map(|d| format_date(&d, date_format)).unwrap_or_default()),
        "post_modified" => text(
            post.modified
                .map(|d| format_date(&d, date_format))
                .unwrap_or_default(),
        ),
        "post_author" => text(&post.author.display_name),
        "post_author_avatar" => text(&post.author.avatar_url),
        "post_author_bio" => text(&post.author.bio),
        "post_thumbnail" => text(&post.thumbnail_url),
        "post_thumbnail_img" if post.thumbnail_url.is_empty() => text(""),
        "post_thumbnail_img" => text(format!(
            "<img src=\"{}\" class=\"codesite-thumbnail\" alt=\"{}\">",
            escape_html(&post.thumbnail_url),
            escape_html(&post.title)
        )),
        "post_categories" => text(term_links(&post.categories)),
        "post_tags" => text(term_links(&post.tags)),
        "post_id" => Some(Value::from(post.id)),
        "post_url" => text(&post.url),
        "post_type" => text(&post.post_type),
        "post_status" => text(&post.status),
        "post_comment_count" => Some(Value::from(post.comment_count)),
        _ => None,
    }
}

fn post_meta(field: &str, ctx: &ParseContext<'_>) -> Option<Value> {
    let key = field.strip_prefix("post_meta:")?;
    let post = ctx.post()?;
    text(post.meta.get(key).cloned().unwrap_or_default())
}

fn user_field(field: &str, ctx: &ParseContext<'_>) -> Option<Value> {
    let known = matches!(
        field,
        "user_name"
            | "user_login"
            | "user_email"
            | "user_avatar"
            | "user_avatar_img"
            | "user_bio"
            | "user_url"
    );
    if !known {
        return None;
    }
    let Some(user) = ctx.env.user.as_ref() else {
        return text("");
    };
    match field {
        "user_name" => text(&user.display_name),
        "user_login" => text(&user.login),
        "user_email" => text(&user.email),
        "user_avatar" => text(&user.avatar_url),
        "user_avatar_img" if user.avatar_url.is_empty() => text(""),
        "user_avatar_img" => text(format!(
            "<img src=\"{}\" class=\"avatar\" alt=\"\">",
            escape_html(&user.avatar_url)
        )),
        "user_bio" => text(&user.bio),
        _ => text(&user.url),
    }
}

fn custom_field(field: &str, ctx: &ParseContext<'_>) -> Option<Value> {
    let name = field.strip_prefix("acf:")?;
    ctx.post()?.custom_fields.get(name).cloned()
}

fn menu(field: &str, ctx: &ParseContext<'_>) -> Option<Value> {
    let location = field.strip_prefix("menu:")?;
    text(ctx.env.menus.get(location).cloned().unwrap_or_default())
}

fn widget_area(field: &str, ctx: &ParseContext<'_>) -> Option<Value> {
    let id = field.strip_prefix("widget:")?;
    text(ctx.env.widget_areas.get(id).cloned().unwrap_or_default())
}
