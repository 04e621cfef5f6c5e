//! Stored entities: blocks, layouts, templates and per-post overrides.
//!
//! Records arrive from a storage layer that keeps structured columns
//! (`conditions`, `content_blocks`, `block_order`) as JSON-encoded strings.
//! Every such field accepts either the native shape or the encoded string,
//! and anything that fails to decode becomes the empty value instead of an
//! error.

use serde::{Deserialize, Deserializer, Serialize};

use codesite_rules::RuleSet;

/// Defines a string-backed enum that decodes leniently.
///
/// Unknown names map to a fallback variant rather than failing the whole
/// record.
macro_rules! lenient_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
        default = $default:ident, fallback = $fallback:ident;
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Returns the stored name.
            pub fn as_str(self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $( $text => $name::$variant, )+
                    _ => $name::$fallback,
                }
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub(crate) use lenient_enum;

lenient_enum! {
    /// Publication status shared by blocks, layouts and templates.
    ///
    /// Only [`Status::Active`] entities render. Unknown values count as drafts.
    pub enum Status {
        /// Rendered.
        Active => "active",
        /// Saved but not rendered.
        Draft => "draft",
        /// Deleted.
        Trash => "trash",
    }
    default = Active, fallback = Draft;
}

lenient_enum! {
    /// Whether a block's CSS is confined to the block's wrapper.
    pub enum CssScope {
        /// CSS rewritten under `.codesite-block-<id>`; HTML wrapped in a div.
        Scoped => "scoped",
        /// CSS emitted as written; HTML not wrapped.
        Global => "global",
    }
    default = Scoped, fallback = Global;
}

lenient_enum! {
    /// Page region a layout is meant for.
    pub enum LayoutKind {
        /// Page header.
        Header => "header",
        /// Page footer.
        Footer => "footer",
        /// Any other region.
        Section => "section",
    }
    default = Section, fallback = Section;
}

lenient_enum! {
    /// Which part of a page a per-post override replaces.
    pub enum OverrideType {
        /// Header, content and footer all come from the override.
        Full => "full",
        /// Only the header comes from the override.
        Header => "header",
        /// Only the footer comes from the override.
        Footer => "footer",
        /// Only the main content comes from the override.
        Content => "content",
    }
    default = Full, fallback = Full;
}

impl Status {
    /// Returns `true` for [`Status::Active`].
    pub fn is_active(self) -> bool {
        self == Status::Active
    }
}

/// A reusable HTML/CSS/JS fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Block {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub html: String,
    pub css: String,
    pub js: String,
    pub category: String,
    pub css_scope: CssScope,
    pub status: Status,
}

impl Default for Block {
    fn default() -> Self {
        Block {
            id: 0,
            name: String::new(),
            slug: String::new(),
            html: String::new(),
            css: String::new(),
            js: String::new(),
            category: "general".to_string(),
            css_scope: CssScope::Scoped,
            status: Status::Active,
        }
    }
}

impl Block {
    /// Returns the scope class for this block, `codesite-block-<id>`.
    pub fn scope_class(&self) -> String {
        format!("codesite-block-{}", self.id)
    }
}

/// A composite region built from blocks or from custom markup.
///
/// When `use_blocks` is set, `block_order` drives the content and the custom
/// fields are ignored; otherwise the custom fields drive it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Layout {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(rename = "type")]
    pub kind: LayoutKind,
    #[serde(deserialize_with = "lenient::flag")]
    pub use_blocks: bool,
    #[serde(deserialize_with = "lenient::ids")]
    pub block_order: Vec<u64>,
    pub custom_html: String,
    pub custom_css: String,
    pub custom_js: String,
    pub status: Status,
}

impl Default for Layout {
    fn default() -> Self {
        Layout {
            id: 0,
            name: String::new(),
            slug: String::new(),
            kind: LayoutKind::Section,
            use_blocks: true,
            block_order: Vec::new(),
            custom_html: String::new(),
            custom_css: String::new(),
            custom_js: String::new(),
            status: Status::Active,
        }
    }
}

/// A page template for one request classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Template {
    pub id: u64,
    pub name: String,
    pub slug: String,
    /// Request classification key, e.g. `single-post` or `archive-category`.
    pub template_type: String,
    #[serde(deserialize_with = "lenient::optional_id")]
    pub header_layout_id: Option<u64>,
    #[serde(deserialize_with = "lenient::optional_id")]
    pub footer_layout_id: Option<u64>,
    #[serde(deserialize_with = "lenient::content_items")]
    pub content_blocks: Vec<ContentItem>,
    pub custom_html: String,
    pub custom_css: String,
    pub custom_js: String,
    #[serde(deserialize_with = "lenient::rules")]
    pub conditions: RuleSet,
    /// Lower values are tried first.
    pub priority: i64,
    pub status: Status,
}

impl Default for Template {
    fn default() -> Self {
        Template {
            id: 0,
            name: String::new(),
            slug: String::new(),
            template_type: String::new(),
            header_layout_id: None,
            footer_layout_id: None,
            content_blocks: Vec::new(),
            custom_html: String::new(),
            custom_css: String::new(),
            custom_js: String::new(),
            conditions: RuleSet::default(),
            priority: 10,
            status: Status::Active,
        }
    }
}

/// A per-post replacement for all or part of the resolved template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Override {
    pub id: u64,
    pub post_id: u64,
    pub override_type: OverrideType,
    #[serde(deserialize_with = "lenient::optional_id")]
    pub header_layout_id: Option<u64>,
    #[serde(deserialize_with = "lenient::optional_id")]
    pub footer_layout_id: Option<u64>,
    #[serde(deserialize_with = "lenient::content_items")]
    pub content_blocks: Vec<ContentItem>,
    pub custom_html: String,
    pub custom_css: String,
    pub custom_js: String,
}

/// One entry of a template's or override's content list.
///
/// Integers and digit-only strings reference a block; any other string is
/// a literal fragment run through the dynamic-content engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContentItem {
    /// Reference to a block id.
    Block(u64),
    /// Literal markup with `{{field}}` tokens.
    Markup(String),
}

impl ContentItem {
    /// Classifies a decoded JSON item; other shapes yield `None`.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(id) = n.as_u64() {
                    return Some(ContentItem::Block(id));
                }
                n.as_f64()
                    .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                    .map(|f| ContentItem::Block(f as u64))
            }
            serde_json::Value::String(s) => {
                if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                    if let Ok(id) = s.parse() {
                        return Some(ContentItem::Block(id));
                    }
                }
                Some(ContentItem::Markup(s.clone()))
            }
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for ContentItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        ContentItem::from_json(&value)
            .ok_or_else(|| serde::de::Error::custom("content item must be a number or a string"))
    }
}

impl From<u64> for ContentItem {
    fn from(id: u64) -> Self {
        ContentItem::Block(id)
    }
}

impl From<&str> for ContentItem {
    fn from(markup: &str) -> Self {
        ContentItem::from_json(&serde_json::Value::String(markup.to_string()))
            .unwrap_or_else(|| ContentItem::Markup(markup.to_string()))
    }
}

/// Field decoders that accept native values or JSON-encoded strings.
pub(crate) mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;
    use tracing::debug;

    use super::ContentItem;
    use codesite_rules::RuleSet;

    /// Decodes one level of string encoding.
    fn decode(raw: Value) -> Value {
        match raw {
            Value::String(encoded) if encoded.trim().is_empty() => Value::Null,
            Value::String(encoded) => match serde_json::from_str(&encoded) {
                Ok(value) => value,
                Err(err) => {
                    debug!(%err, "stored JSON column did not decode; using empty value");
                    Value::Null
                }
            },
            other => other,
        }
    }

    fn raw<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Value, D::Error> {
        Ok(Option::<Value>::deserialize(deserializer)?.unwrap_or(Value::Null))
    }

    fn as_id(value: &Value) -> Option<u64> {
        match ContentItem::from_json(value)? {
            ContentItem::Block(id) => Some(id),
            ContentItem::Markup(_) => None,
        }
    }

    pub fn content_items<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<ContentItem>, D::Error> {
        match decode(raw(deserializer)?) {
            Value::Array(items) => Ok(items.iter().filter_map(ContentItem::from_json).collect()),
            Value::Null => Ok(Vec::new()),
            other => {
                debug!(shape = %other, "content list is not an array; using empty list");
                Ok(Vec::new())
            }
        }
    }

    pub fn ids<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u64>, D::Error> {
        match decode(raw(deserializer)?) {
            Value::Array(items) => Ok(items.iter().filter_map(as_id).collect()),
            Value::Null => Ok(Vec::new()),
            other => {
                debug!(shape = %other, "id list is not an array; using empty list");
                Ok(Vec::new())
            }
        }
    }

    /// Accepts null, a number or a numeric string. Zero means "none".
    pub fn optional_id<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<u64>, D::Error> {
        Ok(as_id(&raw(deserializer)?).filter(|id| *id != 0))
    }

    /// Accepts a boolean, `0`/`1`, or a string such as `"0"` or `"false"`.
    /// Null keeps the column default of `true`.
    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match raw(deserializer)? {
            Value::Bool(flag) => flag,
            Value::Number(n) => n.as_f64().map_or(true, |n| n != 0.0),
            Value::String(text) => !matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "" | "0" | "false" | "no" | "off"
            ),
            Value::Null => true,
            other => {
                debug!(shape = %other, "flag is not a scalar; using true");
                true
            }
        })
    }

    pub fn rules<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RuleSet, D::Error> {
        Ok(RuleSet::from_json_value(raw(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesite_rules::MatchMode;
    use serde_json::json;

    #[test]
    fn block_defaults() {
        let block: Block = serde_json::from_value(json!({"id": 3})).unwrap();
        assert_eq!(block.category, "general");
        assert_eq!(block.css_scope, CssScope::Scoped);
        assert_eq!(block.status, Status::Active);
        assert_eq!(block.scope_class(), "codesite-block-3");
    }

    #[test]
    fn unknown_enum_names_fall_back() {
        let block: Block =
            serde_json::from_value(json!({"id": 1, "status": "archived", "css_scope": "page"}))
                .unwrap();
        assert_eq!(block.status, Status::Draft);
        assert_eq!(block.css_scope, CssScope::Global);
    }

    #[test]
    fn layout_type_and_encoded_block_order() {
        let layout: Layout = serde_json::from_value(json!({
            "id": 2,
            "type": "header",
            "block_order": "[4, \"5\", \"x\"]"
        }))
        .unwrap();
        assert_eq!(layout.kind, LayoutKind::Header);
        assert!(layout.use_blocks);
        assert_eq!(layout.block_order, vec![4, 5]);
    }

    #[test]
    fn use_blocks_accepts_integer_flags() {
        let decode = |flag: serde_json::Value| -> bool {
            serde_json::from_value::<Layout>(json!({"id": 1, "use_blocks": flag}))
                .unwrap()
                .use_blocks
        };
        assert!(!decode(json!(0)));
        assert!(decode(json!(1)));
        assert!(!decode(json!("0")));
        assert!(decode(json!("1")));
        assert!(!decode(json!(false)));
        assert!(decode(json!(null)));
    }

    #[test]
    fn template_decodes_encoded_columns() {
        let template: Template = serde_json::from_value(json!({
            "id": 9,
            "template_type": "single-post",
            "header_layout_id": "0",
            "footer_layout_id": 4,
            "content_blocks": "[7, \"12\", \"<p>{{post_title}}</p>\"]",
            "conditions": "{\"match\":\"any\",\"rules\":[{\"field\":\"tag\",\"operator\":\"is\",\"value\":\"a\"}]}"
        }))
        .unwrap();
        assert_eq!(template.priority, 10);
        assert_eq!(template.header_layout_id, None);
        assert_eq!(template.footer_layout_id, Some(4));
        assert_eq!(
            template.content_blocks,
            vec![
                ContentItem::Block(7),
                ContentItem::Block(12),
                ContentItem::Markup("<p>{{post_title}}</p>".into()),
            ]
        );
        assert_eq!(template.conditions.match_mode, MatchMode::Any);
        assert_eq!(template.conditions.rules.len(), 1);
    }

    #[test]
    fn invalid_columns_become_empty() {
        let template: Template = serde_json::from_value(json!({
            "content_blocks": "{broken",
            "conditions": "nope",
        }))
        .unwrap();
        assert!(template.content_blocks.is_empty());
        assert!(template.conditions.is_unconditional());

        let template: Template =
            serde_json::from_value(json!({"content_blocks": {"a": 1}, "conditions": null}))
                .unwrap();
        assert!(template.content_blocks.is_empty());
        assert!(template.conditions.is_unconditional());
    }

    #[test]
    fn content_item_classification() {
        assert_eq!(ContentItem::from("42"), ContentItem::Block(42));
        assert_eq!(ContentItem::from("4a"), ContentItem::Markup("4a".into()));
        assert_eq!(ContentItem::from(""), ContentItem::Markup(String::new()));
        assert_eq!(ContentItem::from_json(&json!(null)), None);
        assert_eq!(ContentItem::from_json(&json!(3.0)), Some(ContentItem::Block(3)));
    }

    #[test]
    fn override_type_from_yaml() {
        let ov: Override = serde_yaml::from_str("post_id: 5\noverride_type: content\n").unwrap();
        assert_eq!(ov.override_type, OverrideType::Content);
        let ov: Override = serde_yaml::from_str("post_id: 5\n").unwrap();
        assert_eq!(ov.override_type, OverrideType::Full);
    }

    #[test]
    fn content_items_serialize_natively() {
        let items = vec![ContentItem::Block(1), ContentItem::Markup("hi".into())];
        assert_eq!(serde_json::to_value(&items).unwrap(), json!([1, "hi"]));
    }
}
