//! Per-request stylesheet and script accumulation.

use std::collections::HashSet;
use std::fmt;

use deunicode::deunicode;
use tracing::{debug, warn};

use super::{minify, scope, validate};
use crate::model::{Block, CssScope};

/// Kind of entity a stylesheet or script came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Block,
    Layout,
    Template,
    Override,
}

impl SourceKind {
    /// Lowercase name used in collection keys.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Block => "block",
            SourceKind::Layout => "layout",
            SourceKind::Template => "template",
            SourceKind::Override => "override",
        }
    }

    fn label(self) -> &'static str {
        match self {
            SourceKind::Block => "Block",
            SourceKind::Layout => "Layout",
            SourceKind::Template => "Template",
            SourceKind::Override => "Override",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One collected stylesheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssEntry {
    pub kind: SourceKind,
    pub id: u64,
    /// CSS as stored, already scoped when a prefix was given.
    pub css: String,
}

impl CssEntry {
    /// `"<kind>-<id>"`, the deduplication key.
    pub fn key(&self) -> String {
        format!("{}-{}", self.kind, self.id)
    }
}

/// Stylesheets gathered while rendering one request.
///
/// Each `(kind, id)` contributes at most once; later additions for the same
/// source are ignored even if their text differs.
#[derive(Debug, Clone, Default)]
pub struct CssCollection {
    entries: Vec<CssEntry>,
    keys: HashSet<(SourceKind, u64)>,
}

impl CssCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stylesheet, scoping it under `scope_prefix` when given.
    ///
    /// Returns `false` when nothing was added: empty input or a source that
    /// already contributed.
    pub fn add(&mut self, css: &str, kind: SourceKind, id: u64, scope_prefix: Option<&str>) -> bool {
        if css.trim().is_empty() {
            return false;
        }
        if self.keys.contains(&(kind, id)) {
            debug!(source = %kind, id, "stylesheet already collected");
            return false;
        }
        if let Err(err) = validate(css) {
            warn!(source = %kind, id, %err, "stored CSS does not tokenize cleanly");
        }
        let css = match scope_prefix {
            Some(prefix) => scope(css, prefix),
            None => css.to_string(),
        };
        self.keys.insert((kind, id));
        self.entries.push(CssEntry { kind, id, css });
        true
    }

    /// Adds a block's CSS, scoped under `codesite-block-<id>` when the block
    /// is scoped.
    pub fn add_block(&mut self, block: &Block) -> bool {
        let prefix = match block.css_scope {
            CssScope::Scoped => Some(block.scope_class()),
            CssScope::Global => None,
        };
        self.add(&block.css, SourceKind::Block, block.id, prefix.as_deref())
    }

    pub fn contains(&self, kind: SourceKind, id: u64) -> bool {
        self.keys.contains(&(kind, id))
    }

    pub fn entries(&self) -> &[CssEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.keys.clear();
    }

    /// One `<style>` element per source, global CSS first.
    ///
    /// ```
    /// use codesite_render::css::{CssCollection, SourceKind};
    ///
    /// let mut css = CssCollection::new();
    /// css.add(".a{x:1}", SourceKind::Layout, 3, None);
    /// assert_eq!(
    ///     css.output_inline("body{margin:0}"),
    ///     "<style id=\"codesite-global-css\">\nbody{margin:0}\n</style>\n\
    ///      <style id=\"codesite-layout-3-css\">\n.a{x:1}\n</style>\n"
    /// );
    /// ```
    pub fn output_inline(&self, global_css: &str) -> String {
        let mut out = String::new();
        if !global_css.trim().is_empty() {
            out.push_str("<style id=\"codesite-global-css\">\n");
            out.push_str(global_css);
            out.push_str("\n</style>\n");
        }
        for entry in &self.entries {
            out.push_str(&format!(
                "<style id=\"codesite-{}-css\">\n{}\n</style>\n",
                slugify(&entry.key()),
                entry.css
            ));
        }
        out
    }

    /// All stylesheets concatenated under banner comments, optionally
    /// minified.
    pub fn output_merged(&self, global_css: &str, minify_output: bool) -> String {
        let mut out = String::new();
        if !global_css.trim().is_empty() {
            out.push_str("/* Global CSS */\n");
            out.push_str(global_css);
            out.push('\n');
        }
        for entry in &self.entries {
            out.push_str(&format!(
                "\n/* {} {} */\n{}\n",
                entry.kind.label(),
                entry.id,
                entry.css
            ));
        }
        if minify_output {
            minify(&out)
        } else {
            out
        }
    }
}

/// One collected script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsEntry {
    pub kind: SourceKind,
    pub id: u64,
    /// Human-readable source name.
    pub name: String,
    pub content: String,
}

/// Scripts gathered while rendering one request, in render order.
///
/// Unlike [`CssCollection`], a source that renders twice contributes twice.
#[derive(Debug, Clone, Default)]
pub struct JsCollection {
    entries: Vec<JsEntry>,
}

impl JsCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a script; empty content is ignored.
    pub fn push(&mut self, kind: SourceKind, id: u64, name: &str, content: &str) -> bool {
        if content.trim().is_empty() {
            return false;
        }
        self.entries.push(JsEntry {
            kind,
            id,
            name: name.to_string(),
            content: content.to_string(),
        });
        true
    }

    pub fn entries(&self) -> &[JsEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// A single `<script>` element: global JS, then each entry in order.
    ///
    /// Empty when there is nothing to emit.
    pub fn output(&self, global_js: &str) -> String {
        if global_js.trim().is_empty() && self.entries.is_empty() {
            return String::new();
        }
        let mut out = String::from("<script id='codesite-js'>\n");
        if !global_js.trim().is_empty() {
            out.push_str(global_js);
            out.push('\n');
        }
        for entry in &self.entries {
            out.push_str(&entry.content);
            out.push('\n');
        }
        out.push_str("</script>");
        out
    }
}

/// Lowercase ASCII slug: transliterated, runs of other characters become
/// one `-`.
pub(crate) fn slugify(text: &str) -> String {
    let ascii = deunicode(text).to_ascii_lowercase();
    let mut slug = String::with_capacity(ascii.len());
    for c in ascii.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
