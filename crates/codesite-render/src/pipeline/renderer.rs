use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::context::RenderContext;
use super::defaults::{DefaultContent, PostLoop};
use crate::css::SourceKind;
use crate::dynamic::{DynamicContent, ParseContext};
use crate::environment::{QueryClassifier, RequestClassifier, RequestEnvironment};
use crate::model::{Block, ContentItem, CssScope, Layout, Override, OverrideType, Template};
use crate::resolver::resolve_for_request;
use crate::settings::OutputMode;
use crate::store::EntityStore;
use crate::transform::{Transformer, TransformerChain};

/// Markup plus the two asset injections for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    /// Body markup.
    pub html: String,
    /// `<style>` markup for the document head.
    pub css: String,
    /// `<script>` markup for the end of the body.
    pub js: String,
}

/// Turns a request into markup using the entities of a store.
///
/// The pipeline holds no per-request state; CSS and JS are gathered into the
/// [`RenderContext`] passed to each call. Rendering never fails: missing or
/// inactive entities are skipped and logged at debug level.
///
/// ```
/// use codesite_render::{Block, MemoryStore, RenderPipeline, RequestEnvironment, RequestKind, Template};
/// use codesite_render::model::ContentItem;
///
/// let mut store = MemoryStore::new();
/// store.insert_block(Block { id: 7, html: "<p class=\"box\">hi</p>".into(), css: ".box{color:blue}".into(), ..Block::default() });
/// store.insert_template(Template {
///     id: 1,
///     template_type: "home".into(),
///     content_blocks: vec![ContentItem::Block(7)],
///     ..Template::default()
/// });
///
/// let page = RenderPipeline::new(store).render_page(&RequestEnvironment::new(RequestKind::Home));
/// assert!(page.html.contains("class=\"codesite-block codesite-block-7\""));
/// assert!(page.css.contains(".codesite-block-7 .box{color:blue}"));
/// ```
pub struct RenderPipeline<S> {
    store: S,
    engine: DynamicContent,
    transformers: TransformerChain,
    classifier: Arc<dyn RequestClassifier>,
    default_content: Arc<dyn DefaultContent>,
}

impl<S: fmt::Debug> fmt::Debug for RenderPipeline<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPipeline")
            .field("store", &self.store)
            .field("engine", &self.engine)
            .field("transformers", &self.transformers)
            .finish_non_exhaustive()
    }
}

impl<S: EntityStore> RenderPipeline<S> {
    /// Creates a pipeline with the built-in engine, the shortcode
    /// transformer, [`QueryClassifier`] and [`PostLoop`].
    pub fn new(store: S) -> Self {
        RenderPipeline {
            store,
            engine: DynamicContent::default(),
            transformers: TransformerChain::with_defaults(),
            classifier: Arc::new(QueryClassifier),
            default_content: Arc::new(PostLoop),
        }
    }

    pub fn with_engine(mut self, engine: DynamicContent) -> Self {
        self.engine = engine;
        self
    }

    /// Replaces the whole transformer chain.
    pub fn with_transformers(mut self, chain: TransformerChain) -> Self {
        self.transformers = chain;
        self
    }

    /// Appends a transformer to the chain.
    pub fn with_transformer<T: Transformer + 'static>(mut self, transformer: T) -> Self {
        self.transformers.push(transformer);
        self
    }

    pub fn with_classifier<C: RequestClassifier + 'static>(mut self, classifier: C) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    pub fn with_default_content<D: DefaultContent + 'static>(mut self, content: D) -> Self {
        self.default_content = Arc::new(content);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &DynamicContent {
        &self.engine
    }

    pub fn transformers(&self) -> &TransformerChain {
        &self.transformers
    }

    /// The template type of the request, if it has one.
    pub fn classify(&self, env: &RequestEnvironment) -> Option<String> {
        self.classifier.classify(env)
    }

    /// The template that would render the request.
    pub fn resolve_template(&self, env: &RequestEnvironment) -> Option<Template> {
        resolve_for_request(&self.store, self.classifier.as_ref(), env)
    }

    /// The override for the queried post on singular requests.
    pub fn find_override(&self, env: &RequestEnvironment) -> Option<Override> {
        if !env.is_singular() {
            return None;
        }
        self.store.override_for(env.post_id()?)
    }

    /// Whether the pipeline should take over this request.
    ///
    /// Off when the site is disabled. With `theme_override` set every request
    /// is taken; otherwise only those with an override or a template.
    pub fn should_render(&self, env: &RequestEnvironment) -> bool {
        let settings = self.store.settings();
        if !settings.enabled {
            return false;
        }
        if settings.theme_override {
            return true;
        }
        self.find_override(env).is_some() || self.resolve_template(env).is_some()
    }

    /// Renders the body markup for a request, collecting assets into `ctx`.
    ///
    /// An override on the queried post wins, then a resolved template, then
    /// the configured defaults.
    pub fn render_current_request(&self, env: &RequestEnvironment, ctx: &mut RenderContext) -> String {
        ctx.begin();
        if let Some(ov) = self.find_override(env) {
            debug!(
                post_id = ov.post_id,
                override_type = %ov.override_type,
                "rendering override"
            );
            let template = self.resolve_template(env);
            let pc = ParseContext::for_post(env, ov.post_id);
            return self.render_override(&ov, template.as_ref(), &pc, ctx);
        }
        if let Some(template) = self.resolve_template(env) {
            let pc = ParseContext::new(env);
            return self.render_template(&template, &pc, ctx);
        }
        self.render_defaults(env, ctx)
    }

    /// Renders a request with a fresh context and emits its assets.
    pub fn render_page(&self, env: &RequestEnvironment) -> RenderedPage {
        let mut ctx = RenderContext::new();
        let html = self.render_current_request(env, &mut ctx);
        RenderedPage {
            html,
            css: self.emit_head_css(&ctx),
            js: self.emit_footer_js(&ctx),
        }
    }

    /// Head markup for the collected CSS, in the configured output mode.
    pub fn emit_head_css(&self, ctx: &RenderContext) -> String {
        let settings = self.store.settings();
        match settings.output_mode {
            OutputMode::Inline => ctx.css.output_inline(&settings.global_css),
            OutputMode::File => {
                let merged = ctx
                    .css
                    .output_merged(&settings.global_css, settings.minify_output);
                if merged.trim().is_empty() {
                    String::new()
                } else {
                    format!("<style id='codesite-css'>\n{}\n</style>", merged)
                }
            }
        }
    }

    /// Footer markup for the collected JS.
    pub fn emit_footer_js(&self, ctx: &RenderContext) -> String {
        ctx.js.output(&self.store.settings().global_js)
    }

    /// Runs markup through the dynamic-content engine and the transformers.
    pub fn render_fragment(&self, markup: &str, pc: &ParseContext<'_>) -> String {
        if markup.is_empty() {
            return String::new();
        }
        let parsed = self
            .engine
            .parse_with(markup, pc, |value| self.transformers.protect(value));
        self.transformers.apply(&parsed, pc)
    }

    /// Renders one block, wrapping it in its scope element when scoped.
    pub fn render_block(&self, block: &Block, pc: &ParseContext<'_>, ctx: &mut RenderContext) -> String {
        if !block.status.is_active() {
            debug!(block = block.id, status = %block.status, "skipping inactive block");
            return String::new();
        }
        let html = self.render_fragment(&block.html, pc);
        ctx.css.add_block(block);
        ctx.js.push(SourceKind::Block, block.id, &block.name, &block.js);
        if block.css_scope == CssScope::Scoped {
            format!(
                "<div class=\"codesite-block {}\">{}</div>",
                block.scope_class(),
                html
            )
        } else {
            html
        }
    }

    fn render_block_id(&self, id: u64, pc: &ParseContext<'_>, ctx: &mut RenderContext) -> String {
        match self.store.block(id) {
            Some(block) => self.render_block(&block, pc, ctx),
            None => {
                debug!(block = id, "skipping missing block");
                String::new()
            }
        }
    }

    /// Renders a layout from its block order or its custom markup.
    pub fn render_layout(&self, layout: &Layout, pc: &ParseContext<'_>, ctx: &mut RenderContext) -> String {
        if !layout.status.is_active() {
            debug!(layout = layout.id, status = %layout.status, "skipping inactive layout");
            return String::new();
        }
        if layout.use_blocks {
            return layout
                .block_order
                .iter()
                .map(|&id| self.render_block_id(id, pc, ctx))
                .collect();
        }
        let html = self.render_fragment(&layout.custom_html, pc);
        ctx.css.add(&layout.custom_css, SourceKind::Layout, layout.id, None);
        ctx.js
            .push(SourceKind::Layout, layout.id, &layout.name, &layout.custom_js);
        html
    }

    fn render_layout_id(&self, id: Option<u64>, pc: &ParseContext<'_>, ctx: &mut RenderContext) -> String {
        let Some(id) = id else {
            return String::new();
        };
        match self.store.layout(id) {
            Some(layout) => self.render_layout(&layout, pc, ctx),
            None => {
                debug!(layout = id, "skipping missing layout");
                String::new()
            }
        }
    }

    fn render_items(&self, items: &[ContentItem], pc: &ParseContext<'_>, ctx: &mut RenderContext) -> String {
        items
            .iter()
            .map(|item| match item {
                ContentItem::Block(id) => self.render_block_id(*id, pc, ctx),
                ContentItem::Markup(markup) => self.render_fragment(markup, pc),
            })
            .collect()
    }

    fn render_template_main(&self, template: &Template, pc: &ParseContext<'_>, ctx: &mut RenderContext) -> String {
        let mut content = self.render_items(&template.content_blocks, pc, ctx);
        content.push_str(&self.render_fragment(&template.custom_html, pc));
        format!(
            "<main class=\"codesite-content codesite-template-{}\">{}</main>",
            template.id, content
        )
    }

    fn collect_template_assets(&self, template: &Template, ctx: &mut RenderContext) {
        ctx.css
            .add(&template.custom_css, SourceKind::Template, template.id, None);
        ctx.js.push(
            SourceKind::Template,
            template.id,
            &template.name,
            &template.custom_js,
        );
    }

    /// Renders header layout, templated main and footer layout.
    pub fn render_template(&self, template: &Template, pc: &ParseContext<'_>, ctx: &mut RenderContext) -> String {
        let mut html = self.render_layout_id(template.header_layout_id, pc, ctx);
        html.push_str(&self.render_template_main(template, pc, ctx));
        html.push_str(&self.render_layout_id(template.footer_layout_id, pc, ctx));
        self.collect_template_assets(template, ctx);
        html
    }

    /// Renders an override, borrowing the slices it does not own from
    /// `template`.
    ///
    /// The template's custom CSS and JS ship only when its main is borrowed.
    pub fn render_override(
        &self,
        ov: &Override,
        template: Option<&Template>,
        pc: &ParseContext<'_>,
        ctx: &mut RenderContext,
    ) -> String {
        let (own_header, own_content, own_footer) = match ov.override_type {
            OverrideType::Full => (true, true, true),
            OverrideType::Header => (true, false, false),
            OverrideType::Footer => (false, false, true),
            OverrideType::Content => (false, true, false),
        };
        let borrowed_header = template.and_then(|t| t.header_layout_id);
        let borrowed_footer = template.and_then(|t| t.footer_layout_id);

        let header = if own_header {
            ov.header_layout_id
        } else {
            borrowed_header
        };
        let mut html = self.render_layout_id(header, pc, ctx);

        if own_content {
            let mut content = self.render_items(&ov.content_blocks, pc, ctx);
            content.push_str(&self.render_fragment(&ov.custom_html, pc));
            html.push_str(&format!(
                "<main class=\"codesite-content codesite-override\">{}</main>",
                content
            ));
        } else if let Some(template) = template {
            html.push_str(&self.render_template_main(template, pc, ctx));
        }
        let borrowed_main = if own_content { None } else { template };

        let footer = if own_footer {
            ov.footer_layout_id
        } else {
            borrowed_footer
        };
        html.push_str(&self.render_layout_id(footer, pc, ctx));

        if let Some(template) = borrowed_main {
            self.collect_template_assets(template, ctx);
        }
        ctx.css
            .add(&ov.custom_css, SourceKind::Override, ov.post_id, None);
        ctx.js.push(
            SourceKind::Override,
            ov.post_id,
            &format!("Post {}", ov.post_id),
            &ov.custom_js,
        );
        html
    }

    fn render_defaults(&self, env: &RequestEnvironment, ctx: &mut RenderContext) -> String {
        let settings = self.store.settings();
        let pc = ParseContext::new(env);
        let mut html = self.render_layout_id(settings.default_header, &pc, ctx);
        let main = match settings.default_main_layout {
            Some(id) => self.render_layout_id(Some(id), &pc, ctx),
            None => self.default_content.render(env),
        };
        html.push_str(&format!(
            "<main class=\"codesite-content codesite-default\">{}</main>",
            main
        ));
        html.push_str(&self.render_layout_id(settings.default_footer, &pc, ctx));
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{PostRecord, RequestKind};
    use crate::model::Status;
    use crate::store::MemoryStore;

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert_block(Block {
            id: 1,
            name: "Hero".into(),
            html: "<h1>{{post_title}}</h1>".into(),
            css: "h1{margin:0}".into(),
            js: "hero()".into(),
            ..Block::default()
        });
        store.insert_block(Block {
            id: 2,
            html: "<b>global</b>".into(),
            css: "b{x:1}".into(),
            css_scope: CssScope::Global,
            ..Block::default()
        });
        store
    }

    fn env() -> RequestEnvironment {
        RequestEnvironment::new(RequestKind::Single).with_post(PostRecord {
            id: 10,
            title: "Post Ten".into(),
            ..PostRecord::default()
        })
    }

    #[test]
    fn scoped_and_global_blocks() {
        let store = store();
        let pipeline = RenderPipeline::new(&store);
        let env = env();
        let pc = ParseContext::new(&env);
        let mut ctx = RenderContext::new();

        let hero = store.block(1).unwrap();
        assert_eq!(
            pipeline.render_block(&hero, &pc, &mut ctx),
            "<div class=\"codesite-block codesite-block-1\"><h1>Post Ten</h1></div>"
        );
        let global = store.block(2).unwrap();
        assert_eq!(pipeline.render_block(&global, &pc, &mut ctx), "<b>global</b>");

        assert_eq!(ctx.css.entries()[0].css, ".codesite-block-1 h1{margin:0}");
        assert_eq!(ctx.css.entries()[1].css, "b{x:1}");
        assert_eq!(ctx.js.len(), 1);
    }

    #[test]
    fn inactive_block_renders_nothing() {
        let store = store();
        let pipeline = RenderPipeline::new(&store);
        let env = env();
        let pc = ParseContext::new(&env);
        let mut ctx = RenderContext::new();
        let mut hero = store.block(1).unwrap();
        hero.status = Status::Trash;
        assert_eq!(pipeline.render_block(&hero, &pc, &mut ctx), "");
        assert!(ctx.css.is_empty());
    }

    #[test]
    fn custom_layout_collects_its_assets_block_layout_does_not() {
        let store = store();
        let pipeline = RenderPipeline::new(&store);
        let env = env();
        let pc = ParseContext::new(&env);
        let mut ctx = RenderContext::new();

        let custom = Layout {
            id: 3,
            use_blocks: false,
            custom_html: "<nav>{{site_name}}</nav>".into(),
            custom_css: "nav{x:1}".into(),
            block_order: vec![1],
            ..Layout::default()
        };
        assert_eq!(pipeline.render_layout(&custom, &pc, &mut ctx), "<nav></nav>");
        assert!(ctx.css.contains(SourceKind::Layout, 3));
        assert!(!ctx.css.contains(SourceKind::Block, 1));

        let blocks = Layout {
            id: 4,
            block_order: vec![2, 99],
            custom_css: "ignored{x:1}".into(),
            ..Layout::default()
        };
        assert_eq!(pipeline.render_layout(&blocks, &pc, &mut ctx), "<b>global</b>");
        assert!(!ctx.css.contains(SourceKind::Layout, 4));
    }

    #[test]
    fn defaults_without_anything_configured() {
        let pipeline = RenderPipeline::new(MemoryStore::new());
        let mut ctx = RenderContext::new();
        let html = pipeline.render_current_request(&RequestEnvironment::new(RequestKind::Search), &mut ctx);
        assert_eq!(html, "<main class=\"codesite-content codesite-default\"></main>");
    }

    #[test]
    fn file_mode_wraps_merged_css() {
        let mut store = store();
        store.settings_mut().output_mode = OutputMode::File;
        store.settings_mut().minify_output = true;
        let pipeline = RenderPipeline::new(&store);
        let env = env();
        let pc = ParseContext::new(&env);
        let mut ctx = RenderContext::new();
        pipeline.render_block(&store.block(1).unwrap(), &pc, &mut ctx);
        assert_eq!(
            pipeline.emit_head_css(&ctx),
            "<style id='codesite-css'>\n.codesite-block-1 h1{margin:0}\n</style>"
        );
        assert_eq!(pipeline.emit_head_css(&RenderContext::new()), "");
    }
}
