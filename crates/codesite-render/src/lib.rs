//! # CodeSite Render - Block-Based Page Rendering
//!
//! `codesite-render` turns stored blocks, layouts, templates and per-post
//! overrides into page markup. It is the rendering core of the `codesite`
//! tool and can be embedded anywhere a request can be described as a
//! [`RequestEnvironment`].
//!
//! ## Core Concepts
//!
//! - [`Block`]: a reusable HTML/CSS/JS fragment, optionally CSS-scoped
//! - [`Layout`]: a header, footer or section built from blocks or custom markup
//! - [`Template`]: a page for one request type, chosen by priority and conditions
//! - [`Override`]: a per-post replacement for all or part of the template
//! - [`RenderPipeline`]: walks the above and produces markup plus CSS/JS
//! - [`RenderContext`]: per-request CSS and JS accumulation
//!
//! ## Quick Start
//!
//! ```rust
//! use codesite_render::{MemoryStore, RenderPipeline, RequestEnvironment};
//!
//! let store = MemoryStore::from_yaml(r#"
//! blocks:
//!   - id: 7
//!     html: '<p class="box">{{site_name|upper}}</p>'
//!     css: '.box { color: blue }'
//! templates:
//!   - id: 1
//!     template_type: home
//!     content_blocks: [7]
//! "#).unwrap();
//!
//! let mut env = RequestEnvironment::default();
//! env.site.name = "Acme".into();
//!
//! let page = RenderPipeline::new(store).render_page(&env);
//! assert_eq!(
//!     page.html,
//!     "<main class=\"codesite-content codesite-template-1\">\
//!      <div class=\"codesite-block codesite-block-7\"><p class=\"box\">ACME</p></div></main>"
//! );
//! assert!(page.css.contains(".codesite-block-7 .box{color: blue}"));
//! ```
//!
//! ## Dynamic Fields
//!
//! Fragment markup may contain `{{field|filter:arg}}` tokens, resolved by
//! [`dynamic::DynamicContent`] before the [`transform`] chain runs. See the
//! [`dynamic`] module for the built-in fields and filters.
//!
//! ## CSS Scoping
//!
//! Scoped blocks have their selectors rewritten under `.codesite-block-<id>`
//! and their markup wrapped in a matching `<div>`. See [`css::scope`].

pub mod css;
pub mod dynamic;
pub mod environment;
mod error;
pub mod model;
pub mod pipeline;
pub mod prelude;
pub mod resolver;
pub mod settings;
pub mod store;
pub mod transform;

// Error type
pub use error::{RenderError, Result};

// Entities
pub use model::{Block, ContentItem, CssScope, Layout, LayoutKind, Override, OverrideType, Status, Template};

// Request description
pub use environment::{
    Author, PostRecord, QueryClassifier, RequestClassifier, RequestEnvironment, RequestKind,
    SiteInfo, Term, UserRecord,
};

// Configuration and storage
pub use settings::{OutputMode, Settings};
pub use store::{EntityStore, MemoryStore, SiteFixture};

// Rendering
pub use pipeline::{DefaultContent, PostLoop, RenderContext, RenderPipeline, RenderedPage};
pub use resolver::resolve;
pub use transform::{ShortcodeTransformer, TemplateLogic, Transformer, TransformerChain};
