//! Common imports for embedding the pipeline.
//!
//! ```rust
//! use codesite_render::prelude::*;
//!
//! let pipeline = RenderPipeline::new(MemoryStore::new());
//! let mut ctx = RenderContext::new();
//! let html = pipeline.render_current_request(&RequestEnvironment::new(RequestKind::NotFound), &mut ctx);
//! assert!(html.contains("Page Not Found"));
//! ```

pub use crate::dynamic::{DynamicContent, ParseContext};
pub use crate::{
    EntityStore, MemoryStore, RenderContext, RenderPipeline, RequestEnvironment, RequestKind,
    Settings, Transformer, TransformerChain,
};
