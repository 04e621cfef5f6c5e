//! Request rendering: overrides, templates and defaults stitched into page
//! markup, with CSS and JS gathered per request.
//!
//! ```text
//! request ─▶ override? ─▶ header layout ─▶ main ─▶ footer layout
//!              │
//!              └─ template? ─▶ ...            else defaults
//! ```
//!
//! Every fragment goes through the dynamic-content engine, then the
//! transformer chain. Its CSS lands in [`RenderContext::css`] (once per
//! source) and its JS in [`RenderContext::js`] (in render order).

mod context;
mod defaults;
mod renderer;

pub use context::RenderContext;
pub use defaults::{DefaultContent, PostLoop};
pub use renderer::{RenderPipeline, RenderedPage};
