//! Per-request accumulation state.

use tracing::warn;

use crate::css::{CssCollection, JsCollection};

/// The CSS and JS gathered while rendering one request.
///
/// Create one per request and pass the same context to
/// [`RenderPipeline::render_current_request`](super::RenderPipeline::render_current_request),
/// then to the `emit_*` calls. A context that already served a render must be
/// [`reset`](Self::reset) before it serves another; the pipeline resets a
/// stale context itself and logs a warning.
#[derive(Debug, Clone, Default)]
pub struct RenderContext {
    pub css: CssCollection,
    pub js: JsCollection,
    used: bool,
}

impl RenderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empties both collections and marks the context fresh.
    pub fn reset(&mut self) {
        self.css.clear();
        self.js.clear();
        self.used = false;
    }

    /// Returns `true` once a render has run against this context.
    pub fn is_used(&self) -> bool {
        self.used
    }

    /// Claims the context for a render.
    pub(crate) fn begin(&mut self) {
        if self.used {
            warn!(
                css_entries = self.css.len(),
                js_entries = self.js.len(),
                "render context reused without reset; clearing collected assets"
            );
            self.reset();
        }
        self.used = true;
    }
}
