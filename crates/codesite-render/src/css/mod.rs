//! CSS handling: selector scoping, minification, validation, and the
//! per-request collection of stylesheets.
//!
//! Fragment CSS is written by hand in an editor and is often sloppy, so the
//! scoper and minifier are text scanners that never fail. [`validate`] runs
//! the real tokenizer from `cssparser` over the result when a caller wants to
//! know whether it is sound.
//!
//! ```rust
//! use codesite_render::css::{minify, scope, validate};
//!
//! let scoped = scope(".title { color: red } :root { --gap: 4px }", "codesite-block-7");
//! assert_eq!(
//!     scoped,
//!     ".codesite-block-7 .title{color: red}\n.codesite-block-7{--gap: 4px}"
//! );
//! assert!(validate(&minify(&scoped)).is_ok());
//! ```

mod collection;
mod minify;
mod scope;
mod validate;

pub use collection::{CssCollection, CssEntry, JsCollection, JsEntry, SourceKind};
pub use minify::minify;
pub use scope::{scope, scope_selectors};
pub use validate::validate;

/// Returns the index just past the string literal opening at `start`.
///
/// Backslash escapes are honoured. An unterminated string runs to the end.
pub(crate) fn string_end(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == quote => return i + 1,
            _ => i += 1,
        }
    }
    bytes.len()
}

/// Removes `/* ... */` comments outside string literals.
///
/// An unterminated comment swallows the rest of the input.
pub(crate) fn strip_comments(css: &str) -> String {
    let bytes = css.as_bytes();
    let mut out = String::with_capacity(css.len());
    let mut copied = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => i = string_end(bytes, i),
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str(&css[copied..i]);
                i = match css[i + 2..].find("*/") {
                    Some(end) => i + 2 + end + 2,
                    None => bytes.len(),
                };
                copied = i;
            }
            _ => i += 1,
        }
    }
    if copied < bytes.len() {
        out.push_str(&css[copied..]);
    }
    out
}
