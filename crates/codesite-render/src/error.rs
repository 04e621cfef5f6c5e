//! Error types for loading site data.
//!
//! Rendering itself never fails: malformed CSS, unknown fields and dangling
//! references all degrade to empty output. [`RenderError`] covers the only
//! fallible surface, which is reading fixtures, settings and environments.

use thiserror::Error;

/// Error type for loading and validation operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// I/O error (e.g., reading a site fixture from disk).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML decoding error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSS that does not tokenize cleanly.
    #[error("invalid CSS at line {line}, column {column}")]
    InvalidCss {
        /// 1-based line of the offending token.
        line: u32,
        /// 1-based column of the offending token.
        column: u32,
    },
}

/// Result type for loading operations.
pub type Result<T> = std::result::Result<T, RenderError>;
