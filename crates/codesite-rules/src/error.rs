//! Error types for the rules crate.

use thiserror::Error;

/// Errors raised by the strict parsing helpers.
///
/// Evaluation itself never fails; these only surface when a caller asks for
/// strict validation of stored rule data (for example an editor checking
/// input before saving it).
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule tree was not valid JSON or did not have the expected shape.
    #[error("invalid rule tree: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The operator name is not one of the supported operators.
    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    /// The match mode is neither `all` nor `any`.
    #[error("unknown match mode '{0}' (expected 'all' or 'any')")]
    UnknownMatchMode(String),
}

/// Result type for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;
