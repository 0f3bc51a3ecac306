//! Error types for the entity model.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while building or duplicating entities.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A field schema declares no identity field. Programmer error.
    #[error("structural error: {0} has no identity field")]
    Structural(&'static str),

    /// An override names a field the type does not have, or an identity field.
    #[error("unknown or non-copyable field {field} on {type_name}")]
    UnknownField {
        type_name: &'static str,
        field: &'static str,
    },

    /// Dataset slug is empty, too long, or contains non-slug characters.
    #[error("invalid slug: {0:?}")]
    InvalidSlug(String),

    /// An origin pattern does not compile.
    #[error("invalid origin pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}
