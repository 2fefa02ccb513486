//! Error types for the control-theory and domain layer.

use thiserror::Error;

/// Errors raised while evaluating rules or computing a rate limit.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A site rule's `condition` or numeric field could not be parsed.
    #[error("malformed rule field `{field}`")]
    MalformedRule {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A rate computation was attempted with a non-positive target speed.
    #[error("target speed must be positive, got {target_speed}")]
    NonPositiveTarget {
        /// The offending target speed, in bytes/s.
        target_speed: i64,
    },
}

/// Convenience alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
