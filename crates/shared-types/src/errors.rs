//! # Error Types
//!
//! Errors raised while decoding push-channel frames.

use thiserror::Error;

/// A push-channel frame that does not satisfy the inbound event contract.
#[derive(Debug, Error)]
pub enum WireError {
    /// Frame is not valid JSON.
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is valid JSON but not an object.
    #[error("expected a JSON object, found {found}")]
    NotAnObject { found: &'static str },

    /// Neither `event` nor `kind` carries a non-empty string.
    #[error("missing event kind (expected one of `event`, `kind`)")]
    MissingKind,

    /// The correlation field holds something other than a string or number.
    #[error("correlation field `{field}` must be a string or number")]
    InvalidCorrelationId { field: &'static str },
}
