//! Error types for the relay.
//!
//! [`ValidationError`] covers payloads rejected before any registry work.
//! [`RelayError`] is the top-level error returned by the broadcast path.

use thiserror::Error;

/// A request payload failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The body was not a JSON object.
    #[error("request body must be a JSON object")]
    NotAnObject,
    /// A required field was absent, not a string, or blank.
    #[error("field `{field}` is required")]
    MissingField {
        /// Wire name of the field.
        field: &'static str,
    },
}

/// Top-level relay error.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Payload validation failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A message could not be encoded into a wire frame.
    #[error("failed to serialize frame: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result alias for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;
