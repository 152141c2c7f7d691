//! Validation errors for caller-supplied input.

use thiserror::Error;

/// Malformed caller input, detected before any network access.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Chat payload carried no message text.
    #[error("Chat message text is required")]
    EmptyChatText,

    /// A batch was requested without any operation.
    #[error(
        "Provide at least one operation for batch: Chat prompt, Search query, or Retrieval query+data source."
    )]
    EmptyBatch,

    /// A required field of an operation was missing or blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// The continuation link was empty.
    #[error("Search next link is required")]
    EmptyNextLink,

    /// The continuation link is neither relative nor an http(s) URL.
    #[error("Invalid search next link: {0}")]
    InvalidNextLink(String),

    /// A payload that must be a JSON object was something else.
    #[error("{0} payload must be a JSON object")]
    NotAnObject(&'static str),
}
