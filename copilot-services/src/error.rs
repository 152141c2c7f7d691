//! Orchestrator errors.

use copilot_auth::AuthError;
use copilot_core::ValidationError;
use copilot_fetch::ApiError;
use copilot_store::ConfigError;
use thiserror::Error;

/// Errors surfaced by [`crate::CopilotService`].
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Settings were missing or malformed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No bearer token could be acquired.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The API answered with an error or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Caller input was rejected before any network use.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Conversation creation returned no id.
    #[error("Chat API did not return a conversation id")]
    MissingConversationId,

    /// The signed-in account has no stable user id.
    #[error("Could not determine the signed-in user id. Sign in first.")]
    MissingUserId,
}

impl ServiceError {
    /// Returns the HTTP status for API errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ServiceError::Api(e) => e.status(),
            _ => None,
        }
    }
}
