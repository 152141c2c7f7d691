//! Store error types.

use thiserror::Error;

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The system keychain rejected the operation.
    #[error("Keychain error: {0}")]
    Keychain(String),
}

impl From<keyring::Error> for StoreError {
    fn from(e: keyring::Error) -> Self {
        StoreError::Keychain(e.to_string())
    }
}

/// Invalid or incomplete settings, detected before any network use.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Required variables are unset or blank.
    #[error("Missing required settings: {}", .0.join(", "))]
    MissingRequired(Vec<&'static str>),

    /// Endpoint paths that do not start with `/`.
    #[error("Endpoint paths must start with '/': {}", .0.join(", "))]
    InvalidPaths(Vec<&'static str>),

    /// A numeric variable did not parse.
    #[error("{name} must be an integer, got '{value}'")]
    InvalidNumber {
        /// Variable name.
        name: &'static str,
        /// Raw value.
        value: String,
    },

    /// Timeout of zero or less.
    #[error("COPILOT_TIMEOUT_SECONDS must be greater than 0")]
    InvalidTimeout,

    /// Negative retry count.
    #[error("COPILOT_RETRY_ATTEMPTS must be 0 or greater")]
    InvalidRetryAttempts,

    /// Unknown authentication flow.
    #[error("COPILOT_AUTH_FLOW must be one of: interactive, device_code, interactive_then_device (got '{0}')")]
    InvalidAuthFlow(String),

    /// Unknown token cache backend.
    #[error("COPILOT_TOKEN_CACHE_BACKEND must be one of: file, keychain (got '{0}')")]
    InvalidCacheBackend(String),
}
