//! Request executor error types.

use thiserror::Error;

/// Number of response-body characters kept in an error message.
pub const ERROR_BODY_LIMIT: usize = 500;

/// Error type for HTTP operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-success status.
    ///
    /// `message` has the form `HTTP <status>: <body prefix>`.
    #[error("{message}")]
    Status {
        /// Numeric HTTP status.
        status: u16,
        /// Status plus the first characters of the response body.
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response carried a body that is not JSON.
    #[error("Invalid JSON response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The target URL is malformed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Builds a status error from a response body, keeping its first
    /// [`ERROR_BODY_LIMIT`] characters.
    pub fn from_status(status: u16, body: &str) -> Self {
        let excerpt: String = body.chars().take(ERROR_BODY_LIMIT).collect();
        ApiError::Status {
            status,
            message: format!("HTTP {status}: {excerpt}"),
        }
    }

    /// Returns the HTTP status for status errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_truncates_body() {
        let body = "x".repeat(800);
        let err = ApiError::from_status(503, &body);
        assert_eq!(err.status(), Some(503));
        assert_eq!(err.to_string(), format!("HTTP 503: {}", "x".repeat(500)));
    }

    #[test]
    fn test_truncation_counts_characters_not_bytes() {
        let body = "é".repeat(600);
        let err = ApiError::from_status(400, &body);
        let ApiError::Status { message, .. } = err else {
            panic!("expected status error");
        };
        assert_eq!(message.chars().count(), "HTTP 400: ".len() + 500);
    }

    #[test]
    fn test_invalid_url_has_no_status() {
        assert_eq!(ApiError::InvalidUrl("x".into()).status(), None);
    }
}
