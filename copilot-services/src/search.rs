//! Search and continuation-link pagination.

use std::sync::Arc;

use copilot_core::json::field_text;
use copilot_core::{BatchRequestItem, ValidationError};
use copilot_fetch::{ApiError, RequestExecutor};
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

/// Statuses on which a POST to a continuation link is retried once as GET.
pub const GET_FALLBACK_STATUSES: [u16; 3] = [400, 404, 405];

/// A validated continuation link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextLink {
    /// Path under the API base URL.
    Relative(String),
    /// Absolute `http`/`https` URL.
    Absolute(String),
}

impl NextLink {
    /// Parses a caller-supplied link.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let link = raw.trim();
        if link.is_empty() {
            return Err(ValidationError::EmptyNextLink);
        }
        if link.starts_with('/') {
            return Ok(Self::Relative(link.to_string()));
        }

        match Url::parse(link) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Absolute(link.to_string())),
            _ => Err(ValidationError::InvalidNextLink(link.to_string())),
        }
    }

    /// The link text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Relative(link) | Self::Absolute(link) => link,
        }
    }
}

/// Reads the continuation link from a search response.
pub fn next_link_of(response: &Value) -> Option<String> {
    Some(field_text(response, "@odata.nextLink")).filter(|link| !link.is_empty())
}

/// Search endpoint.
#[derive(Debug, Clone)]
pub struct SearchApi {
    executor: Arc<RequestExecutor>,
    search_path: String,
}

impl SearchApi {
    /// Creates the API for `search_path`.
    pub fn new(executor: Arc<RequestExecutor>, search_path: impl Into<String>) -> Self {
        Self {
            executor,
            search_path: search_path.into(),
        }
    }

    /// Checks that a payload is an object with a non-blank `query`.
    pub fn validate(payload: &Value) -> Result<(), ValidationError> {
        if !payload.is_object() {
            return Err(ValidationError::NotAnObject("Search"));
        }
        if field_text(payload, "query").is_empty() {
            return Err(ValidationError::MissingField("query"));
        }
        Ok(())
    }

    /// Runs a search.
    pub async fn search(&self, token: &str, payload: &Value) -> Result<Value, ApiError> {
        self.executor.post_json(token, &self.search_path, payload).await
    }

    /// Fetches the page behind a continuation link.
    ///
    /// Relative links are POSTed under the base URL. Absolute links are
    /// POSTed as-is and, when the server rejects the method with one of
    /// [`GET_FALLBACK_STATUSES`], fetched once more with GET.
    #[instrument(skip(self, token))]
    pub async fn next_page(&self, token: &str, link: &NextLink) -> Result<Value, ApiError> {
        let empty = json!({});
        match link {
            NextLink::Relative(path) => self.executor.post_json(token, path, &empty).await,
            NextLink::Absolute(url) => {
                match self.executor.post_absolute_json(token, url, &empty).await {
                    Err(e) if e.status().is_some_and(|s| GET_FALLBACK_STATUSES.contains(&s)) => {
                        debug!(error = %e, "POST rejected, retrying continuation with GET");
                        self.executor.get_absolute_json(token, url, &[]).await
                    }
                    other => other,
                }
            }
        }
    }

    /// Builds the batch sub-request for a search payload.
    pub fn batch_item(&self, id: impl Into<String>, payload: &Value) -> BatchRequestItem {
        BatchRequestItem::post_json(id, self.search_path.as_str(), payload.clone())
    }
}
