//! Retrieval endpoint.

use std::sync::Arc;

use copilot_core::json::field_text;
use copilot_core::{BatchRequestItem, ValidationError};
use copilot_fetch::{ApiError, RequestExecutor};
use serde_json::Value;

/// Grounding-data retrieval.
#[derive(Debug, Clone)]
pub struct RetrievalApi {
    executor: Arc<RequestExecutor>,
    retrieval_path: String,
}

impl RetrievalApi {
    /// Creates the API for `retrieval_path`.
    pub fn new(executor: Arc<RequestExecutor>, retrieval_path: impl Into<String>) -> Self {
        Self {
            executor,
            retrieval_path: retrieval_path.into(),
        }
    }

    /// Checks that a payload names both `queryString` and `dataSource`.
    pub fn validate(payload: &Value) -> Result<(), ValidationError> {
        if !payload.is_object() {
            return Err(ValidationError::NotAnObject("Retrieval"));
        }
        for field in ["queryString", "dataSource"] {
            if field_text(payload, field).is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }
        Ok(())
    }

    /// Runs a retrieval.
    pub async fn retrieve(&self, token: &str, payload: &Value) -> Result<Value, ApiError> {
        self.executor.post_json(token, &self.retrieval_path, payload).await
    }

    /// Builds the batch sub-request for a retrieval payload.
    pub fn batch_item(&self, id: impl Into<String>, payload: &Value) -> BatchRequestItem {
        BatchRequestItem::post_json(id, self.retrieval_path.as_str(), payload.clone())
    }
}
