//! AI interaction history export.

use std::sync::Arc;

use copilot_fetch::{ApiError, RequestExecutor};
use serde_json::Value;
use tracing::instrument;

/// Placeholder replaced by the user id in the path template.
pub const USER_ID_PLACEHOLDER: &str = "{user_id}";

/// Enterprise interaction history for one user.
#[derive(Debug, Clone)]
pub struct InteractionsApi {
    executor: Arc<RequestExecutor>,
    path_template: String,
}

impl InteractionsApi {
    /// Creates the API for a path template containing `{user_id}`.
    pub fn new(executor: Arc<RequestExecutor>, path_template: impl Into<String>) -> Self {
        Self {
            executor,
            path_template: path_template.into(),
        }
    }

    /// Expands the path for `user_id`.
    pub fn path_for(&self, user_id: &str) -> String {
        self.path_template.replace(USER_ID_PLACEHOLDER, user_id)
    }

    /// Lists interactions, optionally limited to `top` items and filtered
    /// with an OData expression.
    #[instrument(skip(self, token))]
    pub async fn get_all_enterprise_interactions(
        &self,
        token: &str,
        user_id: &str,
        top: Option<u32>,
        filter: Option<&str>,
    ) -> Result<Value, ApiError> {
        let params = query_params(top, filter);
        self.executor
            .get_json(token, &self.path_for(user_id), &params)
            .await
    }
}

fn query_params(top: Option<u32>, filter: Option<&str>) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if let Some(top) = top {
        params.push(("$top".to_string(), top.to_string()));
    }
    if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
        params.push(("$filter".to_string(), filter.to_string()));
    }
    params
}
