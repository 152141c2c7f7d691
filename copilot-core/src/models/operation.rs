//! Operation kinds and batch sub-requests.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Operation Kind
// ============================================================================

/// The operations the client can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Conversational chat.
    Chat,
    /// Search over organizational content.
    Search,
    /// Grounding-data retrieval.
    Retrieval,
}

impl OperationKind {
    /// All operation kinds, in batch order.
    pub fn all() -> &'static [OperationKind] {
        &[Self::Chat, Self::Search, Self::Retrieval]
    }

    /// Returns the display name for this kind.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Chat => "Chat",
            Self::Search => "Search",
            Self::Retrieval => "Retrieval",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

// ============================================================================
// Batch Request Item
// ============================================================================

/// One sub-request of a batched call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequestItem {
    /// Sequential id, starting at "1".
    pub id: String,
    /// HTTP method, always `POST` for the operations composed here.
    pub method: String,
    /// Path relative to the API base URL.
    pub url: String,
    /// Per-request headers.
    pub headers: BTreeMap<String, String>,
    /// JSON body.
    pub body: Value,
}

impl BatchRequestItem {
    /// Creates a JSON `POST` sub-request.
    pub fn post_json(id: impl Into<String>, url: impl Into<String>, body: Value) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        Self {
            id: id.into(),
            method: "POST".to_string(),
            url: url.into(),
            headers,
            body,
        }
    }
}
