//! Batch composition.
//!
//! A batch payload may name a chat prompt, a search and a retrieval:
//!
//! ```json
//! {
//!   "chat": { "prompt": "...", "webSearchEnabled": true },
//!   "search": { "query": "...", "pageSize": 10 },
//!   "retrieval": { "queryString": "...", "dataSource": "sharePoint" }
//! }
//! ```
//!
//! Sections whose required fields are blank are skipped. The remaining
//! operations become sub-requests in the order chat, search, retrieval, with
//! ids `"1"`, `"2"`, ... and no gaps.

use copilot_core::json::{field_text, flag};
use copilot_core::{BatchRequestItem, OperationKind, ValidationError};
use serde_json::{Value, json};

/// The operations a batch payload selects.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchPlan {
    /// Friendly chat payload (`prompt`, `webSearchEnabled`).
    pub chat: Option<Value>,
    /// Search body, passed through.
    pub search: Option<Value>,
    /// Retrieval body, passed through.
    pub retrieval: Option<Value>,
}

impl BatchPlan {
    /// Selects the operations of a batch payload.
    ///
    /// Fails with [`ValidationError::EmptyBatch`] when nothing is selected.
    pub fn from_payload(payload: &Value) -> Result<Self, ValidationError> {
        let section = |key: &str| payload.get(key).filter(|v| v.is_object());

        let chat = section("chat").and_then(|chat| {
            let prompt = field_text(chat, "prompt");
            (!prompt.is_empty()).then(|| {
                json!({
                    "prompt": prompt,
                    "webSearchEnabled": flag(chat, "webSearchEnabled", true),
                })
            })
        });

        let search = section("search")
            .filter(|search| !field_text(search, "query").is_empty())
            .cloned();

        let retrieval = section("retrieval")
            .filter(|retrieval| {
                !field_text(retrieval, "queryString").is_empty()
                    && !field_text(retrieval, "dataSource").is_empty()
            })
            .cloned();

        let plan = Self {
            chat,
            search,
            retrieval,
        };
        if plan.is_empty() {
            return Err(ValidationError::EmptyBatch);
        }
        Ok(plan)
    }

    /// Whether no operation is selected.
    pub fn is_empty(&self) -> bool {
        self.chat.is_none() && self.search.is_none() && self.retrieval.is_none()
    }

    /// Selected operations, in submission order.
    pub fn operations(&self) -> Vec<OperationKind> {
        let mut operations = Vec::new();
        if self.chat.is_some() {
            operations.push(OperationKind::Chat);
        }
        if self.search.is_some() {
            operations.push(OperationKind::Search);
        }
        if self.retrieval.is_some() {
            operations.push(OperationKind::Retrieval);
        }
        operations
    }
}

/// Collects sub-requests and assigns sequential ids.
#[derive(Debug, Clone, Default)]
pub struct BatchBuilder {
    items: Vec<BatchRequestItem>,
}

impl BatchBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next sub-request will get.
    pub fn next_id(&self) -> String {
        (self.items.len() + 1).to_string()
    }

    /// Adds a sub-request built for the next id.
    pub fn push_with(&mut self, build: impl FnOnce(String) -> BatchRequestItem) {
        let item = build(self.next_id());
        self.items.push(item);
    }

    /// Number of sub-requests so far.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing was added.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The `{requests: [...]}` body for the batch endpoint.
    pub fn into_body(self) -> Value {
        json!({ "requests": self.items })
    }

    /// The collected sub-requests.
    pub fn into_items(self) -> Vec<BatchRequestItem> {
        self.items
    }
}
