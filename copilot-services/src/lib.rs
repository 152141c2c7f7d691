// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Copilot Services
//!
//! Operation orchestration for the Copilot API client.
//!
//! The [`CopilotService`] ties the credential manager to the request
//! executor and owns the per-session state:
//!
//! | Operation | Endpoint | Notes |
//! |-----------|----------|-------|
//! | Chat | `POST <chat>/<id>/chat` | Conversation created on first send |
//! | Chat over stream | `POST <chat>/<id>/chatOverStream` | SSE, events in wire order |
//! | Search | `POST <search>` | Continuation via `@odata.nextLink` |
//! | Retrieval | `POST <retrieval>` | Needs `queryString` and `dataSource` |
//! | Batch | `POST <batch>` | Chat, search, retrieval in one request |
//! | AI interactions | `GET <template>` | `$top` / `$filter` |
//!
//! ## Usage
//!
//! ```ignore
//! use copilot_services::CopilotService;
//!
//! let service = CopilotService::new(&settings, credentials)?;
//! let reply = service
//!     .send_chat(&serde_json::json!({ "prompt": "Summarize my week" }), None)
//!     .await?;
//! ```

pub mod batch;
pub mod chat;
pub mod error;
pub mod interactions;
pub mod retrieval;
pub mod search;
pub mod service;
pub mod timezone;

pub use batch::{BatchBuilder, BatchPlan};
pub use chat::{ChatApi, ChatOutcome, PreparedChat, normalize_chat_payload};
pub use error::ServiceError;
pub use interactions::InteractionsApi;
pub use retrieval::RetrievalApi;
pub use search::{GET_FALLBACK_STATUSES, NextLink, SearchApi, next_link_of};
pub use service::CopilotService;
pub use timezone::{FALLBACK_TIME_ZONE, resolve_time_zone};
