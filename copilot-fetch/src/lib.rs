// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Copilot Fetch
//!
//! HTTP plumbing for the Copilot API client.
//!
//! - [`client::RequestExecutor`] - Authenticated JSON requests with retry
//! - [`retry::RetryPolicy`] - Retryable statuses and linear backoff
//! - [`sse::SseEventParser`] - Incremental server-sent-event framing
//!
//! ## Example
//!
//! ```ignore
//! use std::time::Duration;
//! use copilot_fetch::{RequestExecutor, RetryPolicy};
//!
//! let executor = RequestExecutor::new(
//!     "https://graph.microsoft.com/beta",
//!     Duration::from_secs(45),
//!     RetryPolicy::default(),
//! )?;
//! let body = serde_json::json!({ "query": "quarterly report" });
//! let response = executor.post_json(&token, "/copilot/search", &body).await?;
//! ```

pub mod client;
pub mod error;
pub mod retry;
pub mod sse;

pub use client::{EventCallback, RequestExecutor};
pub use error::{ApiError, ERROR_BODY_LIMIT};
pub use retry::RetryPolicy;
pub use sse::SseEventParser;
