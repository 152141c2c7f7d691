// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Copilot Core
//!
//! Core types and models shared by every crate of the Copilot API client.
//!
//! This crate provides the foundational abstractions used across the
//! workspace, including:
//!
//! - Domain models (credential session, stream events, batch sub-requests)
//! - Validation errors raised for malformed caller input
//! - Loose JSON helpers for caller-supplied payloads
//!
//! ## Key Types
//!
//! - [`CredentialSession`] - The signed-in identity as seen by callers
//! - [`StreamEvent`] - One decoded event from a streaming chat response
//! - [`OperationKind`] - Chat, search, or retrieval
//! - [`BatchRequestItem`] - One sub-request of a batched call
//! - [`ValidationError`] - Malformed input detected before any network use

pub mod error;
pub mod json;
pub mod models;

// Re-export error types
pub use error::ValidationError;

// Re-export all model types
pub use models::{BatchRequestItem, CredentialSession, OperationKind, StreamEvent};
