//! Domain models for the Copilot API client.
//!
//! ## Submodules
//!
//! - [`session`] - The signed-in identity ([`CredentialSession`])
//! - [`event`] - Decoded streaming events ([`StreamEvent`])
//! - [`operation`] - Operation kinds and batch sub-requests

mod event;
mod operation;
mod session;

// Re-export everything at the models level
pub use event::StreamEvent;
pub use operation::{BatchRequestItem, OperationKind};
pub use session::CredentialSession;
