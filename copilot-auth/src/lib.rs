// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Copilot Auth
//!
//! Credential management for the Copilot API client.
//!
//! - [`manager::CredentialManager`] - Silent, interactive and device-code sign-in chain
//! - [`provider::IdentityProvider`] - Token primitives the manager builds on
//! - [`entra::EntraIdentityProvider`] - Microsoft identity platform public client
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use copilot_auth::{CredentialApi, CredentialManager, EntraIdentityProvider};
//! use copilot_store::{AppSettings, open_persistence};
//!
//! let settings = AppSettings::from_env()?;
//! let persistence = open_persistence(settings.token_cache_backend, &settings.token_cache_path);
//! let provider = EntraIdentityProvider::load(&settings, Arc::clone(&persistence)).await?;
//! let manager = CredentialManager::new(&settings, Arc::new(provider), persistence);
//! let token = manager.acquire_access_token().await?;
//! ```

pub mod entra;
pub mod error;
pub mod manager;
pub mod provider;

pub use entra::{BrowserLauncher, EntraIdentityProvider, Endpoints};
pub use error::{AuthError, PLATFORM_MISMATCH_CODE, platform_mismatch_message};
pub use manager::{CredentialApi, CredentialManager, DevicePrompt};
pub use provider::{
    Account, DeviceCode, IdentityProvider, InteractiveRequest, ProviderFailure, TokenGrant,
};
