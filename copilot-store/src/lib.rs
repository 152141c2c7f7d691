// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Copilot Store
//!
//! Settings and persistence for the Copilot API client.
//!
//! This crate provides:
//!
//! - **AppSettings**: Validated configuration from `COPILOT_*` variables and `.env` files
//! - **CachePersistence**: Storage backends for the serialized token cache
//! - **Persistence**: Owner-only, atomic file writes
//!
//! ## Usage
//!
//! ```ignore
//! use copilot_store::{AppSettings, open_persistence};
//!
//! let settings = AppSettings::from_env()?;
//! let cache = open_persistence(settings.token_cache_backend, &settings.token_cache_path);
//! let blob = cache.load().await?;
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod persistence;

pub use cache::{
    CachePersistence, FilePersistence, KeychainPersistence, MemoryPersistence, open_persistence,
};
pub use config::{AppSettings, AuthFlow, EnvFiles, TokenCacheBackend};
pub use error::{ConfigError, StoreError};
pub use persistence::{default_cache_dir, default_token_cache_path, load_optional, save_secure};
