//! Token cache persistence backends.
//!
//! The identity provider serializes its cache to an opaque string; these
//! backends only store and return that string. Writing an empty string erases
//! the cache.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use keyring::Entry;
use tracing::{debug, warn};

use crate::config::TokenCacheBackend;
use crate::error::StoreError;
use crate::persistence::{load_optional, save_secure};

/// Keychain service name for token caches.
const KEYCHAIN_SERVICE: &str = "copilot-client";

// ============================================================================
// Persistence Trait
// ============================================================================

/// Storage for the serialized token cache.
#[async_trait]
pub trait CachePersistence: Send + Sync + fmt::Debug {
    /// Loads the cache; `None` or an empty string both mean "no cache".
    async fn load(&self) -> Result<Option<String>, StoreError>;

    /// Replaces the stored cache.
    async fn save(&self, content: &str) -> Result<(), StoreError>;

    /// Describes where the cache lives, for display.
    fn location(&self) -> String;
}

/// Opens the configured backend.
pub fn open_persistence(backend: TokenCacheBackend, path: &Path) -> Arc<dyn CachePersistence> {
    match backend {
        TokenCacheBackend::File => Arc::new(FilePersistence::new(path)),
        TokenCacheBackend::Keychain => Arc::new(KeychainPersistence::new(path)),
    }
}

// ============================================================================
// File Backend
// ============================================================================

/// Owner-only JSON file.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    /// Creates a backend for `path`. Nothing is touched until the first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the cache file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CachePersistence for FilePersistence {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        load_optional(&self.path).await
    }

    async fn save(&self, content: &str) -> Result<(), StoreError> {
        save_secure(&self.path, content).await
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

// ============================================================================
// Keychain Backend
// ============================================================================

/// System keychain entry, keyed by the configured cache path.
#[derive(Debug, Clone)]
pub struct KeychainPersistence {
    account: String,
}

impl KeychainPersistence {
    /// Creates a backend whose keychain account is `path`.
    pub fn new(path: &Path) -> Self {
        Self {
            account: path.display().to_string(),
        }
    }

    fn entry(&self) -> Result<Entry, StoreError> {
        Ok(Entry::new(KEYCHAIN_SERVICE, &self.account)?)
    }
}

#[async_trait]
impl CachePersistence for KeychainPersistence {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        debug!(account = %self.account, "Reading token cache from keychain");

        match self.entry()?.get_password() {
            Ok(secret) if secret.is_empty() => Ok(None),
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => {
                debug!(account = %self.account, "No keychain entry");
                Ok(None)
            }
            Err(e) => {
                warn!(account = %self.account, error = %e, "Failed to read keychain entry");
                Err(e.into())
            }
        }
    }

    async fn save(&self, content: &str) -> Result<(), StoreError> {
        let entry = self.entry()?;

        if content.is_empty() {
            return match entry.delete_credential() {
                Ok(()) | Err(keyring::Error::NoEntry) => {
                    debug!(account = %self.account, "Keychain entry cleared");
                    Ok(())
                }
                Err(e) => {
                    warn!(account = %self.account, error = %e, "Failed to clear keychain entry");
                    Err(e.into())
                }
            };
        }

        entry.set_password(content).map_err(|e| {
            warn!(account = %self.account, error = %e, "Failed to write keychain entry");
            StoreError::from(e)
        })?;
        debug!(account = %self.account, "Token cache stored in keychain");
        Ok(())
    }

    fn location(&self) -> String {
        format!("keychain:{KEYCHAIN_SERVICE}/{}", self.account)
    }
}

// ============================================================================
// Memory Backend
// ============================================================================

/// Process-local cache that is never written anywhere.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    content: Mutex<Option<String>>,
    saves: Mutex<Vec<String>>,
}

impl MemoryPersistence {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cache preloaded with `content`.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Mutex::new(Some(content.into())),
            saves: Mutex::new(Vec::new()),
        }
    }

    /// Every payload saved so far, oldest first.
    pub fn saved(&self) -> Vec<String> {
        self.saves.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CachePersistence for MemoryPersistence {
    async fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.content.lock().map(|c| c.clone()).unwrap_or_default())
    }

    async fn save(&self, content: &str) -> Result<(), StoreError> {
        if let Ok(mut current) = self.content.lock() {
            *current = Some(content.to_string());
        }
        if let Ok(mut saves) = self.saves.lock() {
            saves.push(content.to_string());
        }
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_file_backend_round_trip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("cache").join("token_cache.json");
        let backend = FilePersistence::new(&path);

        assert!(backend.load().await.unwrap().is_none());
        assert!(!path.exists(), "load must not create the file");

        backend.save(r#"{"accounts":[]}"#).await.unwrap();
        assert_eq!(
            backend.load().await.unwrap().as_deref(),
            Some(r#"{"accounts":[]}"#)
        );

        backend.save("").await.unwrap();
        assert_eq!(backend.load().await.unwrap().as_deref(), Some(""));
    }

    #[test]
    fn test_locations() {
        let path = Path::new("/tmp/token_cache.json");
        assert_eq!(FilePersistence::new(path).location(), "/tmp/token_cache.json");
        assert_eq!(
            KeychainPersistence::new(path).location(),
            "keychain:copilot-client//tmp/token_cache.json"
        );
        assert_eq!(
            open_persistence(TokenCacheBackend::File, path).location(),
            "/tmp/token_cache.json"
        );
    }

    #[tokio::test]
    async fn test_memory_backend_records_saves() {
        let backend = MemoryPersistence::with_content("seed");
        assert_eq!(backend.load().await.unwrap().as_deref(), Some("seed"));

        backend.save("next").await.unwrap();
        backend.save("").await.unwrap();

        assert_eq!(backend.saved(), vec!["next".to_string(), String::new()]);
        assert_eq!(backend.load().await.unwrap().as_deref(), Some(""));
    }
}
