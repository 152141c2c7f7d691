//! File persistence helpers.
//!
//! Token caches are written owner-only: files get `0600`, directories created
//! on the way get `0700`, and every write goes through a temp file and rename.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default cache directory.
///
/// - macOS: `~/Library/Caches/CopilotClient`
/// - Linux: `~/.cache/copilot-client`
/// - Windows: `%LOCALAPPDATA%\copilot-client`
pub fn default_cache_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        dirs::home_dir()
            .map(|h| h.join("Library").join("Caches").join("CopilotClient"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|c| c.join("copilot-client"))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Returns the default token cache file path.
pub fn default_token_cache_path() -> PathBuf {
    default_cache_dir().join("token_cache.json")
}

// ============================================================================
// Permissions
// ============================================================================

/// Applies `mode` to `path`. Token files get `0o600`, directories `0o700`.
#[cfg(unix)]
async fn restrict(path: &Path, mode: u32) -> Result<(), StoreError> {
    use std::os::unix::fs::PermissionsExt;

    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode)).await?;
    debug!(path = %path.display(), mode = %format!("{mode:o}"), "Restricted permissions");
    Ok(())
}

#[cfg(not(unix))]
async fn restrict(_path: &Path, _mode: u32) -> Result<(), StoreError> {
    Ok(())
}

// ============================================================================
// File Operations
// ============================================================================

/// Creates missing parent directories, restricting each one it creates.
async fn create_secure_parent_dirs(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }

    let mut created = Vec::new();
    let mut current = parent.to_path_buf();
    while !current.as_os_str().is_empty() && !current.exists() {
        created.push(current.clone());
        if !current.pop() {
            break;
        }
    }

    debug!(path = %parent.display(), "Creating secure directory");
    tokio::fs::create_dir_all(parent).await?;
    for dir in created {
        restrict(&dir, 0o700).await?;
    }
    Ok(())
}

/// Writes text to `path` atomically with owner-only permissions.
pub async fn save_secure(path: &Path, content: &str) -> Result<(), StoreError> {
    debug!(path = %path.display(), bytes = content.len(), "Saving file");

    create_secure_parent_dirs(path).await?;

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    tokio::fs::write(&temp_path, content).await?;
    restrict(&temp_path, 0o600).await?;
    tokio::fs::rename(&temp_path, path).await?;

    debug!(path = %path.display(), "File saved securely");
    Ok(())
}

/// Reads text from `path`; a missing file reads as `None`.
pub async fn load_optional(path: &Path) -> Result<Option<String>, StoreError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => {
            debug!(path = %path.display(), bytes = content.len(), "File loaded");
            Ok(Some(content))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "File not found");
            Ok(None)
        }
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// Tests
// ============================================================================
