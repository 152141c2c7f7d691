//! Application settings.
//!
//! Settings come from `COPILOT_*` environment variables. Values missing from
//! the process environment are looked up in `.env` files, checked in this
//! order (the first file that defines a key wins):
//!
//! 1. the file named by `COPILOT_ENV_FILE`
//! 2. `.env` in the current directory
//! 3. `.env` next to the executable

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;
use crate::persistence::default_token_cache_path;

/// Default Graph API root.
pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/beta";
/// Default conversations endpoint.
pub const DEFAULT_CHAT_PATH: &str = "/copilot/conversations";
/// Default search endpoint.
pub const DEFAULT_SEARCH_PATH: &str = "/copilot/search";
/// Default retrieval endpoint.
pub const DEFAULT_RETRIEVAL_PATH: &str = "/copilot/retrieval";
/// Default batch endpoint.
pub const DEFAULT_BATCH_PATH: &str = "/$batch";
/// Default AI interactions endpoint; `{user_id}` is substituted per call.
pub const DEFAULT_AI_INTERACTIONS_PATH: &str =
    "/copilot/users/{user_id}/interactionHistory/getAllEnterpriseInteractions";
/// Default request timeout.
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 45;
/// Default retry count.
pub const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
/// Default loopback redirect for interactive sign-in.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost";

const ENV_FILE_NAME: &str = ".env";

// ============================================================================
// Auth Flow
// ============================================================================

/// How the credential manager signs a user in when silent renewal fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthFlow {
    /// Browser sign-in only.
    Interactive,
    /// Device-code sign-in only.
    DeviceCode,
    /// Browser sign-in, falling back to device code on failure.
    #[default]
    InteractiveThenDevice,
}

impl AuthFlow {
    /// Returns the configuration spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFlow::Interactive => "interactive",
            AuthFlow::DeviceCode => "device_code",
            AuthFlow::InteractiveThenDevice => "interactive_then_device",
        }
    }
}

impl FromStr for AuthFlow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "interactive" => Ok(AuthFlow::Interactive),
            "device_code" => Ok(AuthFlow::DeviceCode),
            "interactive_then_device" => Ok(AuthFlow::InteractiveThenDevice),
            other => Err(ConfigError::InvalidAuthFlow(other.to_string())),
        }
    }
}

impl fmt::Display for AuthFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Token Cache Backend
// ============================================================================

/// Where the token cache blob is kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenCacheBackend {
    /// Owner-only file on disk.
    #[default]
    File,
    /// System keychain entry.
    Keychain,
}

impl TokenCacheBackend {
    /// Returns the configuration spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenCacheBackend::File => "file",
            TokenCacheBackend::Keychain => "keychain",
        }
    }
}

impl FromStr for TokenCacheBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(TokenCacheBackend::File),
            "keychain" => Ok(TokenCacheBackend::Keychain),
            other => Err(ConfigError::InvalidCacheBackend(other.to_string())),
        }
    }
}

impl fmt::Display for TokenCacheBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Settings
// ============================================================================

/// Validated client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSettings {
    /// Directory (tenant) id.
    pub tenant_id: String,
    /// Application (client) id.
    pub client_id: String,
    /// Token authority URL.
    pub authority: String,
    /// Delegated scopes to request.
    pub scopes: Vec<String>,
    /// API root, without a trailing slash.
    pub base_url: String,
    /// Conversations endpoint.
    pub chat_path: String,
    /// Search endpoint.
    pub search_path: String,
    /// Retrieval endpoint.
    pub retrieval_path: String,
    /// Batch endpoint.
    pub batch_path: String,
    /// AI interactions endpoint template.
    pub ai_interactions_path: String,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Retries after the first attempt.
    pub retry_attempts: u32,
    /// Token cache location (file path or keychain key).
    pub token_cache_path: PathBuf,
    /// Token cache backend.
    pub token_cache_backend: TokenCacheBackend,
    /// Sign-in flow.
    pub auth_flow: AuthFlow,
    /// Redirect URI for interactive sign-in.
    pub redirect_uri: String,
    /// IANA time zone sent with chat messages, overriding the local zone.
    pub time_zone: Option<String>,
}

impl AppSettings {
    /// Loads settings from the process environment and any `.env` files.
    pub fn from_env() -> Result<Self, ConfigError> {
        let files = EnvFiles::discover();
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| files.get(key)))
    }

    /// Loads settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).unwrap_or_default();
        let var_or = |key: &str, default: &str| {
            lookup(key).map_or_else(|| default.to_string(), |v| v.trim().to_string())
        };

        let tenant_id = var("COPILOT_TENANT_ID");
        let client_id = var("COPILOT_CLIENT_ID");
        let mut authority = var("COPILOT_AUTHORITY");
        if authority.is_empty() && !tenant_id.is_empty() {
            authority = format!("https://login.microsoftonline.com/{tenant_id}");
        }

        let scopes = var("COPILOT_SCOPES")
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string)
            .collect();

        let timeout_seconds = parse_int("COPILOT_TIMEOUT_SECONDS", &lookup, DEFAULT_TIMEOUT_SECONDS)?;
        if timeout_seconds <= 0 {
            return Err(ConfigError::InvalidTimeout);
        }
        let retry_attempts = parse_int("COPILOT_RETRY_ATTEMPTS", &lookup, DEFAULT_RETRY_ATTEMPTS)?;
        let retry_attempts =
            u32::try_from(retry_attempts).map_err(|_| ConfigError::InvalidRetryAttempts)?;

        let token_cache_path = match var("COPILOT_TOKEN_CACHE_PATH") {
            path if path.is_empty() => default_token_cache_path(),
            path => PathBuf::from(path),
        };

        let token_cache_backend = match var("COPILOT_TOKEN_CACHE_BACKEND") {
            raw if raw.is_empty() => TokenCacheBackend::default(),
            raw => raw.parse()?,
        };
        let auth_flow = match var("COPILOT_AUTH_FLOW") {
            raw if raw.is_empty() => AuthFlow::default(),
            raw => raw.parse()?,
        };

        let time_zone = Some(var("COPILOT_TIMEZONE")).filter(|tz| !tz.is_empty());

        let settings = AppSettings {
            tenant_id,
            client_id,
            authority,
            scopes,
            base_url: var_or("COPILOT_BASE_URL", DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            chat_path: var_or("COPILOT_CHAT_PATH", DEFAULT_CHAT_PATH),
            search_path: var_or("COPILOT_SEARCH_PATH", DEFAULT_SEARCH_PATH),
            retrieval_path: var_or("COPILOT_RETRIEVAL_PATH", DEFAULT_RETRIEVAL_PATH),
            batch_path: var_or("COPILOT_BATCH_PATH", DEFAULT_BATCH_PATH),
            ai_interactions_path: var_or("COPILOT_AI_INTERACTIONS_PATH", DEFAULT_AI_INTERACTIONS_PATH),
            timeout_seconds: timeout_seconds.unsigned_abs(),
            retry_attempts,
            token_cache_path,
            token_cache_backend,
            auth_flow,
            redirect_uri: var_or("COPILOT_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            time_zone,
        };
        settings.validate()?;

        debug!(
            base_url = %settings.base_url,
            auth_flow = %settings.auth_flow,
            cache_backend = %settings.token_cache_backend,
            "Settings loaded"
        );
        Ok(settings)
    }

    /// Checks required values and endpoint paths.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.tenant_id.is_empty() {
            missing.push("COPILOT_TENANT_ID");
        }
        if self.client_id.is_empty() {
            missing.push("COPILOT_CLIENT_ID");
        }
        if self.authority.is_empty() {
            missing.push("COPILOT_AUTHORITY");
        }
        if self.scopes.is_empty() {
            missing.push("COPILOT_SCOPES");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingRequired(missing));
        }

        let paths = [
            ("COPILOT_CHAT_PATH", &self.chat_path),
            ("COPILOT_SEARCH_PATH", &self.search_path),
            ("COPILOT_RETRIEVAL_PATH", &self.retrieval_path),
            ("COPILOT_BATCH_PATH", &self.batch_path),
            ("COPILOT_AI_INTERACTIONS_PATH", &self.ai_interactions_path),
        ];
        let invalid: Vec<&'static str> = paths
            .iter()
            .filter(|(_, value)| !value.starts_with('/'))
            .map(|(name, _)| *name)
            .collect();
        if !invalid.is_empty() {
            return Err(ConfigError::InvalidPaths(invalid));
        }

        if self.timeout_seconds == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }
}

fn parse_int<F>(name: &'static str, lookup: &F, default: u32) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name).map(|v| v.trim().to_string()) {
        None => Ok(i64::from(default)),
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| ConfigError::InvalidNumber { name, value: raw }),
    }
}

// ============================================================================
// .env Files
// ============================================================================

/// Variables collected from `.env` files.
#[derive(Debug, Clone, Default)]
pub struct EnvFiles {
    values: HashMap<String, String>,
}

impl EnvFiles {
    /// Reads every candidate file that exists.
    pub fn discover() -> Self {
        Self::load(&candidate_env_files())
    }

    /// Reads the given files; earlier files take precedence.
    pub fn load(paths: &[PathBuf]) -> Self {
        let mut values = HashMap::new();
        for path in paths {
            let Ok(content) = std::fs::read_to_string(path) else {
                continue;
            };
            debug!(path = %path.display(), "Loading .env file");
            for (key, value) in parse_env_file(&content) {
                values.entry(key).or_insert(value);
            }
        }
        Self { values }
    }

    /// Looks up one variable.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Parses `KEY=value` lines, skipping blanks and `#` comments.
pub fn parse_env_file(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter_map(|(key, value)| {
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches('"').trim_matches('\'');
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}

fn candidate_env_files() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Ok(explicit) = std::env::var("COPILOT_ENV_FILE") {
        let explicit = explicit.trim();
        if !explicit.is_empty() {
            candidates.push(expand_home(explicit));
        }
    }

    match std::env::current_dir() {
        Ok(cwd) => candidates.push(cwd.join(ENV_FILE_NAME)),
        Err(e) => warn!(error = %e, "Cannot resolve current directory"),
    }

    if let Some(exe_dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(exe_dir.join(ENV_FILE_NAME));
    }

    let mut unique: Vec<PathBuf> = Vec::new();
    for path in candidates {
        let normalized = path.canonicalize().unwrap_or_else(|_| path.clone());
        if unique
            .iter()
            .any(|seen| seen.canonicalize().unwrap_or_else(|_| seen.clone()) == normalized)
        {
            continue;
        }
        unique.push(path);
    }
    unique
}

fn expand_home(raw: &str) -> PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir().map_or_else(|| PathBuf::from(raw), |home| home.join(rest)),
        None => PathBuf::from(raw),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn required() -> Vec<(&'static str, &'static str)> {
        vec![
            ("COPILOT_TENANT_ID", "11111111-2222-3333-4444-555555555555"),
            ("COPILOT_CLIENT_ID", "client-abc"),
            ("COPILOT_SCOPES", "Sites.Read.All, Mail.Read,,"),
        ]
    }

    #[test]
    fn test_defaults_applied() {
        let settings = AppSettings::from_lookup(lookup_from(&required())).unwrap();

        assert_eq!(
            settings.authority,
            "https://login.microsoftonline.com/11111111-2222-3333-4444-555555555555"
        );
        assert_eq!(settings.scopes, vec!["Sites.Read.All", "Mail.Read"]);
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.chat_path, "/copilot/conversations");
        assert_eq!(settings.batch_path, "/$batch");
        assert_eq!(settings.timeout_seconds, 45);
        assert_eq!(settings.retry_attempts, 3);
        assert_eq!(settings.auth_flow, AuthFlow::InteractiveThenDevice);
        assert_eq!(settings.token_cache_backend, TokenCacheBackend::File);
        assert_eq!(settings.redirect_uri, "http://localhost");
        assert!(settings.token_cache_path.ends_with("token_cache.json"));
        assert!(settings.time_zone.is_none());
    }

    #[test]
    fn test_missing_required_reported_together() {
        let err = AppSettings::from_lookup(lookup_from(&[])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required settings: COPILOT_TENANT_ID, COPILOT_CLIENT_ID, COPILOT_AUTHORITY, COPILOT_SCOPES"
        );
    }

    #[test]
    fn test_explicit_authority_satisfies_requirement() {
        let err = AppSettings::from_lookup(lookup_from(&[
            ("COPILOT_AUTHORITY", "https://login.example/tenant"),
            ("COPILOT_CLIENT_ID", "c"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingRequired(vec!["COPILOT_TENANT_ID", "COPILOT_SCOPES"])
        );
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let mut vars = required();
        vars.push(("COPILOT_BASE_URL", "https://graph.example/v1.0///"));
        let settings = AppSettings::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(settings.base_url, "https://graph.example/v1.0");
    }

    #[test]
    fn test_paths_must_be_rooted() {
        let mut vars = required();
        vars.push(("COPILOT_SEARCH_PATH", "copilot/search"));
        vars.push(("COPILOT_BATCH_PATH", "$batch"));
        let err = AppSettings::from_lookup(lookup_from(&vars)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidPaths(vec!["COPILOT_SEARCH_PATH", "COPILOT_BATCH_PATH"])
        );
    }

    #[test]
    fn test_numeric_validation() {
        let mut vars = required();
        vars.push(("COPILOT_TIMEOUT_SECONDS", "0"));
        assert_eq!(
            AppSettings::from_lookup(lookup_from(&vars)).unwrap_err(),
            ConfigError::InvalidTimeout
        );

        let mut vars = required();
        vars.push(("COPILOT_RETRY_ATTEMPTS", "-1"));
        assert_eq!(
            AppSettings::from_lookup(lookup_from(&vars)).unwrap_err(),
            ConfigError::InvalidRetryAttempts
        );

        let mut vars = required();
        vars.push(("COPILOT_TIMEOUT_SECONDS", "soon"));
        assert!(matches!(
            AppSettings::from_lookup(lookup_from(&vars)).unwrap_err(),
            ConfigError::InvalidNumber { name: "COPILOT_TIMEOUT_SECONDS", .. }
        ));

        let mut vars = required();
        vars.push(("COPILOT_RETRY_ATTEMPTS", " 0 "));
        let settings = AppSettings::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(settings.retry_attempts, 0);
    }

    #[test]
    fn test_auth_flow_parsing() {
        assert_eq!("DEVICE_CODE".parse::<AuthFlow>().unwrap(), AuthFlow::DeviceCode);
        assert_eq!(" interactive ".parse::<AuthFlow>().unwrap(), AuthFlow::Interactive);
        assert!(matches!(
            "browser".parse::<AuthFlow>(),
            Err(ConfigError::InvalidAuthFlow(_))
        ));

        let mut vars = required();
        vars.push(("COPILOT_AUTH_FLOW", "Device_Code"));
        let settings = AppSettings::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(settings.auth_flow, AuthFlow::DeviceCode);
    }

    #[test]
    fn test_cache_backend_parsing() {
        let mut vars = required();
        vars.push(("COPILOT_TOKEN_CACHE_BACKEND", "KEYCHAIN"));
        vars.push(("COPILOT_TOKEN_CACHE_PATH", "/tmp/cache.json"));
        let settings = AppSettings::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(settings.token_cache_backend, TokenCacheBackend::Keychain);
        assert_eq!(settings.token_cache_path, PathBuf::from("/tmp/cache.json"));

        let mut vars = required();
        vars.push(("COPILOT_TOKEN_CACHE_BACKEND", "sqlite"));
        assert_eq!(
            AppSettings::from_lookup(lookup_from(&vars)).unwrap_err(),
            ConfigError::InvalidCacheBackend("sqlite".to_string())
        );
    }

    #[test]
    fn test_time_zone_override() {
        let mut vars = required();
        vars.push(("COPILOT_TIMEZONE", " Europe/Berlin "));
        let settings = AppSettings::from_lookup(lookup_from(&vars)).unwrap();
        assert_eq!(settings.time_zone.as_deref(), Some("Europe/Berlin"));
    }

    #[test]
    fn test_default_ai_interactions_template() {
        let settings = AppSettings::from_lookup(lookup_from(&required())).unwrap();
        assert_eq!(
            settings.ai_interactions_path,
            "/copilot/users/{user_id}/interactionHistory/getAllEnterpriseInteractions"
        );
    }

    #[test]
    fn test_parse_env_file() {
        let content = "\
# comment
COPILOT_TENANT_ID = \"tenant\"
COPILOT_CLIENT_ID='client'

NOT_A_PAIR
=orphan
COPILOT_SCOPES=a,b=c
";
        let pairs = parse_env_file(content);
        assert_eq!(
            pairs,
            vec![
                ("COPILOT_TENANT_ID".to_string(), "tenant".to_string()),
                ("COPILOT_CLIENT_ID".to_string(), "client".to_string()),
                ("COPILOT_SCOPES".to_string(), "a,b=c".to_string()),
            ]
        );
    }

    #[test]
    fn test_env_files_first_file_wins() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.env");
        let second = dir.path().join("second.env");
        std::fs::write(&first, "COPILOT_CLIENT_ID=first\n").unwrap();
        std::fs::write(&second, "COPILOT_CLIENT_ID=second\nCOPILOT_TENANT_ID=t\n").unwrap();

        let files = EnvFiles::load(&[first, dir.path().join("missing.env"), second]);
        assert_eq!(files.get("COPILOT_CLIENT_ID").as_deref(), Some("first"));
        assert_eq!(files.get("COPILOT_TENANT_ID").as_deref(), Some("t"));
        assert!(files.get("COPILOT_SCOPES").is_none());
    }

    #[test]
    fn test_environment_beats_env_files() {
        let files = EnvFiles {
            values: HashMap::from([
                ("COPILOT_TENANT_ID".to_string(), "file-tenant".to_string()),
                ("COPILOT_CLIENT_ID".to_string(), "file-client".to_string()),
                ("COPILOT_SCOPES".to_string(), "s".to_string()),
            ]),
        };
        let env = lookup_from(&[("COPILOT_TENANT_ID", "env-tenant")]);
        let settings = AppSettings::from_lookup(|key| env(key).or_else(|| files.get(key))).unwrap();

        assert_eq!(settings.tenant_id, "env-tenant");
        assert_eq!(settings.client_id, "file-client");
    }
}
