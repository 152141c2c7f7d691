//! Token cache contents.
//!
//! Only accounts and refresh tokens are persisted. Access tokens stay in
//! memory and are re-derived through the refresh grant after a restart.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::provider::Account;

/// Access tokens this close to expiry, in seconds, are treated as expired.
pub const EXPIRY_MARGIN_SECS: i64 = 300;

/// A persisted refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenEntry {
    /// Account the token belongs to.
    pub home_account_id: String,
    /// The refresh token.
    pub secret: String,
}

/// The persisted token cache.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenCache {
    /// Known accounts, most recently used first.
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Refresh tokens by account.
    #[serde(default)]
    pub refresh_tokens: Vec<RefreshTokenEntry>,
}

impl TokenCache {
    /// Parses persisted content; empty or unreadable content is an empty cache.
    pub fn from_persisted(content: Option<&str>) -> Self {
        let Some(content) = content.map(str::trim).filter(|c| !c.is_empty()) else {
            return Self::default();
        };
        match serde_json::from_str(content) {
            Ok(cache) => cache,
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable token cache");
                Self::default()
            }
        }
    }

    /// Serializes for persistence.
    pub fn to_persisted(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Inserts or refreshes an account and moves it to the front.
    pub fn upsert_account(&mut self, account: Account) {
        self.accounts
            .retain(|a| a.home_account_id != account.home_account_id);
        self.accounts.insert(0, account);
    }

    /// Stores the refresh token for an account.
    pub fn set_refresh_token(&mut self, home_account_id: &str, secret: String) {
        match self
            .refresh_tokens
            .iter_mut()
            .find(|e| e.home_account_id == home_account_id)
        {
            Some(entry) => entry.secret = secret,
            None => self.refresh_tokens.push(RefreshTokenEntry {
                home_account_id: home_account_id.to_string(),
                secret,
            }),
        }
    }

    /// Returns the refresh token for an account.
    pub fn refresh_token(&self, home_account_id: &str) -> Option<&str> {
        self.refresh_tokens
            .iter()
            .find(|e| e.home_account_id == home_account_id)
            .map(|e| e.secret.as_str())
    }

    /// Drops an account and its refresh token.
    pub fn remove_account(&mut self, home_account_id: &str) {
        self.accounts.retain(|a| a.home_account_id != home_account_id);
        self.refresh_tokens
            .retain(|e| e.home_account_id != home_account_id);
    }
}

/// An in-memory access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessTokenEntry {
    /// Bearer token.
    pub secret: String,
    /// Scopes it was requested for.
    pub scopes: Vec<String>,
    /// Expiry instant.
    pub expires_at: DateTime<Utc>,
}

impl AccessTokenEntry {
    /// Whether this token covers `scopes` and outlives the expiry margin.
    pub fn is_usable(&self, scopes: &[String], now: DateTime<Utc>) -> bool {
        let covers = scopes
            .iter()
            .all(|s| self.scopes.iter().any(|have| have.eq_ignore_ascii_case(s)));
        covers && self.expires_at - now > Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Access tokens by account.
pub type AccessTokens = HashMap<String, AccessTokenEntry>;

#[cfg(test)]
mod tests {
    use super::*;

    fn account(id: &str) -> Account {
        Account {
            home_account_id: id.to_string(),
            ..Account::default()
        }
    }

    #[test]
    fn test_from_persisted_empty_and_corrupt() {
        assert_eq!(TokenCache::from_persisted(None), TokenCache::default());
        assert_eq!(TokenCache::from_persisted(Some("  ")), TokenCache::default());
        assert_eq!(TokenCache::from_persisted(Some("{not json")), TokenCache::default());
    }

    #[test]
    fn test_persisted_round_trip_keeps_no_access_tokens() {
        let mut cache = TokenCache::default();
        cache.upsert_account(account("a.t"));
        cache.set_refresh_token("a.t", "rt-1".to_string());

        let text = cache.to_persisted().unwrap();
        assert!(text.contains("rt-1"));
        assert!(!text.contains("access"));
        assert_eq!(TokenCache::from_persisted(Some(&text)), cache);
    }

    #[test]
    fn test_upsert_moves_account_to_front() {
        let mut cache = TokenCache::default();
        cache.upsert_account(account("a"));
        cache.upsert_account(account("b"));
        cache.upsert_account(account("a"));

        let ids: Vec<_> = cache.accounts.iter().map(|a| a.home_account_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_refresh_token_replace_and_remove() {
        let mut cache = TokenCache::default();
        cache.upsert_account(account("a"));
        cache.set_refresh_token("a", "old".to_string());
        cache.set_refresh_token("a", "new".to_string());
        assert_eq!(cache.refresh_token("a"), Some("new"));
        assert_eq!(cache.refresh_tokens.len(), 1);

        cache.remove_account("a");
        assert!(cache.accounts.is_empty());
        assert!(cache.refresh_token("a").is_none());
    }

    #[test]
    fn test_access_token_usability() {
        let now = Utc::now();
        let entry = AccessTokenEntry {
            secret: "at".to_string(),
            scopes: vec!["Sites.Read.All".to_string(), "openid".to_string()],
            expires_at: now + Duration::minutes(30),
        };

        assert!(entry.is_usable(&["sites.read.all".to_string()], now));
        assert!(!entry.is_usable(&["Mail.Read".to_string()], now));
        assert!(!entry.is_usable(&["openid".to_string()], now + Duration::minutes(26)));
    }
}
