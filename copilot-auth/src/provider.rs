//! Identity provider abstraction.
//!
//! The credential manager only talks to an [`IdentityProvider`]; the concrete
//! Microsoft identity platform client lives in [`crate::entra`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Prompt value sent with every interactive request.
pub const SELECT_ACCOUNT_PROMPT: &str = "select_account";

const UNKNOWN_ERROR: &str = "Unknown authentication error";

// ============================================================================
// Account
// ============================================================================

/// A cached account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// `<object id>.<tenant id>` identifier.
    #[serde(default)]
    pub home_account_id: String,
    /// Object id in the signing-in tenant.
    #[serde(default)]
    pub local_account_id: String,
    /// Sign-in name.
    #[serde(default)]
    pub username: Option<String>,
    /// Tenant id claim.
    #[serde(default, rename = "tenantId", skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    /// Tenant the account was cached under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    /// Authority host.
    #[serde(default)]
    pub environment: String,
}

impl Account {
    /// Resolves the tenant: `tenantId`, then `realm`, trimmed.
    pub fn tenant(&self) -> Option<String> {
        [&self.tenant_id, &self.realm]
            .into_iter()
            .flatten()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
            .map(ToString::to_string)
    }

    /// Stable user id: the local account id, else the object-id half of the
    /// home account id.
    pub fn user_id(&self) -> Option<String> {
        let local = self.local_account_id.trim();
        if !local.is_empty() {
            return Some(local.to_string());
        }

        let home = self.home_account_id.trim();
        let (object_id, _) = home.split_once('.')?;
        let object_id = object_id.trim();
        (!object_id.is_empty()).then(|| object_id.to_string())
    }
}

// ============================================================================
// Grants and Flows
// ============================================================================

/// A successful token response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// Bearer token.
    pub access_token: String,
    /// Seconds until expiry, when reported.
    pub expires_in: Option<u64>,
    /// Account the token was issued to, when known.
    pub account: Option<Account>,
}

impl TokenGrant {
    /// Creates a grant carrying only a bearer token.
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_in: None,
            account: None,
        }
    }
}

/// An initiated device-code flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCode {
    /// Code the client polls with.
    pub device_code: String,
    /// Code the user enters.
    pub user_code: String,
    /// Page where the user enters the code.
    pub verification_uri: String,
    /// Seconds until the codes expire.
    pub expires_in: u64,
    /// Minimum polling interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
    /// Instruction text to show the user.
    #[serde(default)]
    pub message: String,
}

fn default_interval() -> u64 {
    5
}

impl DeviceCode {
    /// Instruction text, synthesized when the server sent none.
    pub fn instructions(&self) -> String {
        if self.message.trim().is_empty() {
            format!(
                "To sign in, open {} and enter the code {}.",
                self.verification_uri, self.user_code
            )
        } else {
            self.message.clone()
        }
    }
}

/// Parameters for a browser sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractiveRequest {
    /// Scopes to request.
    pub scopes: Vec<String>,
    /// Account-picker behavior.
    pub prompt: &'static str,
    /// Loopback redirect, when configured.
    pub redirect_uri: Option<String>,
}

/// A failed provider call, as `error` / `error_description` fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderFailure {
    /// Short error code.
    #[serde(default)]
    pub error: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub error_description: Option<String>,
}

impl ProviderFailure {
    /// Creates a failure with a code and description.
    pub fn new(error: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            error_description: Some(description.into()),
        }
    }

    /// Description, else code, else a generic message.
    pub fn message(&self) -> String {
        [&self.error_description, &self.error]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
            .map_or_else(|| UNKNOWN_ERROR.to_string(), Clone::clone)
    }
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Token acquisition primitives offered by an identity platform.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Cached accounts, most relevant first.
    async fn accounts(&self) -> Vec<Account>;

    /// Forgets an account and its tokens.
    async fn remove_account(&self, account: &Account) -> Result<(), ProviderFailure>;

    /// Renews a token without user interaction; `None` when not possible.
    async fn acquire_token_silent(&self, scopes: &[String], account: &Account) -> Option<TokenGrant>;

    /// Signs the user in through the browser.
    async fn acquire_token_interactive(
        &self,
        request: &InteractiveRequest,
    ) -> Result<TokenGrant, ProviderFailure>;

    /// Starts a device-code flow.
    async fn initiate_device_flow(&self, scopes: &[String]) -> Result<DeviceCode, ProviderFailure>;

    /// Waits for the user to finish a device-code flow.
    async fn acquire_token_by_device_flow(
        &self,
        flow: &DeviceCode,
    ) -> Result<TokenGrant, ProviderFailure>;
}

// ============================================================================
// Tests
// ============================================================================
