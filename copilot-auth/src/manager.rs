//! Credential manager.
//!
//! Implements the sign-in chain on top of an [`IdentityProvider`]:
//!
//! 1. silent renewal with the first cached account
//! 2. device code, when that is the configured flow
//! 3. otherwise interactive, falling back to device code when configured or
//!    when the registration rejects desktop sign-in

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use copilot_core::CredentialSession;
use copilot_store::{AppSettings, AuthFlow, CachePersistence};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{AuthError, PLATFORM_MISMATCH_CODE, platform_mismatch_message};
use crate::provider::{Account, IdentityProvider, InteractiveRequest, SELECT_ACCOUNT_PROMPT};

/// Receives the device-code instruction text.
pub type DevicePrompt = Arc<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// Credential API
// ============================================================================

/// What the orchestrator needs from credential management.
#[async_trait]
pub trait CredentialApi: Send + Sync {
    /// Returns a bearer token, signing in if needed.
    async fn acquire_access_token(&self) -> Result<String, AuthError>;

    /// Describes the signed-in account, if any.
    async fn session_state(&self) -> CredentialSession;

    /// Acquires a token and returns the resulting session.
    async fn sign_in(&self) -> Result<CredentialSession, AuthError>;

    /// Forgets every account and erases the persisted cache.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// Stable id of the signed-in user.
    async fn user_id(&self) -> Option<String>;
}

// ============================================================================
// Credential Manager
// ============================================================================

/// Credential lifecycle over an identity provider.
pub struct CredentialManager {
    provider: Arc<dyn IdentityProvider>,
    persistence: Arc<dyn CachePersistence>,
    scopes: Vec<String>,
    tenant_id: String,
    auth_flow: AuthFlow,
    redirect_uri: Option<String>,
    prompt: DevicePrompt,
    lock: Mutex<()>,
}

impl fmt::Debug for CredentialManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialManager")
            .field("scopes", &self.scopes)
            .field("tenant_id", &self.tenant_id)
            .field("auth_flow", &self.auth_flow)
            .field("redirect_uri", &self.redirect_uri)
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

impl CredentialManager {
    /// Creates a manager for `settings`.
    pub fn new(
        settings: &AppSettings,
        provider: Arc<dyn IdentityProvider>,
        persistence: Arc<dyn CachePersistence>,
    ) -> Self {
        let redirect_uri = Some(settings.redirect_uri.trim().to_string()).filter(|r| !r.is_empty());

        Self {
            provider,
            persistence,
            scopes: settings.scopes.clone(),
            tenant_id: settings.tenant_id.clone(),
            auth_flow: settings.auth_flow,
            redirect_uri,
            prompt: Arc::new(|message: &str| info!(%message, "Device code sign-in required")),
            lock: Mutex::new(()),
        }
    }

    /// Replaces the device-code prompt.
    #[must_use]
    pub fn with_device_prompt(mut self, prompt: DevicePrompt) -> Self {
        self.prompt = prompt;
        self
    }

    async fn first_account(&self) -> Option<Account> {
        self.provider.accounts().await.into_iter().next()
    }

    async fn acquire_locked(&self) -> Result<String, AuthError> {
        if let Some(account) = self.first_account().await {
            debug!(home_account_id = %account.home_account_id, "Trying silent renewal");
            if let Some(grant) = self.provider.acquire_token_silent(&self.scopes, &account).await {
                debug!("Silent renewal succeeded");
                return Ok(grant.access_token);
            }
            debug!("Silent renewal unavailable");
        }

        if self.auth_flow == AuthFlow::DeviceCode {
            return self.acquire_by_device_code().await;
        }

        let request = InteractiveRequest {
            scopes: self.scopes.clone(),
            prompt: SELECT_ACCOUNT_PROMPT,
            redirect_uri: self.redirect_uri.clone(),
        };
        let failure = match self.provider.acquire_token_interactive(&request).await {
            Ok(grant) => {
                info!("Interactive sign-in succeeded");
                return Ok(grant.access_token);
            }
            Err(failure) => failure,
        };

        let message = failure.message();
        let platform_mismatch = message.contains(PLATFORM_MISMATCH_CODE);
        warn!(error = %message, platform_mismatch, "Interactive sign-in failed");

        if self.auth_flow == AuthFlow::InteractiveThenDevice || platform_mismatch {
            info!("Falling back to device code sign-in");
            return self.acquire_by_device_code().await.map_err(|device| {
                let interactive = if platform_mismatch {
                    platform_mismatch_message(&message)
                } else {
                    message
                };
                AuthError::FallbackFailed {
                    interactive,
                    device: Box::new(device),
                }
            });
        }

        Err(AuthError::InteractiveFailed(message))
    }

    async fn acquire_by_device_code(&self) -> Result<String, AuthError> {
        let flow = self
            .provider
            .initiate_device_flow(&self.scopes)
            .await
            .map_err(|f| AuthError::DeviceInitFailed(f.message()))?;

        (self.prompt)(&flow.instructions());

        let grant = self
            .provider
            .acquire_token_by_device_flow(&flow)
            .await
            .map_err(|f| AuthError::DeviceLoginFailed(f.message()))?;

        info!("Device code sign-in succeeded");
        Ok(grant.access_token)
    }

    async fn session_from_accounts(&self) -> CredentialSession {
        let Some(account) = self.first_account().await else {
            return CredentialSession::signed_out();
        };

        let tenant_id = account.tenant().unwrap_or_else(|| self.tenant_id.clone());
        CredentialSession::signed_in(account.username.clone(), Some(tenant_id), account.user_id())
    }
}

#[async_trait]
impl CredentialApi for CredentialManager {
    #[instrument(skip(self), fields(flow = %self.auth_flow))]
    async fn acquire_access_token(&self) -> Result<String, AuthError> {
        let _guard = self.lock.lock().await;
        self.acquire_locked().await
    }

    async fn session_state(&self) -> CredentialSession {
        self.session_from_accounts().await
    }

    #[instrument(skip(self))]
    async fn sign_in(&self) -> Result<CredentialSession, AuthError> {
        let _guard = self.lock.lock().await;
        self.acquire_locked().await?;
        Ok(self.session_from_accounts().await)
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AuthError> {
        let _guard = self.lock.lock().await;

        let mut failures = Vec::new();
        for account in self.provider.accounts().await {
            if let Err(failure) = self.provider.remove_account(&account).await {
                warn!(
                    home_account_id = %account.home_account_id,
                    error = %failure.message(),
                    "Failed to remove account"
                );
                failures.push(failure.message());
            }
        }
        // The persisted cache is erased even when an account could not be removed.
        self.persistence.save("").await?;

        if !failures.is_empty() {
            return Err(AuthError::SignOutIncomplete(failures.join("; ")));
        }

        info!(cache = %self.persistence.location(), "Signed out");
        Ok(())
    }

    async fn user_id(&self) -> Option<String> {
        self.first_account().await.and_then(|account| account.user_id())
    }
}
