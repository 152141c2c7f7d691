//! Microsoft identity platform (Entra ID) provider.
//!
//! Public-client flows against the v2.0 endpoints under the configured
//! authority:
//!
//! - [`device_flow`] - device authorization grant
//! - [`interactive`] - authorization code + PKCE with a loopback redirect
//! - [`cache`] - accounts and refresh tokens, persisted after every change
//! - [`claims`] - account data from `id_token` / `client_info`

pub mod browser;
pub mod cache;
pub mod claims;
pub mod device_flow;
pub mod interactive;
pub mod token;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use copilot_store::{AppSettings, CachePersistence};
use reqwest::Client;
use ring::rand::SystemRandom;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use url::Url;

use self::cache::{AccessTokenEntry, AccessTokens, TokenCache};
use self::device_flow::DeviceFlow;
use self::interactive::{AuthorizationRequest, LoopbackListener, Pkce, REDIRECT_TIMEOUT, random_token};
use self::token::{TokenResponse, read_json, request_failure};
use crate::error::AuthError;
use crate::provider::{
    Account, DeviceCode, IdentityProvider, InteractiveRequest, ProviderFailure, TokenGrant,
};

/// Scopes added to every request so the response carries an ID token and a
/// refresh token.
pub const RESERVED_SCOPES: [&str; 3] = ["openid", "profile", "offline_access"];

/// Timeout for identity endpoint calls.
const IDENTITY_TIMEOUT: Duration = Duration::from_secs(30);

/// Fallback lifetime when a response omits `expires_in`.
const DEFAULT_EXPIRES_IN: u64 = 3600;

/// Opens the authorization URL for the user.
pub type BrowserLauncher = Arc<dyn Fn(&str) + Send + Sync>;

// ============================================================================
// Endpoints
// ============================================================================

/// v2.0 endpoints under one authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Authorization endpoint.
    pub authorize: String,
    /// Token endpoint.
    pub token: String,
    /// Device code endpoint.
    pub device_code: String,
}

impl Endpoints {
    /// Derives the endpoints from an authority URL.
    pub fn for_authority(authority: &str) -> Self {
        let base = authority.trim().trim_end_matches('/');
        Self {
            authorize: format!("{base}/oauth2/v2.0/authorize"),
            token: format!("{base}/oauth2/v2.0/token"),
            device_code: format!("{base}/oauth2/v2.0/devicecode"),
        }
    }
}

/// Configured scopes plus the reserved OpenID scopes, space separated.
pub fn request_scope(scopes: &[String]) -> String {
    let mut all: Vec<&str> = scopes.iter().map(String::as_str).collect();
    for reserved in RESERVED_SCOPES {
        if !all.iter().any(|s| s.eq_ignore_ascii_case(reserved)) {
            all.push(reserved);
        }
    }
    all.join(" ")
}

// ============================================================================
// Provider
// ============================================================================

#[derive(Debug, Default)]
struct ProviderState {
    cache: TokenCache,
    access_tokens: AccessTokens,
    device_scopes: Vec<String>,
}

/// Identity provider for one public-client app registration.
pub struct EntraIdentityProvider {
    http: Client,
    client_id: String,
    endpoints: Endpoints,
    environment: String,
    persistence: Arc<dyn CachePersistence>,
    browser: BrowserLauncher,
    rng: SystemRandom,
    state: Mutex<ProviderState>,
}

impl fmt::Debug for EntraIdentityProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntraIdentityProvider")
            .field("client_id", &self.client_id)
            .field("endpoints", &self.endpoints)
            .field("persistence", &self.persistence)
            .finish_non_exhaustive()
    }
}

impl EntraIdentityProvider {
    /// Creates a provider and loads the persisted cache.
    ///
    /// An unreadable cache is treated as empty; a backend that cannot be read
    /// at all is an error.
    pub async fn load(
        settings: &AppSettings,
        persistence: Arc<dyn CachePersistence>,
    ) -> Result<Self, AuthError> {
        let http = Client::builder().timeout(IDENTITY_TIMEOUT).build()?;
        let endpoints = Endpoints::for_authority(&settings.authority);
        let environment = Url::parse(&settings.authority)
            .ok()
            .and_then(|u| u.host_str().map(ToString::to_string))
            .unwrap_or_default();

        let persisted = persistence.load().await?;
        let cache = TokenCache::from_persisted(persisted.as_deref());
        debug!(
            accounts = cache.accounts.len(),
            location = %persistence.location(),
            "Token cache loaded"
        );

        Ok(Self {
            http,
            client_id: settings.client_id.clone(),
            endpoints,
            environment,
            persistence,
            browser: Arc::new(|url: &str| {
                info!(%url, "Opening browser for sign-in");
                browser::open_url(url);
            }),
            rng: SystemRandom::new(),
            state: Mutex::new(ProviderState {
                cache,
                access_tokens: AccessTokens::new(),
                device_scopes: Vec::new(),
            }),
        })
    }

    /// Replaces the browser launcher.
    #[must_use]
    pub fn with_browser(mut self, browser: BrowserLauncher) -> Self {
        self.browser = browser;
        self
    }

    async fn persist(&self, state: &ProviderState) {
        let content = match state.cache.to_persisted() {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Failed to serialize token cache");
                return;
            }
        };
        if let Err(e) = self.persistence.save(&content).await {
            warn!(error = %e, location = %self.persistence.location(), "Failed to persist token cache");
        }
    }

    /// Records a token response and turns it into a grant.
    async fn absorb(&self, response: TokenResponse, scopes: &[String]) -> TokenGrant {
        let account = claims::account_from_claims(
            response.id_token.as_deref(),
            response.client_info.as_deref(),
            &self.environment,
        );
        let expires_in = response.expires_in.unwrap_or(DEFAULT_EXPIRES_IN);

        if let Some(account) = &account {
            let mut state = self.state.lock().await;
            if let Some(refresh) = response.refresh_token.clone() {
                state.cache.set_refresh_token(&account.home_account_id, refresh);
            }
            state.cache.upsert_account(account.clone());
            state.access_tokens.insert(
                account.home_account_id.clone(),
                AccessTokenEntry {
                    secret: response.access_token.clone(),
                    scopes: granted_scopes(response.scope.as_deref(), scopes),
                    expires_at: Utc::now()
                        + chrono::Duration::seconds(i64::from(
                            u32::try_from(expires_in).unwrap_or(u32::MAX),
                        )),
                },
            );
            self.persist(&state).await;
        } else {
            warn!("Token response carried no account claims; nothing cached");
        }

        TokenGrant {
            access_token: response.access_token,
            expires_in: Some(expires_in),
            account,
        }
    }

    async fn redeem(&self, form: &[(&str, &str)]) -> Result<TokenResponse, ProviderFailure> {
        let response = self
            .http
            .post(&self.endpoints.token)
            .form(form)
            .send()
            .await
            .map_err(|e| request_failure(&e))?;
        read_json(response).await
    }
}

fn granted_scopes(granted: Option<&str>, requested: &[String]) -> Vec<String> {
    let mut scopes: Vec<String> = requested.to_vec();
    if let Some(granted) = granted {
        for scope in granted.split_whitespace() {
            if !scopes.iter().any(|s| s.eq_ignore_ascii_case(scope)) {
                scopes.push(scope.to_string());
            }
        }
    }
    scopes
}

#[async_trait]
impl IdentityProvider for EntraIdentityProvider {
    async fn accounts(&self) -> Vec<Account> {
        self.state.lock().await.cache.accounts.clone()
    }

    async fn remove_account(&self, account: &Account) -> Result<(), ProviderFailure> {
        let mut state = self.state.lock().await;
        state.cache.remove_account(&account.home_account_id);
        state.access_tokens.remove(&account.home_account_id);
        self.persist(&state).await;
        debug!(home_account_id = %account.home_account_id, "Account removed");
        Ok(())
    }

    #[instrument(skip(self, scopes, account), fields(home_account_id = %account.home_account_id))]
    async fn acquire_token_silent(&self, scopes: &[String], account: &Account) -> Option<TokenGrant> {
        let refresh_token = {
            let state = self.state.lock().await;
            if let Some(entry) = state.access_tokens.get(&account.home_account_id) {
                if entry.is_usable(scopes, Utc::now()) {
                    debug!("Using cached access token");
                    return Some(TokenGrant {
                        access_token: entry.secret.clone(),
                        expires_in: None,
                        account: Some(account.clone()),
                    });
                }
            }
            state.cache.refresh_token(&account.home_account_id)?.to_string()
        };

        let scope = request_scope(scopes);
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("refresh_token", refresh_token.as_str()),
            ("scope", scope.as_str()),
            ("client_info", "1"),
        ];
        match self.redeem(&form).await {
            Ok(response) => {
                debug!("Refresh grant succeeded");
                Some(self.absorb(response, scopes).await)
            }
            Err(failure) => {
                warn!(error = %failure.message(), "Refresh grant failed");
                None
            }
        }
    }

    #[instrument(skip(self, request))]
    async fn acquire_token_interactive(
        &self,
        request: &InteractiveRequest,
    ) -> Result<TokenGrant, ProviderFailure> {
        let listener = LoopbackListener::bind(request.redirect_uri.as_deref()).await?;
        let redirect_uri = listener.redirect_uri().to_string();
        let pkce = Pkce::generate(&self.rng)?;
        let expected_state = random_token(&self.rng, 16)?;
        let scope = request_scope(&request.scopes);

        let url = AuthorizationRequest {
            endpoint: &self.endpoints.authorize,
            client_id: &self.client_id,
            redirect_uri: &redirect_uri,
            scope: &scope,
            state: &expected_state,
            code_challenge: &pkce.challenge,
            prompt: request.prompt,
        }
        .url()?;

        (self.browser)(url.as_str());
        let authorization = listener.wait(REDIRECT_TIMEOUT).await?;

        if authorization.state.as_deref() != Some(expected_state.as_str()) {
            return Err(ProviderFailure::new(
                "state_mismatch",
                "The sign-in response did not match this request",
            ));
        }

        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("code", authorization.code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("code_verifier", pkce.verifier.as_str()),
            ("scope", scope.as_str()),
            ("client_info", "1"),
        ];
        let response = self.redeem(&form).await?;
        Ok(self.absorb(response, &request.scopes).await)
    }

    async fn initiate_device_flow(&self, scopes: &[String]) -> Result<DeviceCode, ProviderFailure> {
        let flow = DeviceFlow::new(&self.http, &self.endpoints, &self.client_id)
            .start(&request_scope(scopes))
            .await?;
        self.state.lock().await.device_scopes = scopes.to_vec();
        Ok(flow)
    }

    async fn acquire_token_by_device_flow(
        &self,
        flow: &DeviceCode,
    ) -> Result<TokenGrant, ProviderFailure> {
        let response = DeviceFlow::new(&self.http, &self.endpoints, &self.client_id)
            .wait(flow)
            .await?;
        let scopes = std::mem::take(&mut self.state.lock().await.device_scopes);
        Ok(self.absorb(response, &scopes).await)
    }
}

// ============================================================================
// Tests
// ============================================================================
