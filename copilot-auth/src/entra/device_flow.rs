//! Device authorization grant (RFC 8628) against the Microsoft identity
//! platform.
//!
//! ## Flow
//!
//! 1. **Start**: POST to `{authority}/oauth2/v2.0/devicecode`
//! 2. **Display**: show the user the verification URL and user code
//! 3. **Poll**: POST to `{authority}/oauth2/v2.0/token` until the user finishes
//! 4. **Complete**: hand the token response back to the provider

use std::time::{Duration, Instant};

use reqwest::Client;
use tracing::{debug, instrument, warn};

use super::Endpoints;
use super::token::{DEVICE_CODE_GRANT, TokenResponse, read_json, request_failure};
use crate::provider::{DeviceCode, ProviderFailure};

/// Extra wait added after a `slow_down` answer.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// One poll of the token endpoint.
#[derive(Debug, Clone)]
pub enum DeviceFlowResult {
    /// User has not finished yet.
    Pending,
    /// Polling too fast.
    SlowDown,
    /// User finished.
    Token(Box<TokenResponse>),
    /// Terminal failure (expired, declined, or rejected).
    Failed(ProviderFailure),
}

/// Device-code client for one app registration.
#[derive(Debug, Clone)]
pub struct DeviceFlow<'a> {
    http: &'a Client,
    endpoints: &'a Endpoints,
    client_id: &'a str,
}

impl<'a> DeviceFlow<'a> {
    /// Creates a flow client.
    pub fn new(http: &'a Client, endpoints: &'a Endpoints, client_id: &'a str) -> Self {
        Self {
            http,
            endpoints,
            client_id,
        }
    }

    /// Requests a device code.
    #[instrument(skip(self))]
    pub async fn start(&self, scope: &str) -> Result<DeviceCode, ProviderFailure> {
        debug!("Starting device code flow");

        let response = self
            .http
            .post(&self.endpoints.device_code)
            .form(&[("client_id", self.client_id), ("scope", scope)])
            .send()
            .await
            .map_err(|e| request_failure(&e))?;

        let flow: DeviceCode = read_json(response).await?;
        if flow.user_code.is_empty() {
            return Err(ProviderFailure::new(
                "invalid_response",
                "Device code response did not include a user code",
            ));
        }

        debug!(
            verification_uri = %flow.verification_uri,
            expires_in = flow.expires_in,
            interval = flow.interval,
            "Device code flow started"
        );
        Ok(flow)
    }

    /// Polls the token endpoint once.
    #[instrument(skip(self, flow))]
    pub async fn poll(&self, flow: &DeviceCode) -> DeviceFlowResult {
        let response = match self
            .http
            .post(&self.endpoints.token)
            .form(&[
                ("grant_type", DEVICE_CODE_GRANT),
                ("client_id", self.client_id),
                ("device_code", flow.device_code.as_str()),
                ("client_info", "1"),
            ])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return DeviceFlowResult::Failed(request_failure(&e)),
        };

        match read_json::<TokenResponse>(response).await {
            Ok(token) => {
                debug!("Device code flow completed");
                DeviceFlowResult::Token(Box::new(token))
            }
            Err(failure) => match failure.error.as_deref() {
                Some("authorization_pending") => {
                    debug!("Authorization pending");
                    DeviceFlowResult::Pending
                }
                Some("slow_down") => {
                    debug!("Polling too fast");
                    DeviceFlowResult::SlowDown
                }
                _ => {
                    warn!(error = %failure.message(), "Device code flow failed");
                    DeviceFlowResult::Failed(failure)
                }
            },
        }
    }

    /// Polls until the user finishes, the code expires, or the server rejects.
    pub async fn wait(&self, flow: &DeviceCode) -> Result<TokenResponse, ProviderFailure> {
        let mut interval = Duration::from_secs(flow.interval);
        let deadline = Instant::now() + Duration::from_secs(flow.expires_in);

        loop {
            if Instant::now() >= deadline {
                return Err(ProviderFailure::new(
                    "expired_token",
                    "The device code expired before sign-in completed",
                ));
            }

            tokio::time::sleep(interval).await;

            match self.poll(flow).await {
                DeviceFlowResult::Pending => {}
                DeviceFlowResult::SlowDown => interval += SLOW_DOWN_STEP,
                DeviceFlowResult::Token(token) => return Ok(*token),
                DeviceFlowResult::Failed(failure) => return Err(failure),
            }
        }
    }
}
