//! Token endpoint wire types.

use reqwest::Response;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::ProviderFailure;

/// Grant type for device-code polling.
pub const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Successful token endpoint response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    /// Bearer token.
    pub access_token: String,
    /// Refresh token, when `offline_access` was granted.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// Granted scopes, space separated.
    #[serde(default)]
    pub scope: Option<String>,
    /// OpenID Connect ID token.
    #[serde(default)]
    pub id_token: Option<String>,
    /// Base64url `{uid, utid}` blob.
    #[serde(default)]
    pub client_info: Option<String>,
}

/// Wraps a transport error as a provider failure.
pub fn request_failure(e: &reqwest::Error) -> ProviderFailure {
    warn!(error = %e, "Identity request failed");
    ProviderFailure::new("request_failed", e.to_string())
}

/// Decodes a JSON response body, mapping error statuses and OAuth error
/// objects to [`ProviderFailure`].
pub async fn read_json<T>(response: Response) -> Result<T, ProviderFailure>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    let body = response.text().await.map_err(|e| request_failure(&e))?;
    debug!(status = %status, len = body.len(), "Identity response received");

    if !status.is_success() {
        return Err(match serde_json::from_str::<ProviderFailure>(&body) {
            Ok(failure) if failure.error.is_some() || failure.error_description.is_some() => failure,
            _ => ProviderFailure::new(
                "http_error",
                format!("HTTP {}: {}", status.as_u16(), body.chars().take(500).collect::<String>()),
            ),
        });
    }

    serde_json::from_str(&body).map_err(|e| {
        warn!(error = %e, "Unexpected identity response");
        ProviderFailure::new("invalid_response", e.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_response_minimal() {
        let response: TokenResponse =
            serde_json::from_str(r#"{"access_token":"at","token_type":"Bearer"}"#).unwrap();
        assert_eq!(response.access_token, "at");
        assert!(response.refresh_token.is_none());
    }

    #[test]
    fn test_token_response_full() {
        let response: TokenResponse = serde_json::from_str(
            r#"{"access_token":"at","refresh_token":"rt","expires_in":3599,
                "scope":"Sites.Read.All openid","id_token":"a.b.c","client_info":"eyJ9"}"#,
        )
        .unwrap();
        assert_eq!(response.expires_in, Some(3599));
        assert_eq!(response.refresh_token.as_deref(), Some("rt"));
        assert_eq!(response.client_info.as_deref(), Some("eyJ9"));
    }
}
