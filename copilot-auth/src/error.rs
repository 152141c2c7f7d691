//! Authentication error types.

use copilot_store::StoreError;
use thiserror::Error;

/// Error code returned when a registration only allows SPA token redemption.
pub const PLATFORM_MISMATCH_CODE: &str = "AADSTS9002327";

/// Errors raised while acquiring or clearing credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Browser sign-in failed and no fallback was attempted.
    #[error("Interactive login failed: {0}")]
    InteractiveFailed(String),

    /// The device-code request itself was rejected.
    #[error("Device code initialization failed: {0}")]
    DeviceInitFailed(String),

    /// The user did not complete device-code sign-in.
    #[error("Device code login failed: {0}")]
    DeviceLoginFailed(String),

    /// Browser sign-in failed, then the device-code fallback failed too.
    #[error("Interactive login failed: {interactive}\n\nDevice code fallback failed: {device}")]
    FallbackFailed {
        /// Interactive failure message.
        interactive: String,
        /// Device-code failure.
        device: Box<AuthError>,
    },

    /// The cache was erased but some accounts could not be removed.
    #[error("Sign-out incomplete, accounts could not be removed: {0}")]
    SignOutIncomplete(String),

    /// Reading or writing the token cache failed.
    #[error("Token cache error: {0}")]
    Cache(#[from] StoreError),

    /// The identity HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Explains how to fix a registration that rejects desktop token redemption.
pub fn platform_mismatch_message(original: &str) -> String {
    format!(
        "Interactive login failed due to app registration platform mismatch ({PLATFORM_MISMATCH_CODE}). \
         This desktop app must use a Public client (native) registration, not SPA token redemption. \
         In Microsoft Entra app registration, add platform 'Mobile and desktop applications' with redirect URI \
         'http://localhost' and keep using delegated scopes. Optionally set COPILOT_AUTH_FLOW=device_code \
         as a temporary fallback.\n\nOriginal error: {original}"
    )
}
