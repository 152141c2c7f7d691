//! Account claims from `id_token` and `client_info`.
//!
//! Neither value is verified here: both arrive over TLS straight from the
//! token endpoint and are only read for display and cache keys.

use base64::prelude::*;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::trace;

use crate::provider::Account;

/// Claims read from the ID token.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdTokenClaims {
    /// Object id.
    #[serde(default)]
    pub oid: Option<String>,
    /// Tenant id.
    #[serde(default)]
    pub tid: Option<String>,
    /// Sign-in name.
    #[serde(default)]
    pub preferred_username: Option<String>,
    /// Subject.
    #[serde(default)]
    pub sub: Option<String>,
}

/// The `client_info` blob: home object id and tenant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientInfo {
    /// Home object id.
    #[serde(default)]
    pub uid: Option<String>,
    /// Home tenant id.
    #[serde(default)]
    pub utid: Option<String>,
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Option<T> {
    let bytes = BASE64_URL_SAFE_NO_PAD
        .decode(segment.trim_end_matches('='))
        .or_else(|_| BASE64_STANDARD.decode(segment))
        .ok()?;
    let text = String::from_utf8(bytes).ok()?;
    trace!(len = text.len(), "Decoded claims segment");
    serde_json::from_str(&text).ok()
}

/// Reads the payload of a JWT without checking its signature.
pub fn decode_id_token(token: &str) -> Option<IdTokenClaims> {
    let mut parts = token.split('.');
    let (_, payload, _) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    decode_segment(payload)
}

/// Decodes a base64url `client_info` value.
pub fn decode_client_info(raw: &str) -> Option<ClientInfo> {
    decode_segment(raw)
}

/// Builds a cache account from token-response claims.
///
/// Returns `None` when neither value identifies a user.
pub fn account_from_claims(
    id_token: Option<&str>,
    client_info: Option<&str>,
    environment: &str,
) -> Option<Account> {
    let claims = id_token.and_then(decode_id_token).unwrap_or_default();
    let info = client_info.and_then(decode_client_info).unwrap_or_default();

    let object_id = info.uid.clone().or_else(|| claims.oid.clone());
    let home_tenant = info.utid.clone().or_else(|| claims.tid.clone());
    let home_account_id = match (&object_id, &home_tenant) {
        (Some(oid), Some(tid)) => format!("{oid}.{tid}"),
        (Some(oid), None) => oid.clone(),
        _ => claims.sub.clone()?,
    };

    Some(Account {
        home_account_id,
        local_account_id: claims.oid.or(object_id).unwrap_or_default(),
        username: claims.preferred_username,
        tenant_id: claims.tid.clone(),
        realm: claims.tid.or(home_tenant),
        environment: environment.to_string(),
    })
}
