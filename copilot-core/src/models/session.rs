//! Credential session state.

use serde::{Deserialize, Serialize};

/// The signed-in identity, derived from the first cached account.
///
/// A session is absent (`is_signed_in == false`) until the first successful
/// token acquisition and becomes absent again after sign-out.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSession {
    /// Whether a cached account exists.
    pub is_signed_in: bool,
    /// Display username (usually a UPN or e-mail address).
    pub username: Option<String>,
    /// Tenant the account belongs to.
    pub tenant_id: Option<String>,
    /// Stable user object id, distinct from the username.
    pub user_id: Option<String>,
}

impl CredentialSession {
    /// A session with nobody signed in.
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// A signed-in session.
    pub fn signed_in(
        username: Option<String>,
        tenant_id: Option<String>,
        user_id: Option<String>,
    ) -> Self {
        Self {
            is_signed_in: true,
            username,
            tenant_id,
            user_id,
        }
    }
}
