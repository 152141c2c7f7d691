//! Identity provider flows against a scripted token endpoint.

use std::collections::HashMap;
use std::sync::Arc;

use base64::prelude::*;
use copilot_auth::{EntraIdentityProvider, IdentityProvider, InteractiveRequest};
use copilot_store::{AppSettings, CachePersistence, MemoryPersistence};
use copilot_test_support::{ScriptedServer, response_json};

fn settings(server: &ScriptedServer) -> AppSettings {
    let authority = format!("{}/tenant", server.base_url);
    let vars: HashMap<&str, String> = HashMap::from([
        ("COPILOT_TENANT_ID", "tenant".to_string()),
        ("COPILOT_CLIENT_ID", "client-123".to_string()),
        ("COPILOT_AUTHORITY", authority),
        ("COPILOT_SCOPES", "Sites.Read.All".to_string()),
    ]);
    AppSettings::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

fn encode(json: &str) -> String {
    BASE64_URL_SAFE_NO_PAD.encode(json)
}

fn token_body(access: &str, refresh: &str) -> String {
    let id_token = format!(
        "{}.{}.sig",
        encode(r#"{"alg":"none"}"#),
        encode(r#"{"oid":"oid-1","tid":"tid-1","preferred_username":"ada@contoso.com"}"#)
    );
    let client_info = encode(r#"{"uid":"oid-1","utid":"tid-1"}"#);
    serde_json::json!({
        "token_type": "Bearer",
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 3600,
        "scope": "Sites.Read.All openid profile offline_access",
        "id_token": id_token,
        "client_info": client_info,
    })
    .to_string()
}

async fn provider(
    server: &ScriptedServer,
    persistence: &Arc<MemoryPersistence>,
) -> EntraIdentityProvider {
    EntraIdentityProvider::load(
        &settings(server),
        Arc::clone(persistence) as Arc<dyn CachePersistence>,
    )
    .await
    .unwrap()
}

fn scopes() -> Vec<String> {
    vec!["Sites.Read.All".to_string()]
}

// ============================================================================
// Device Code
// ============================================================================

#[tokio::test]
async fn test_device_flow_polls_until_complete() {
    let server = ScriptedServer::start(vec![
        response_json(
            200,
            r#"{"device_code":"dc-1","user_code":"ABCD","verification_uri":"https://microsoft.com/devicelogin",
                "expires_in":60,"interval":0,"message":"Enter ABCD"}"#,
        ),
        response_json(
            400,
            r#"{"error":"authorization_pending","error_description":"still waiting"}"#,
        ),
        response_json(200, &token_body("at-1", "rt-1")),
    ])
    .await;
    let persistence = Arc::new(MemoryPersistence::new());
    let provider = provider(&server, &persistence).await;

    let flow = provider.initiate_device_flow(&scopes()).await.unwrap();
    assert_eq!(flow.instructions(), "Enter ABCD");

    let grant = provider.acquire_token_by_device_flow(&flow).await.unwrap();
    assert_eq!(grant.access_token, "at-1");
    let account = grant.account.unwrap();
    assert_eq!(account.home_account_id, "oid-1.tid-1");
    assert_eq!(account.username.as_deref(), Some("ada@contoso.com"));

    let requests = server.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].path(), "/tenant/oauth2/v2.0/devicecode");
    let start = requests[0].form();
    assert_eq!(start["client_id"], "client-123");
    assert_eq!(start["scope"], "Sites.Read.All openid profile offline_access");

    let poll = requests[2].form();
    assert_eq!(requests[2].path(), "/tenant/oauth2/v2.0/token");
    assert_eq!(poll["grant_type"], "urn:ietf:params:oauth:grant-type:device_code");
    assert_eq!(poll["device_code"], "dc-1");

    let saved = persistence.saved();
    assert_eq!(saved.len(), 1);
    assert!(saved[0].contains("rt-1"));
    assert!(!saved[0].contains("at-1"));
    assert_eq!(provider.accounts().await.len(), 1);
}

#[tokio::test]
async fn test_device_flow_declined() {
    let server = ScriptedServer::start(vec![
        response_json(
            200,
            r#"{"device_code":"dc-1","user_code":"ABCD","verification_uri":"https://microsoft.com/devicelogin",
                "expires_in":60,"interval":0}"#,
        ),
        response_json(
            400,
            r#"{"error":"authorization_declined","error_description":"The user declined"}"#,
        ),
    ])
    .await;
    let persistence = Arc::new(MemoryPersistence::new());
    let provider = provider(&server, &persistence).await;

    let flow = provider.initiate_device_flow(&scopes()).await.unwrap();
    let failure = provider.acquire_token_by_device_flow(&flow).await.unwrap_err();

    assert_eq!(failure.message(), "The user declined");
    assert!(persistence.saved().is_empty());
}

#[tokio::test]
async fn test_device_flow_start_rejected() {
    let server = ScriptedServer::start(vec![response_json(
        400,
        r#"{"error":"invalid_client","error_description":"AADSTS7000218: client assertion required"}"#,
    )])
    .await;
    let persistence = Arc::new(MemoryPersistence::new());
    let provider = provider(&server, &persistence).await;

    let failure = provider.initiate_device_flow(&scopes()).await.unwrap_err();

    assert_eq!(failure.error.as_deref(), Some("invalid_client"));
    assert!(failure.message().starts_with("AADSTS7000218"));
}

// ============================================================================
// Silent Renewal
// ============================================================================

fn persisted_cache() -> String {
    serde_json::json!({
        "accounts": [{
            "home_account_id": "oid-1.tid-1",
            "local_account_id": "oid-1",
            "username": "ada@contoso.com",
            "realm": "tid-1",
            "environment": "127.0.0.1",
        }],
        "refresh_tokens": [{ "home_account_id": "oid-1.tid-1", "secret": "rt-old" }],
    })
    .to_string()
}

#[tokio::test]
async fn test_silent_uses_refresh_token_then_memory() {
    let server = ScriptedServer::start(vec![response_json(200, &token_body("at-new", "rt-new"))]).await;
    let persistence = Arc::new(MemoryPersistence::with_content(persisted_cache()));
    let provider = provider(&server, &persistence).await;

    let accounts = provider.accounts().await;
    assert_eq!(accounts.len(), 1);

    let grant = provider.acquire_token_silent(&scopes(), &accounts[0]).await.unwrap();
    assert_eq!(grant.access_token, "at-new");

    let form = server.requests()[0].form();
    assert_eq!(form["grant_type"], "refresh_token");
    assert_eq!(form["refresh_token"], "rt-old");

    let again = provider.acquire_token_silent(&scopes(), &accounts[0]).await.unwrap();
    assert_eq!(again.access_token, "at-new");
    assert_eq!(server.request_count(), 1);

    let saved = persistence.saved();
    assert!(saved.last().unwrap().contains("rt-new"));
}

#[tokio::test]
async fn test_silent_returns_none_when_refresh_rejected() {
    let server = ScriptedServer::start(vec![response_json(
        400,
        r#"{"error":"invalid_grant","error_description":"AADSTS70008: expired"}"#,
    )])
    .await;
    let persistence = Arc::new(MemoryPersistence::with_content(persisted_cache()));
    let provider = provider(&server, &persistence).await;
    let account = provider.accounts().await.remove(0);

    assert!(provider.acquire_token_silent(&scopes(), &account).await.is_none());
}

#[tokio::test]
async fn test_corrupt_cache_starts_empty() {
    let server = ScriptedServer::start(Vec::new()).await;
    let persistence = Arc::new(MemoryPersistence::with_content("{not json"));
    let provider = provider(&server, &persistence).await;

    assert!(provider.accounts().await.is_empty());
}

#[tokio::test]
async fn test_remove_account_persists() {
    let server = ScriptedServer::start(Vec::new()).await;
    let persistence = Arc::new(MemoryPersistence::with_content(persisted_cache()));
    let provider = provider(&server, &persistence).await;
    let account = provider.accounts().await.remove(0);

    provider.remove_account(&account).await.unwrap();

    assert!(provider.accounts().await.is_empty());
    assert!(!persistence.saved().last().unwrap().contains("rt-old"));
}

// ============================================================================
// Interactive
// ============================================================================

/// Browser stand-in that follows the authorization URL straight to the
/// loopback redirect.
fn redirecting_browser(code: &'static str, tamper_state: bool) -> copilot_auth::BrowserLauncher {
    Arc::new(move |authorize: &str| {
        let url = url::Url::parse(authorize).unwrap();
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        let state = if tamper_state {
            "forged".to_string()
        } else {
            params["state"].clone()
        };
        let redirect = params["redirect_uri"].replace("localhost", "127.0.0.1");
        tokio::spawn(async move {
            let _ = reqwest::Client::new()
                .get(&redirect)
                .query(&[("code", code), ("state", state.as_str())])
                .send()
                .await;
        });
    })
}

fn interactive_request() -> InteractiveRequest {
    InteractiveRequest {
        scopes: scopes(),
        prompt: "select_account",
        redirect_uri: Some("http://localhost".to_string()),
    }
}

#[tokio::test]
async fn test_interactive_exchanges_code_with_verifier() {
    let server = ScriptedServer::start(vec![response_json(200, &token_body("at-1", "rt-1"))]).await;
    let persistence = Arc::new(MemoryPersistence::new());
    let provider = provider(&server, &persistence)
        .await
        .with_browser(redirecting_browser("auth-code", false));

    let grant = provider
        .acquire_token_interactive(&interactive_request())
        .await
        .unwrap();

    assert_eq!(grant.access_token, "at-1");
    let form = server.requests()[0].form();
    assert_eq!(form["grant_type"], "authorization_code");
    assert_eq!(form["code"], "auth-code");
    assert!(form["redirect_uri"].starts_with("http://localhost:"));
    assert!(form["code_verifier"].len() >= 43);
    assert_eq!(provider.accounts().await[0].home_account_id, "oid-1.tid-1");
}

#[tokio::test]
async fn test_interactive_rejects_state_mismatch() {
    let server = ScriptedServer::start(Vec::new()).await;
    let persistence = Arc::new(MemoryPersistence::new());
    let provider = provider(&server, &persistence)
        .await
        .with_browser(redirecting_browser("auth-code", true));

    let failure = provider
        .acquire_token_interactive(&interactive_request())
        .await
        .unwrap_err();

    assert_eq!(failure.error.as_deref(), Some("state_mismatch"));
    assert_eq!(server.request_count(), 0);
}
