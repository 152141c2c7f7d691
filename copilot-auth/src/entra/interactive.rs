//! Browser sign-in: authorization code with PKCE over a loopback redirect.

use std::time::Duration;

use base64::prelude::*;
use ring::digest::{SHA256, digest};
use ring::rand::{SecureRandom, SystemRandom};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, warn};
use url::Url;

use crate::provider::ProviderFailure;

/// How long to wait for the browser to come back.
pub const REDIRECT_TIMEOUT: Duration = Duration::from_secs(300);

/// How long one connection may take to send its request line. Browsers open
/// idle speculative connections that never send anything.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(2);

const DEFAULT_REDIRECT: &str = "http://localhost";

const SUCCESS_PAGE: &str = "<html><body><h3>Sign-in complete.</h3>\
    <p>You can close this window and return to the application.</p></body></html>";
const FAILURE_PAGE: &str = "<html><body><h3>Sign-in failed.</h3>\
    <p>Return to the application for details.</p></body></html>";

// ============================================================================
// PKCE
// ============================================================================

/// A PKCE verifier and its S256 challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pkce {
    /// Secret sent with the code exchange.
    pub verifier: String,
    /// SHA-256 of the verifier, sent with the authorization request.
    pub challenge: String,
}

impl Pkce {
    /// Generates a fresh verifier.
    pub fn generate(rng: &SystemRandom) -> Result<Self, ProviderFailure> {
        let verifier = random_token(rng, 32)?;
        Ok(Self::from_verifier(verifier))
    }

    /// Derives the challenge for a known verifier.
    pub fn from_verifier(verifier: String) -> Self {
        let challenge = BASE64_URL_SAFE_NO_PAD.encode(digest(&SHA256, verifier.as_bytes()));
        Self {
            verifier,
            challenge,
        }
    }
}

/// Random base64url string from `len` bytes of entropy.
pub fn random_token(rng: &SystemRandom, len: usize) -> Result<String, ProviderFailure> {
    let mut bytes = vec![0_u8; len];
    rng.fill(&mut bytes)
        .map_err(|_| ProviderFailure::new("rng_failed", "System random generator unavailable"))?;
    Ok(BASE64_URL_SAFE_NO_PAD.encode(bytes))
}

// ============================================================================
// Authorization URL
// ============================================================================

/// Parameters of one authorization request.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest<'a> {
    /// Authorization endpoint.
    pub endpoint: &'a str,
    /// Application id.
    pub client_id: &'a str,
    /// Redirect the listener is bound to.
    pub redirect_uri: &'a str,
    /// Space-separated scopes.
    pub scope: &'a str,
    /// CSRF state.
    pub state: &'a str,
    /// PKCE challenge.
    pub code_challenge: &'a str,
    /// Account-picker prompt.
    pub prompt: &'a str,
}

impl AuthorizationRequest<'_> {
    /// Builds the URL to open in the browser.
    pub fn url(&self) -> Result<Url, ProviderFailure> {
        Url::parse_with_params(
            self.endpoint,
            &[
                ("client_id", self.client_id),
                ("response_type", "code"),
                ("redirect_uri", self.redirect_uri),
                ("response_mode", "query"),
                ("scope", self.scope),
                ("state", self.state),
                ("code_challenge", self.code_challenge),
                ("code_challenge_method", "S256"),
                ("prompt", self.prompt),
                ("client_info", "1"),
            ],
        )
        .map_err(|e| ProviderFailure::new("invalid_request", format!("Invalid authority URL: {e}")))
    }
}

// ============================================================================
// Loopback Listener
// ============================================================================

/// What the browser brought back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    /// Authorization code.
    pub code: String,
    /// Echoed state.
    pub state: Option<String>,
}

/// One-shot HTTP listener for the redirect.
#[derive(Debug)]
pub struct LoopbackListener {
    listener: TcpListener,
    redirect_uri: String,
    path: String,
}

impl LoopbackListener {
    /// Binds the port named by `redirect_uri`, or a free one when it has none.
    pub async fn bind(redirect_uri: Option<&str>) -> Result<Self, ProviderFailure> {
        let raw = redirect_uri.unwrap_or(DEFAULT_REDIRECT);
        let url = Url::parse(raw).map_err(|e| {
            ProviderFailure::new("invalid_request", format!("Invalid redirect URI '{raw}': {e}"))
        })?;

        let host = url.host_str().unwrap_or_default();
        if url.scheme() != "http" || !matches!(host, "localhost" | "127.0.0.1" | "[::1]") {
            return Err(ProviderFailure::new(
                "invalid_request",
                format!("Interactive sign-in needs a loopback redirect URI such as http://localhost, got '{raw}'"),
            ));
        }

        let port = url.port().unwrap_or(0);
        let address = if host == "[::1]" { "::1" } else { "127.0.0.1" };
        let listener = TcpListener::bind((address, port)).await.map_err(|e| {
            ProviderFailure::new("listener_failed", format!("Cannot listen on port {port}: {e}"))
        })?;
        let bound = listener
            .local_addr()
            .map_err(|e| ProviderFailure::new("listener_failed", e.to_string()))?
            .port();

        let path = url.path().to_string();
        let redirect_uri = format!("http://{host}:{bound}{}", if path == "/" { "" } else { path.as_str() });
        debug!(redirect_uri = %redirect_uri, "Loopback listener bound");

        Ok(Self {
            listener,
            redirect_uri,
            path,
        })
    }

    /// The redirect URI to send with the authorization request.
    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Waits for the browser redirect, answering it with a small page.
    pub async fn wait(self, timeout: Duration) -> Result<AuthorizationResponse, ProviderFailure> {
        tokio::time::timeout(timeout, self.accept_redirect())
            .await
            .map_err(|_| {
                ProviderFailure::new("timed_out", "Timed out waiting for the browser sign-in to finish")
            })?
    }

    async fn accept_redirect(&self) -> Result<AuthorizationResponse, ProviderFailure> {
        loop {
            let (mut socket, _) = self
                .listener
                .accept()
                .await
                .map_err(|e| ProviderFailure::new("listener_failed", e.to_string()))?;

            let read = tokio::time::timeout(REQUEST_READ_TIMEOUT, read_request_target(&mut socket));
            let target = match read.await {
                Ok(Some(target)) => target,
                Ok(None) => continue,
                Err(_) => {
                    debug!("Dropping idle loopback connection");
                    continue;
                }
            };
            let Ok(url) = Url::parse(&format!("http://localhost{target}")) else {
                respond(&mut socket, "400 Bad Request", FAILURE_PAGE).await;
                continue;
            };
            if url.path() != self.path {
                respond(&mut socket, "404 Not Found", "").await;
                continue;
            }

            let outcome = parse_redirect(&url);
            let page = if outcome.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
            respond(&mut socket, "200 OK", page).await;
            return outcome;
        }
    }
}

/// Reads the redirect query into a code or an error.
pub fn parse_redirect(url: &Url) -> Result<AuthorizationResponse, ProviderFailure> {
    let mut code = None;
    let mut state = None;
    let mut failure = ProviderFailure::default();

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => failure.error = Some(value.into_owned()),
            "error_description" => failure.error_description = Some(value.into_owned()),
            _ => {}
        }
    }

    if failure.error.is_some() || failure.error_description.is_some() {
        return Err(failure);
    }
    match code {
        Some(code) if !code.is_empty() => Ok(AuthorizationResponse { code, state }),
        _ => Err(ProviderFailure::new(
            "invalid_response",
            "Redirect did not include an authorization code",
        )),
    }
}

async fn read_request_target(socket: &mut TcpStream) -> Option<String> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    loop {
        let n = socket.read(&mut buffer).await.ok()?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
        if request.windows(4).any(|w| w == b"\r\n\r\n") || request.len() > 16 * 1024 {
            break;
        }
    }

    let head = String::from_utf8_lossy(&request);
    let mut parts = head.lines().next()?.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Some(target.to_string()),
        _ => None,
    }
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = socket.write_all(response.as_bytes()).await {
        warn!(error = %e, "Failed to answer redirect");
    }
    let _ = socket.shutdown().await;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkce_challenge_matches_rfc_example() {
        // RFC 7636 appendix B.
        let pkce = Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(pkce.challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_random_tokens_differ() {
        let rng = SystemRandom::new();
        let a = random_token(&rng, 16).unwrap();
        let b = random_token(&rng, 16).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.len(), 22);
    }

    #[test]
    fn test_authorization_url() {
        let url = AuthorizationRequest {
            endpoint: "https://login.microsoftonline.com/t/oauth2/v2.0/authorize",
            client_id: "cid",
            redirect_uri: "http://localhost:5000",
            scope: "Sites.Read.All openid",
            state: "st",
            code_challenge: "ch",
            prompt: "select_account",
        }
        .url()
        .unwrap();

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["client_id"], "cid");
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["redirect_uri"], "http://localhost:5000");
        assert_eq!(pairs["scope"], "Sites.Read.All openid");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["prompt"], "select_account");
    }

    #[test]
    fn test_parse_redirect() {
        let ok = Url::parse("http://localhost/?code=abc&state=xyz").unwrap();
        assert_eq!(
            parse_redirect(&ok).unwrap(),
            AuthorizationResponse {
                code: "abc".to_string(),
                state: Some("xyz".to_string()),
            }
        );

        let denied =
            Url::parse("http://localhost/?error=access_denied&error_description=User+cancelled")
                .unwrap();
        assert_eq!(parse_redirect(&denied).unwrap_err().message(), "User cancelled");

        let empty = Url::parse("http://localhost/").unwrap();
        assert!(parse_redirect(&empty).is_err());
    }

    #[tokio::test]
    async fn test_bind_rejects_non_loopback() {
        let err = LoopbackListener::bind(Some("https://contoso.com/callback"))
            .await
            .unwrap_err();
        assert!(err.message().contains("loopback"));
    }

    #[tokio::test]
    async fn test_listener_captures_redirect() {
        let listener = LoopbackListener::bind(Some("http://localhost")).await.unwrap();
        let redirect = listener.redirect_uri().to_string();
        assert!(redirect.starts_with("http://localhost:"));

        let port = redirect.rsplit(':').next().unwrap().to_string();
        let browser = tokio::spawn(async move {
            let mut socket = TcpStream::connect(("127.0.0.1", port.parse::<u16>().unwrap()))
                .await
                .unwrap();
            socket
                .write_all(b"GET /?code=the-code&state=s1 HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut page = String::new();
            socket.read_to_string(&mut page).await.unwrap();
            page
        });

        let response = listener.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.code, "the-code");
        assert_eq!(response.state.as_deref(), Some("s1"));

        let page = browser.await.unwrap();
        assert!(page.starts_with("HTTP/1.1 200 OK"));
        assert!(page.contains("Sign-in complete"));
    }

    #[tokio::test]
    async fn test_idle_connection_does_not_block_redirect() {
        let listener = LoopbackListener::bind(Some("http://localhost")).await.unwrap();
        let port: u16 = listener.redirect_uri().rsplit(':').next().unwrap().parse().unwrap();

        let browser = tokio::spawn(async move {
            let idle = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
            let mut socket = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
            socket
                .write_all(b"GET /?code=c&state=s HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut page = String::new();
            socket.read_to_string(&mut page).await.unwrap();
            drop(idle);
            page
        });

        let response = listener.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.code, "c");
        assert!(browser.await.unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[tokio::test]
    async fn test_ipv6_redirect_binds_ipv6_loopback() {
        let Ok(listener) = LoopbackListener::bind(Some("http://[::1]")).await else {
            // No IPv6 loopback on this host.
            return;
        };
        let redirect = listener.redirect_uri().to_string();
        assert!(redirect.starts_with("http://[::1]:"));
        let port: u16 = redirect.rsplit(':').next().unwrap().parse().unwrap();

        let browser = tokio::spawn(async move {
            let mut socket = TcpStream::connect(("::1", port)).await.unwrap();
            socket
                .write_all(b"GET /?code=v6 HTTP/1.1\r\nHost: [::1]\r\n\r\n")
                .await
                .unwrap();
            let mut page = String::new();
            socket.read_to_string(&mut page).await.unwrap();
        });

        let response = listener.wait(Duration::from_secs(5)).await.unwrap();
        assert_eq!(response.code, "v6");
        browser.await.unwrap();
    }
}
