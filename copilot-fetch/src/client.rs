//! Retrying JSON request executor.

use std::time::Duration;

use copilot_core::StreamEvent;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::error::ApiError;
use crate::retry::RetryPolicy;
use crate::sse::SseEventParser;

/// User agent string for the client.
const USER_AGENT: &str = concat!("copilot-client/", env!("CARGO_PKG_VERSION"));

const APPLICATION_JSON: &str = "application/json";
const EVENT_STREAM: &str = "text/event-stream";

/// Live callback invoked once per streamed event, in arrival order.
pub type EventCallback<'a> = &'a mut (dyn FnMut(&StreamEvent) + Send);

// ============================================================================
// Request Executor
// ============================================================================

/// JSON request executor with bearer authentication and retry handling.
///
/// Relative paths are joined onto the base URL; the `*_absolute_*` variants
/// take a full URL instead.
#[derive(Debug, Clone)]
pub struct RequestExecutor {
    inner: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RequestExecutor {
    /// Creates an executor for `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ApiError> {
        let inner = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            inner,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the retry policy.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Joins a path onto the base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// POSTs a JSON body to a path under the base URL.
    pub async fn post_json(&self, token: &str, path: &str, body: &Value) -> Result<Value, ApiError> {
        self.post_absolute_json(token, &self.url_for(path), body).await
    }

    /// POSTs a JSON body to an absolute URL.
    #[instrument(skip(self, token, body), fields(url = %url))]
    pub async fn post_absolute_json(
        &self,
        token: &str,
        url: &str,
        body: &Value,
    ) -> Result<Value, ApiError> {
        let url = parse_url(url)?;
        self.execute_with_retry(|| {
            self.inner
                .post(url.clone())
                .bearer_auth(token)
                .header(ACCEPT, APPLICATION_JSON)
                .json(body)
        })
        .await
    }

    /// GETs a path under the base URL with optional query parameters.
    pub async fn get_json(
        &self,
        token: &str,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Value, ApiError> {
        self.get_absolute_json(token, &self.url_for(path), params).await
    }

    /// GETs an absolute URL with optional query parameters.
    #[instrument(skip(self, token, params), fields(url = %url))]
    pub async fn get_absolute_json(
        &self,
        token: &str,
        url: &str,
        params: &[(String, String)],
    ) -> Result<Value, ApiError> {
        let url = parse_url(url)?;
        self.execute_with_retry(|| {
            let mut request = self
                .inner
                .get(url.clone())
                .bearer_auth(token)
                .header(ACCEPT, APPLICATION_JSON)
                .header(CONTENT_TYPE, APPLICATION_JSON);
            if !params.is_empty() {
                request = request.query(params);
            }
            request
        })
        .await
    }

    /// POSTs a JSON body and consumes the server-sent-event response.
    ///
    /// Events are appended to the returned list in wire order; `on_event`, if
    /// given, sees each one as soon as it is framed. A non-success status
    /// fails before any event is read. Streams are never retried.
    #[instrument(skip(self, token, body, on_event), fields(path = %path))]
    pub async fn post_sse_json(
        &self,
        token: &str,
        path: &str,
        body: &Value,
        mut on_event: Option<EventCallback<'_>>,
    ) -> Result<Vec<StreamEvent>, ApiError> {
        let url = parse_url(&self.url_for(path))?;
        let response = self
            .inner
            .post(url)
            .bearer_auth(token)
            .header(ACCEPT, EVENT_STREAM)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        debug!(status = %status, "Stream response received");
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status.as_u16(), &text));
        }

        let mut events = Vec::new();
        let mut parser = SseEventParser::new();
        let mut chunks = response.bytes_stream();

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            for event in parser.feed(&chunk) {
                if let Some(callback) = on_event.as_deref_mut() {
                    callback(&event);
                }
                events.push(event);
            }
        }

        if let Some(event) = parser.finish() {
            if let Some(callback) = on_event.as_deref_mut() {
                callback(&event);
            }
            events.push(event);
        }

        debug!(events = events.len(), "Stream finished");
        Ok(events)
    }

    async fn execute_with_retry<F>(&self, build: F) -> Result<Value, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(attempt, max_attempts, "Sending request");

            let response = build().send().await?;
            let status = response.status();
            debug!(status = %status, "Response received");

            if status.is_success() {
                return decode_json(response).await;
            }

            let text = response.text().await.unwrap_or_default();
            let error = ApiError::from_status(status.as_u16(), &text);

            if self.retry.should_retry(status.as_u16(), attempt) {
                let delay = self.retry.delay_for_attempt(attempt);
                warn!(
                    status = status.as_u16(),
                    attempt,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "Retryable status, backing off"
                );
                tokio::time::sleep(delay).await;
                continue;
            }

            return Err(error);
        }
    }
}

fn parse_url(raw: &str) -> Result<Url, ApiError> {
    Url::parse(raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))
}

/// Decodes a success body; an empty body is an empty object.
async fn decode_json(response: Response) -> Result<Value, ApiError> {
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_slice(&bytes)?)
}

// ============================================================================
// Tests
// ============================================================================
