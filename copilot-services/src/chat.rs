//! Chat: conversation lifecycle, payload normalization and dispatch.
//!
//! A conversation is created lazily by the first send and reused for the
//! lifetime of the [`ChatApi`]. Creation is single-flight: concurrent first
//! sends wait on the same request, and a failed creation leaves no id behind.

use std::sync::Arc;

use copilot_core::json::{field_text, flag, value_to_text};
use copilot_core::{StreamEvent, ValidationError};
use copilot_fetch::{EventCallback, RequestExecutor};
use serde_json::{Value, json};
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument};

use crate::error::ServiceError;
use crate::timezone::resolve_time_zone;

// ============================================================================
// Payloads
// ============================================================================

/// A validated chat request, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedChat {
    /// Body in the API's canonical shape.
    pub body: Value,
    /// Whether to use the streaming endpoint.
    pub stream: bool,
}

/// Normalizes a chat payload into the API's canonical shape.
///
/// A payload that already has `message` and `locationHint` is returned
/// unchanged. Otherwise the text comes from `messages[0].content`, then
/// `prompt`, and `webSearchEnabled` defaults to true.
pub fn normalize_chat_payload(payload: &Value, time_zone: &str) -> Result<Value, ValidationError> {
    let object = payload.as_object().ok_or(ValidationError::NotAnObject("Chat"))?;
    if object.contains_key("message") && object.contains_key("locationHint") {
        return Ok(payload.clone());
    }

    let mut text = payload
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|messages| messages.first())
        .filter(|first| first.is_object())
        .map(|first| field_text(first, "content"))
        .unwrap_or_default();
    if text.is_empty() {
        text = field_text(payload, "prompt");
    }
    if text.is_empty() {
        return Err(ValidationError::EmptyChatText);
    }

    Ok(json!({
        "message": { "text": text },
        "locationHint": { "timeZone": time_zone },
        "contextualResources": {
            "webContext": { "isWebEnabled": flag(payload, "webSearchEnabled", true) }
        }
    }))
}

// ============================================================================
// Outcome
// ============================================================================

/// Result of one chat send.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatOutcome {
    /// Non-streaming reply, as decoded from the API.
    Completed(Value),
    /// Streaming reply.
    Streamed {
        /// Every event, in wire order.
        events: Vec<StreamEvent>,
        /// The last event, or `{}` when none arrived.
        final_conversation: Value,
    },
}

impl ChatOutcome {
    /// Builds the streaming outcome from the received events.
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        let final_conversation = events
            .last()
            .cloned()
            .map_or_else(|| json!({}), StreamEvent::into_value);
        Self::Streamed {
            events,
            final_conversation,
        }
    }

    /// JSON view: the reply itself, or `{streamEvents, finalConversation}`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Completed(value) => value,
            Self::Streamed {
                events,
                final_conversation,
            } => {
                let events: Vec<Value> = events.into_iter().map(StreamEvent::into_value).collect();
                json!({
                    "streamEvents": events,
                    "finalConversation": final_conversation,
                })
            }
        }
    }
}

// ============================================================================
// Chat API
// ============================================================================

/// Conversation-scoped chat endpoints.
#[derive(Debug)]
pub struct ChatApi {
    executor: Arc<RequestExecutor>,
    chat_path: String,
    time_zone: Option<String>,
    conversation: OnceCell<String>,
}

impl ChatApi {
    /// Creates the API for `chat_path`, with an optional time zone override.
    pub fn new(executor: Arc<RequestExecutor>, chat_path: impl Into<String>, time_zone: Option<String>) -> Self {
        Self {
            executor,
            chat_path: chat_path.into(),
            time_zone,
            conversation: OnceCell::new(),
        }
    }

    /// The current conversation id, once created.
    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation.get().map(String::as_str)
    }

    /// Path of the non-streaming endpoint for a conversation.
    pub fn chat_path_for(&self, conversation_id: &str) -> String {
        format!("{}/{conversation_id}/chat", self.chat_path)
    }

    /// Path of the streaming endpoint for a conversation.
    pub fn stream_path_for(&self, conversation_id: &str) -> String {
        format!("{}/{conversation_id}/chatOverStream", self.chat_path)
    }

    /// Normalizes a payload with the resolved time zone.
    pub fn normalize(&self, payload: &Value) -> Result<Value, ValidationError> {
        normalize_chat_payload(payload, &resolve_time_zone(self.time_zone.as_deref()))
    }

    /// Validates and normalizes a caller payload.
    pub fn prepare(&self, payload: &Value) -> Result<PreparedChat, ValidationError> {
        Ok(PreparedChat {
            body: self.normalize(payload)?,
            stream: flag(payload, "useStream", false),
        })
    }

    /// Returns the conversation id, creating the conversation on first use.
    #[instrument(skip(self, token))]
    pub async fn ensure_conversation(&self, token: &str) -> Result<&str, ServiceError> {
        let id = self
            .conversation
            .get_or_try_init(|| async {
                debug!(path = %self.chat_path, "Creating conversation");
                let created = self.executor.post_json(token, &self.chat_path, &json!({})).await?;
                let id = created
                    .get("id")
                    .map(value_to_text)
                    .unwrap_or_default()
                    .trim()
                    .to_string();
                if id.is_empty() {
                    return Err(ServiceError::MissingConversationId);
                }
                info!(conversation_id = %id, "Conversation created");
                Ok::<_, ServiceError>(id)
            })
            .await?;
        Ok(id.as_str())
    }

    /// Sends a prepared chat, streaming when requested.
    ///
    /// `on_event` sees each streamed event as it arrives; it is ignored for
    /// non-streaming sends.
    #[instrument(skip_all, fields(stream = prepared.stream))]
    pub async fn send(
        &self,
        token: &str,
        prepared: &PreparedChat,
        on_event: Option<EventCallback<'_>>,
    ) -> Result<ChatOutcome, ServiceError> {
        let conversation_id = self.ensure_conversation(token).await?;

        if prepared.stream {
            let path = self.stream_path_for(conversation_id);
            let events = self
                .executor
                .post_sse_json(token, &path, &prepared.body, on_event)
                .await?;
            debug!(events = events.len(), "Stream finished");
            return Ok(ChatOutcome::from_events(events));
        }

        let path = self.chat_path_for(conversation_id);
        let reply = self.executor.post_json(token, &path, &prepared.body).await?;
        Ok(ChatOutcome::Completed(reply))
    }
}
