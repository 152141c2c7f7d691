//! Streaming chat events.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key used to wrap a payload that decoded to a non-object JSON value.
pub const VALUE_KEY: &str = "value";

/// Key used to wrap a payload that failed to decode.
pub const RAW_KEY: &str = "raw";

/// One event read from a server-sent-event stream.
///
/// Always a JSON object. Payloads that decode to another JSON type are
/// wrapped as `{"value": ..}` and payloads that fail to decode are kept as
/// `{"raw": "<text>"}`, so decoding never fails.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamEvent(Map<String, Value>);

impl StreamEvent {
    /// Decodes one event payload.
    pub fn decode(payload: &str) -> Self {
        match serde_json::from_str::<Value>(payload) {
            Ok(Value::Object(map)) => Self(map),
            Ok(other) => Self::wrap(VALUE_KEY, other),
            Err(_) => Self::wrap(RAW_KEY, Value::String(payload.to_string())),
        }
    }

    fn wrap(key: &str, value: Value) -> Self {
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        Self(map)
    }

    /// Returns the field `key`, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the underlying object.
    pub fn as_object(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Returns the raw text when the payload was not valid JSON.
    pub fn raw_text(&self) -> Option<&str> {
        if self.0.len() == 1 {
            self.0.get(RAW_KEY).and_then(Value::as_str)
        } else {
            None
        }
    }

    /// Converts the event into a JSON value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl From<Map<String, Value>> for StreamEvent {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<StreamEvent> for Value {
    fn from(event: StreamEvent) -> Self {
        event.into_value()
    }
}
