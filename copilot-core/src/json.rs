//! Loose JSON helpers.
//!
//! Caller payloads arrive as untyped JSON and are read leniently: strings are
//! taken as-is, other scalars are rendered as text, and flags follow the usual
//! truthiness rules (empty and zero values are false).

use serde_json::Value;

/// Renders a JSON value as text. `null` becomes the empty string.
pub fn value_to_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Reads `key` from an object as trimmed text, empty when absent.
pub fn field_text(object: &Value, key: &str) -> String {
    object
        .get(key)
        .map(value_to_text)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Reads a flag from an object, using `default` when the key is absent.
pub fn flag(object: &Value, key: &str, default: bool) -> bool {
    object.get(key).map_or(default, is_truthy)
}
