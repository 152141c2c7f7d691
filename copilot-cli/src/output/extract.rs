//! Readable text extracted from API responses.

use copilot_core::json::field_text;
use serde_json::Value;

/// Shown when a response carries nothing readable.
pub const NO_TEXT_FOUND: &str = "No formatted text found in the response.";

const BATCH_SEPARATOR: &str = "\n\n===\n\n";
const ITEM_SEPARATOR: &str = "\n\n---\n\n";

/// Pulls the human-readable text out of a chat, search, retrieval or batch
/// response.
///
/// Batch responses are rendered per request, labelled with the request id.
/// Otherwise the first non-empty section wins, in order: chat messages
/// (looking inside `finalConversation` for streamed chats), search hit
/// previews, retrieval extracts.
pub fn extract_formatted_text(response: &Value) -> String {
    if let Some(text) = batch_text(response) {
        return text;
    }

    let response = match response.get("finalConversation") {
        Some(conversation) if conversation.is_object() => conversation,
        _ => response,
    };

    chat_text(response)
        .or_else(|| search_text(response))
        .or_else(|| retrieval_text(response))
        .unwrap_or_else(|| NO_TEXT_FOUND.to_string())
}

fn batch_text(response: &Value) -> Option<String> {
    let parts: Vec<String> = response
        .get("responses")?
        .as_array()?
        .iter()
        .filter_map(|item| {
            let body = item.get("body").filter(|b| b.is_object())?;
            let text = extract_formatted_text(body);
            if text.is_empty() || text == NO_TEXT_FOUND {
                return None;
            }
            let id = Some(field_text(item, "id"))
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| "?".to_string());
            Some(format!("Batch Request {id}\n{text}"))
        })
        .collect();

    joined(&parts, BATCH_SEPARATOR)
}

fn chat_text(response: &Value) -> Option<String> {
    let texts: Vec<String> = objects(response, "messages")
        .map(|message| field_text(message, "text"))
        .filter(|text| !text.is_empty())
        .collect();
    joined(&texts, ITEM_SEPARATOR)
}

fn search_text(response: &Value) -> Option<String> {
    let previews: Vec<String> = objects(response, "searchHits")
        .filter_map(|hit| {
            let preview = field_text(hit, "preview");
            if preview.is_empty() {
                return None;
            }
            let title = hit
                .get("resourceMetadata")
                .map(|meta| field_text(meta, "title"))
                .filter(|title| !title.is_empty())
                .unwrap_or_else(|| field_text(hit, "webUrl"));
            Some(if title.is_empty() {
                preview
            } else {
                format!("{title}\n{preview}")
            })
        })
        .collect();
    joined(&previews, ITEM_SEPARATOR)
}

fn retrieval_text(response: &Value) -> Option<String> {
    let extracts: Vec<String> = objects(response, "retrievalHits")
        .flat_map(|hit| objects(hit, "extracts"))
        .map(|extract| field_text(extract, "text"))
        .filter(|text| !text.is_empty())
        .collect();
    joined(&extracts, ITEM_SEPARATOR)
}

/// Object entries of the array at `key`, skipping anything else.
fn objects<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|item| item.is_object())
}

fn joined(parts: &[String], separator: &str) -> Option<String> {
    (!parts.is_empty()).then(|| parts.join(separator))
}

/// Describes whether another search page can be fetched.
pub fn continuation_hint(response: &Value, next_link: Option<&str>) -> String {
    if let Some(link) = next_link.filter(|link| !link.trim().is_empty()) {
        return format!("Next page available. Run: copilot search-next '{link}'");
    }

    let total = response.get("totalCount").and_then(Value::as_u64).unwrap_or(0);
    let hits = response
        .get("searchHits")
        .and_then(Value::as_array)
        .map_or(0, Vec::len) as u64;

    if hits > 0 && total > hits {
        "No continuation token returned by API for this result set.".to_string()
    } else {
        "No additional pages.".to_string()
    }
}
