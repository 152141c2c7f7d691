//! CLI output formatting tests.
//!
//! These tests verify that responses render as readable text and that
//! identifying details are masked.

#[cfg(test)]
mod extract_tests {
    use super::super::extract::{NO_TEXT_FOUND, continuation_hint, extract_formatted_text};
    use serde_json::json;

    #[test]
    fn test_chat_messages_joined() {
        let response = json!({
            "id": "conv-1",
            "messages": [
                { "text": "What is new?" },
                { "text": "  " },
                { "text": "Three things changed." }
            ]
        });
        assert_eq!(
            extract_formatted_text(&response),
            "What is new?\n\n---\n\nThree things changed."
        );
    }

    #[test]
    fn test_streamed_chat_uses_final_conversation() {
        let response = json!({
            "streamEvents": [{ "messages": [{ "text": "partial" }] }],
            "finalConversation": { "messages": [{ "text": "complete answer" }] }
        });
        assert_eq!(extract_formatted_text(&response), "complete answer");
    }

    #[test]
    fn test_search_hits_prefer_title() {
        let response = json!({
            "searchHits": [
                {
                    "webUrl": "https://contoso.sharepoint.com/a.docx",
                    "preview": "Quarterly numbers",
                    "resourceMetadata": { "title": "Q3 Report" }
                },
                { "webUrl": "https://contoso.sharepoint.com/b.docx", "preview": "Roadmap" },
                { "preview": "Untitled" },
                { "webUrl": "https://contoso.sharepoint.com/c.docx" }
            ]
        });
        assert_eq!(
            extract_formatted_text(&response),
            "Q3 Report\nQuarterly numbers\n\n---\n\n\
             https://contoso.sharepoint.com/b.docx\nRoadmap\n\n---\n\nUntitled"
        );
    }

    #[test]
    fn test_retrieval_extracts_flattened() {
        let response = json!({
            "retrievalHits": [
                { "extracts": [{ "text": "First" }, { "text": "Second" }] },
                { "extracts": "not a list" },
                { "extracts": [{ "text": "Third" }] }
            ]
        });
        assert_eq!(
            extract_formatted_text(&response),
            "First\n\n---\n\nSecond\n\n---\n\nThird"
        );
    }

    #[test]
    fn test_batch_responses_labelled() {
        let response = json!({
            "responses": [
                { "id": "2", "status": 200, "body": { "searchHits": [{ "preview": "hit" }] } },
                { "id": "1", "status": 200, "body": { "messages": [{ "text": "hello" }] } },
                { "id": "3", "status": 400, "body": { "error": { "code": "badRequest" } } }
            ]
        });
        assert_eq!(
            extract_formatted_text(&response),
            "Batch Request 2\nhit\n\n===\n\nBatch Request 1\nhello"
        );
    }

    #[test]
    fn test_batch_without_text_falls_through() {
        let response = json!({
            "responses": [{ "id": "1", "body": { "error": {} } }]
        });
        assert_eq!(extract_formatted_text(&response), NO_TEXT_FOUND);
    }

    #[test]
    fn test_nothing_readable() {
        assert_eq!(extract_formatted_text(&json!({})), NO_TEXT_FOUND);
        assert_eq!(extract_formatted_text(&json!({ "messages": [] })), NO_TEXT_FOUND);
    }

    #[test]
    fn test_continuation_hint_with_link() {
        let hint = continuation_hint(&json!({}), Some("https://graph/next"));
        assert!(hint.contains("copilot search-next 'https://graph/next'"));
    }

    #[test]
    fn test_continuation_hint_missing_token() {
        let response = json!({ "totalCount": 40, "searchHits": [{}, {}] });
        assert_eq!(
            continuation_hint(&response, None),
            "No continuation token returned by API for this result set."
        );
    }

    #[test]
    fn test_continuation_hint_last_page() {
        let response = json!({ "totalCount": 2, "searchHits": [{}, {}] });
        assert_eq!(continuation_hint(&response, None), "No additional pages.");
        assert_eq!(continuation_hint(&json!({ "totalCount": 5 }), None), "No additional pages.");
    }
}

#[cfg(test)]
mod masking_tests {
    use super::super::text::{mask_tenant_id, mask_username_domain};

    #[test]
    fn test_mask_guid_tenant() {
        assert_eq!(
            mask_tenant_id("72f988bf-86f1-41af-91ab-2d7cd011db47"),
            "72f988bf-****-****-****-2d7cd011db47"
        );
    }

    #[test]
    fn test_mask_long_tenant() {
        assert_eq!(mask_tenant_id("contoso.onmicrosoft.com"), "cont....com");
        assert_eq!(mask_tenant_id(" short "), "short");
    }

    #[test]
    fn test_mask_username_domain() {
        assert_eq!(mask_username_domain("ada@contoso.com"), "ada@******o.com");
        assert_eq!(mask_username_domain("ada@abc"), "ada@***");
        assert_eq!(mask_username_domain("ada"), "ada");
        assert_eq!(mask_username_domain("ada@"), "ada@");
    }
}

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::TextFormatter;
    use copilot_core::CredentialSession;

    #[test]
    fn test_signed_out() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_session(&CredentialSession::signed_out()), "Not signed in");
    }

    #[test]
    fn test_signed_in_masks_details() {
        let formatter = TextFormatter::new(false);
        let session = CredentialSession::signed_in(
            Some("ada@contoso.com".to_string()),
            Some("72f988bf-86f1-41af-91ab-2d7cd011db47".to_string()),
            None,
        );
        assert_eq!(
            formatter.format_session(&session),
            "Signed in as ada@******o.com | Tenant: 72f988bf-****-****-****-2d7cd011db47"
        );
    }

    #[test]
    fn test_colors_toggle() {
        let session = CredentialSession::signed_out();
        assert!(TextFormatter::new(true).format_session(&session).contains("\x1b["));
        assert!(!TextFormatter::new(false).format_session(&session).contains("\x1b["));
    }

    #[test]
    fn test_format_setting() {
        let formatter = TextFormatter::new(false);
        assert_eq!(formatter.format_setting("Tenant", "abc"), "Tenant: abc");
    }
}

#[cfg(test)]
mod json_formatter_tests {
    use super::super::json::JsonFormatter;
    use serde_json::json;

    #[test]
    fn test_compact_and_pretty() {
        let value = json!({ "a": 1 });
        assert_eq!(JsonFormatter::new(false).format(&value).unwrap(), "{\"a\":1}");
        assert!(JsonFormatter::new(true).format(&value).unwrap().contains('\n'));
    }
}
