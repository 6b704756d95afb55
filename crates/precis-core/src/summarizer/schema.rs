//! JSON schema for the structured summary response.

use serde_json::{json, Value};

/// Name advertised to providers that want a named schema.
pub const RESPONSE_SCHEMA_NAME: &str = "summary_response";

/// Schema for the response envelope.
///
/// Passed out-of-band to providers with native schema enforcement; for the
/// rest, the prompt builder describes the same structure as text.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "text": {
                "type": "string",
                "description": "Conversational reply when no summary is produced. Empty string otherwise."
            },
            "noContent": {
                "type": "boolean",
                "description": "True when the page has no meaningful content to summarize."
            },
            "reason": {
                "type": "string",
                "description": "Why there is nothing to summarize. Only with noContent."
            },
            "requestedImages": {
                "type": "array",
                "items": { "type": "string" },
                "description": "Image URLs (max 3) needed to complete the summary."
            },
            "summary": {
                "type": "object",
                "properties": {
                    "tldr": { "type": "string" },
                    "keyTakeaways": { "type": "array", "items": { "type": "string" } },
                    "summary": { "type": "string" },
                    "notableQuotes": { "type": "array", "items": { "type": "string" } },
                    "conclusion": { "type": "string" },
                    "prosAndCons": {
                        "type": "object",
                        "properties": {
                            "pros": { "type": "array", "items": { "type": "string" } },
                            "cons": { "type": "array", "items": { "type": "string" } }
                        }
                    },
                    "factCheck": { "type": "string" },
                    "commentsHighlights": { "type": "array", "items": { "type": "string" } },
                    "extraSections": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "title": { "type": "string" },
                                "content": { "type": "string" }
                            },
                            "required": ["title", "content"]
                        }
                    },
                    "relatedTopics": { "type": "array", "items": { "type": "string" } },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "sourceLanguage": { "type": "string" },
                    "summaryLanguage": { "type": "string" },
                    "translatedTitle": { "type": "string" },
                    "inferredTitle": { "type": "string" },
                    "inferredAuthor": { "type": "string" },
                    "inferredPublishDate": { "type": "string" }
                },
                "required": ["tldr", "summary"]
            }
        }
    })
}
