//! Parsing model output into a [`SummaryDocument`] or a typed signal.
//!
//! The model is asked for an envelope (`{ text?, summary: {...}, noContent?,
//! requestedImages? }`) but real output also arrives as the flat legacy
//! shape, wrapped in code fences, surrounded by prose, or mildly broken.
//! Everything that survives repair becomes either a document or one of the
//! distinct signals; anything else is surfaced verbatim as a
//! conversational-text response.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{PrecisError, PrecisResult};
use crate::summarizer::json_repair::{find_matching_brace, parse_json_lenient};
use crate::types::{ProsAndCons, SummaryDocument};

static FENCE_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```[a-zA-Z0-9]*\s*\n?").unwrap());
static FENCE_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n?```\s*$").unwrap());

const DEFAULT_NO_CONTENT: &str = "No meaningful content found on this page.";
const DEFAULT_CHAT_REPLY: &str = "OK, feel free to ask questions about the content.";

/// Parse raw model output.
///
/// `image_request_allowed` gates the image-request signal: it is honored on
/// the first pass only, so the round trip stays bounded to one.
pub fn parse_summary_response(
    response: &str,
    image_request_allowed: bool,
) -> PrecisResult<SummaryDocument> {
    let cleaned = strip_code_fence(response.trim());

    let mut parsed = match parse_object(&cleaned) {
        Some(value) => value,
        // Model answered in prose - surface it as a chat message, not a
        // broken summary.
        None => return Err(PrecisError::text_response(cleaned)),
    };

    // Some models stringify the nested summary object; parse it in place.
    if let Some(inner) = parsed
        .get("summary")
        .and_then(Value::as_str)
        .filter(|s| s.trim_start().starts_with('{'))
        .and_then(parse_json_lenient)
    {
        if inner.is_object() {
            parsed["summary"] = inner;
        }
    }

    check_signals(&parsed, image_request_allowed)?;

    let summary_is_obj = parsed.get("summary").map(Value::is_object).unwrap_or(false);
    let is_envelope = parsed.get("text").is_some()
        || (summary_is_obj
            && parsed
                .pointer("/summary/tldr")
                .map(Value::is_string)
                .unwrap_or(false));
    let is_flat = parsed.get("tldr").map(Value::is_string).unwrap_or(false);

    if is_envelope {
        let text = parsed
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return match parsed.get("summary") {
            // No summary: the model only had something to say.
            Some(Value::Object(fields)) => Ok(extract_summary_fields(fields)),
            _ => Err(PrecisError::text_response(non_empty_or(
                text,
                DEFAULT_CHAT_REPLY,
            ))),
        };
    }

    if is_flat {
        if let Some(fields) = parsed.as_object() {
            return Ok(extract_summary_fields(fields));
        }
    }

    // Neither envelope nor flat - the model returned something unexpected.
    Err(PrecisError::text_response(cleaned))
}

/// Sentinel checks shared by both shapes, in precedence order.
fn check_signals(parsed: &Value, image_request_allowed: bool) -> PrecisResult<()> {
    if truthy(parsed.get("noContent")) {
        let reason = parsed
            .get("reason")
            .or_else(|| parsed.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(PrecisError::no_content(non_empty_or(
            reason.to_string(),
            DEFAULT_NO_CONTENT,
        )));
    }

    if truthy(parsed.get("noSummary")) {
        let message = parsed
            .get("message")
            .or_else(|| parsed.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(PrecisError::text_response(non_empty_or(
            message.to_string(),
            DEFAULT_CHAT_REPLY,
        )));
    }

    if image_request_allowed {
        let urls = string_list(parsed.get("requestedImages"));
        if !urls.is_empty() {
            return Err(PrecisError::ImageRequest { urls });
        }
    }

    Ok(())
}

/// Strip a single leading/trailing fenced code-block wrapper.
fn strip_code_fence(text: &str) -> String {
    if !text.starts_with("```") {
        return text.to_string();
    }
    let without_open = FENCE_OPEN_RE.replace(text, "");
    FENCE_CLOSE_RE.replace(&without_open, "").into_owned()
}

/// Lenient parse; on failure, retry on the first balanced `{...}` region to
/// tolerate prose around the JSON.
fn parse_object(cleaned: &str) -> Option<Value> {
    if let Some(value) = parse_json_lenient(cleaned) {
        if value.is_object() {
            return Some(value);
        }
    }

    let start = cleaned.find('{')?;
    let end = find_matching_brace(cleaned, start)?;
    if start == 0 && end == cleaned.len() - 1 {
        // The balanced region is the whole text; it already failed above.
        return None;
    }
    parse_json_lenient(&cleaned[start..=end]).filter(Value::is_object)
}

/// Coerce a parsed field map into a [`SummaryDocument`].
///
/// Every list field becomes an empty sequence when absent or not an array;
/// `extraSections` accepts both the object map shape and the array of
/// `{title, content}` pairs.
pub fn extract_summary_fields(fields: &serde_json::Map<String, Value>) -> SummaryDocument {
    let pros_and_cons = fields
        .get("prosAndCons")
        .and_then(Value::as_object)
        .map(|pc| ProsAndCons {
            pros: string_list(pc.get("pros")),
            cons: string_list(pc.get("cons")),
        });

    SummaryDocument {
        tldr: string_field(fields.get("tldr")),
        key_takeaways: string_list(fields.get("keyTakeaways")),
        summary: string_field(fields.get("summary")),
        notable_quotes: string_list(fields.get("notableQuotes")),
        conclusion: string_field(fields.get("conclusion")),
        pros_and_cons,
        fact_check: optional_string(fields.get("factCheck")),
        comments_highlights: fields
            .get("commentsHighlights")
            .filter(|v| v.is_array())
            .map(|v| string_list(Some(v))),
        extra_sections: coerce_extra_sections(fields.get("extraSections")),
        related_topics: string_list(fields.get("relatedTopics")),
        tags: string_list(fields.get("tags")),
        source_language: optional_string(fields.get("sourceLanguage")),
        summary_language: optional_string(fields.get("summaryLanguage")),
        translated_title: optional_string(fields.get("translatedTitle")),
        inferred_title: optional_string(fields.get("inferredTitle")),
        inferred_author: optional_string(fields.get("inferredAuthor")),
        inferred_publish_date: optional_string(fields.get("inferredPublishDate")),
        provider: None,
        model: None,
    }
}

/// Accepts `{title: body}` maps and `[{title, content}]` arrays.
pub fn coerce_extra_sections(value: Option<&Value>) -> BTreeMap<String, String> {
    let mut sections = BTreeMap::new();
    match value {
        Some(Value::Object(map)) => {
            for (title, body) in map {
                if let Some(body) = body.as_str() {
                    sections.insert(title.clone(), body.to_string());
                }
            }
        }
        Some(Value::Array(items)) => {
            for item in items {
                let title = item.get("title").and_then(Value::as_str);
                let body = item.get("content").and_then(Value::as_str);
                if let (Some(title), Some(body)) = (title, body) {
                    sections.insert(title.to_string(), body.to_string());
                }
            }
        }
        _ => {}
    }
    sections
}

fn string_field(value: Option<&Value>) -> String {
    value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn optional_string(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn truthy(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(summary: &str) -> String {
        format!(r#"{{"text": "", "summary": {summary}}}"#)
    }

    #[test]
    fn test_parses_envelope_shape() {
        let doc = parse_summary_response(
            &envelope(r#"{"tldr": "Short.", "summary": "Long.", "keyTakeaways": ["**A** - a"]}"#),
            false,
        )
        .unwrap();
        assert_eq!(doc.tldr, "Short.");
        assert_eq!(doc.key_takeaways, vec!["**A** - a"]);
        assert!(doc.notable_quotes.is_empty());
    }

    #[test]
    fn test_parses_flat_legacy_shape() {
        let doc = parse_summary_response(
            r#"{"tldr": "Flat.", "summary": "Body.", "tags": ["x"]}"#,
            false,
        )
        .unwrap();
        assert_eq!(doc.tldr, "Flat.");
        assert_eq!(doc.tags, vec!["x"]);
    }

    #[test]
    fn test_strips_code_fence() {
        let doc = parse_summary_response(
            "```json\n{\"tldr\": \"Fenced.\", \"summary\": \"Body.\"}\n```",
            false,
        )
        .unwrap();
        assert_eq!(doc.tldr, "Fenced.");
    }

    #[test]
    fn test_json_embedded_in_prose() {
        let doc = parse_summary_response(
            r#"Sure, here is the summary: {"tldr": "Embedded.", "summary": "Body."} Hope that helps!"#,
            false,
        )
        .unwrap();
        assert_eq!(doc.tldr, "Embedded.");
    }

    #[test]
    fn test_json_with_trailing_prose_only() {
        let doc = parse_summary_response(
            r#"{"tldr": "Leading.", "summary": "Body."} Let me know if you need more detail."#,
            false,
        )
        .unwrap();
        assert_eq!(doc.tldr, "Leading.");
    }

    #[test]
    fn test_no_content_signal_carries_reason() {
        let err = parse_summary_response(r#"{"noContent": true, "reason": "login page"}"#, false)
            .unwrap_err();
        match err {
            PrecisError::NoContent { reason } => assert_eq!(reason, "login page"),
            other => panic!("expected NoContent, got {other:?}"),
        }
    }

    #[test]
    fn test_no_summary_signal_becomes_text_response() {
        let err = parse_summary_response(
            r#"{"noSummary": true, "message": "Happy to chat instead."}"#,
            false,
        )
        .unwrap_err();
        match err {
            PrecisError::TextResponse { text } => assert_eq!(text, "Happy to chat instead."),
            other => panic!("expected TextResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_image_request_honored_only_when_allowed() {
        let raw = r#"{"text": "", "requestedImages": ["u1", "u2"], "summary": {"tldr": "T.", "summary": "S."}}"#;

        let err = parse_summary_response(raw, true).unwrap_err();
        match err {
            PrecisError::ImageRequest { urls } => assert_eq!(urls, vec!["u1", "u2"]),
            other => panic!("expected ImageRequest, got {other:?}"),
        }

        // Second pass: the request is ignored and the summary extracted.
        let doc = parse_summary_response(raw, false).unwrap();
        assert_eq!(doc.tldr, "T.");
    }

    #[test]
    fn test_prose_is_text_response() {
        let err = parse_summary_response("I can't access that page, sorry.", false).unwrap_err();
        match err {
            PrecisError::TextResponse { text } => assert!(text.contains("can't access")),
            other => panic!("expected TextResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_envelope_without_summary_is_chat_reply() {
        let err =
            parse_summary_response(r#"{"text": "Which section interests you?"}"#, false).unwrap_err();
        match err {
            PrecisError::TextResponse { text } => {
                assert_eq!(text, "Which section interests you?")
            }
            other => panic!("expected TextResponse, got {other:?}"),
        }
    }

    #[test]
    fn test_stringified_summary_reparsed() {
        let raw = r#"{"text": "", "summary": "{\"tldr\": \"Inner.\", \"summary\": \"Body.\"}"}"#;
        let doc = parse_summary_response(raw, false).unwrap();
        assert_eq!(doc.tldr, "Inner.");
    }

    #[test]
    fn test_extra_sections_array_coerced_to_map() {
        let raw = envelope(
            r#"{"tldr": "T.", "summary": "S.", "extraSections": [{"title": "Cheat sheet", "content": "rows"}]}"#,
        );
        let doc = parse_summary_response(&raw, false).unwrap();
        assert_eq!(doc.extra_sections.get("Cheat sheet").unwrap(), "rows");
    }

    #[test]
    fn test_extra_sections_object_accepted() {
        let sections = coerce_extra_sections(Some(&serde_json::json!({"Refs": "links"})));
        assert_eq!(sections.get("Refs").unwrap(), "links");
    }

    #[test]
    fn test_non_array_lists_default_empty() {
        let doc = parse_summary_response(
            &envelope(r#"{"tldr": "T.", "summary": "S.", "keyTakeaways": "oops", "tags": null}"#),
            false,
        )
        .unwrap();
        assert!(doc.key_takeaways.is_empty());
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn test_repairs_malformed_output() {
        let raw = "{\"tldr\": \"He said \"done\".\", \"summary\": \"Body.\",}";
        let doc = parse_summary_response(raw, false).unwrap();
        assert_eq!(doc.tldr, "He said \"done\".");
    }
}
