//! Line-delimited SSE decoding shared by the provider adapters.
//!
//! Every backend here streams as `data: <json>` lines; only the path to the
//! incremental text differs. The decoder buffers across network frames (a
//! line may be split between two reads), skips malformed frames instead of
//! failing the stream, and stops at the literal `data: [DONE]` terminator
//! used by the OpenAI-compatible family.

use futures::StreamExt;
use serde_json::Value;

use precis_core::{ChatStream, PrecisError};

/// Pulls the incremental text out of one decoded frame.
pub(crate) type FragmentExtractor = fn(&Value) -> Option<String>;

/// Outcome of decoding one SSE line.
#[derive(Debug, PartialEq, Eq)]
enum SseLine {
    Fragment(String),
    Done,
    Skip,
}

fn decode_line(line: &str, extract: FragmentExtractor) -> SseLine {
    let trimmed = line.trim();
    if trimmed.is_empty() || !trimmed.starts_with("data:") {
        return SseLine::Skip;
    }
    let data = trimmed["data:".len()..].trim_start();
    if data == "[DONE]" {
        return SseLine::Done;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(frame) => match extract(&frame) {
            Some(fragment) if !fragment.is_empty() => SseLine::Fragment(fragment),
            _ => SseLine::Skip,
        },
        // Malformed frame: skip it, don't fail the stream.
        Err(_) => SseLine::Skip,
    }
}

/// Turn a streaming HTTP response into an ordered fragment stream.
pub(crate) fn sse_stream(response: reqwest::Response, extract: FragmentExtractor) -> ChatStream {
    let inner = response.bytes_stream();

    Box::pin(futures::stream::unfold(
        (Box::pin(inner), String::new()),
        move |(mut inner, mut buffer)| async move {
            loop {
                if let Some(pos) = buffer.find('\n') {
                    let line: String = buffer.drain(..=pos).collect();
                    match decode_line(&line, extract) {
                        SseLine::Fragment(fragment) => {
                            return Some((Ok(fragment), (inner, buffer)))
                        }
                        SseLine::Done => return None,
                        SseLine::Skip => continue,
                    }
                }

                match inner.next().await {
                    Some(Ok(bytes)) => buffer.push_str(&String::from_utf8_lossy(&bytes)),
                    Some(Err(err)) => {
                        return Some((Err(PrecisError::from(err)), (inner, String::new())));
                    }
                    None => return None,
                }
            }
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delta_content(frame: &Value) -> Option<String> {
        frame
            .pointer("/choices/0/delta/content")
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    #[test]
    fn test_decode_data_line() {
        let line = r#"data: {"choices": [{"delta": {"content": "hi"}}]}"#;
        assert_eq!(
            decode_line(line, delta_content),
            SseLine::Fragment("hi".to_string())
        );
    }

    #[test]
    fn test_decode_done_terminator() {
        assert_eq!(decode_line("data: [DONE]", delta_content), SseLine::Done);
    }

    #[test]
    fn test_non_data_lines_skipped() {
        assert_eq!(decode_line("", delta_content), SseLine::Skip);
        assert_eq!(decode_line("event: ping", delta_content), SseLine::Skip);
        assert_eq!(decode_line(": keepalive", delta_content), SseLine::Skip);
    }

    #[test]
    fn test_malformed_frame_skipped_not_fatal() {
        assert_eq!(decode_line("data: {broken", delta_content), SseLine::Skip);
    }

    #[test]
    fn test_frame_without_text_skipped() {
        let line = r#"data: {"choices": [{"delta": {}}]}"#;
        assert_eq!(decode_line(line, delta_content), SseLine::Skip);
    }
}
