//! Heuristic repair for malformed JSON produced by language models.
//!
//! Handles the failure modes seen in practice: trailing commas before a
//! closing brace/bracket, unescaped interior double quotes inside string
//! values, and raw control characters (newline, carriage return, tab)
//! inside strings. The quote heuristic judges a `"` to terminate a string
//! only when the next significant character is `:`, `,`, `}`, `]`, or
//! end-of-input; anything else is an interior quote and gets escaped.

use once_cell::sync::Lazy;
use regex::Regex;

static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

/// Scanner state while walking a candidate JSON string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    OutsideString,
    InsideString,
    AfterEscape,
}

/// Attempt to repair common JSON issues. Input that already parses is
/// returned unchanged.
pub fn repair_json(raw: &str) -> String {
    if serde_json::from_str::<serde_json::Value>(raw).is_ok() {
        return raw.to_string();
    }

    let s = TRAILING_COMMA_RE.replace_all(raw, "$1").into_owned();
    if serde_json::from_str::<serde_json::Value>(&s).is_ok() {
        return s;
    }

    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut state = ScanState::OutsideString;

    for (i, &ch) in chars.iter().enumerate() {
        match state {
            ScanState::OutsideString => {
                out.push(ch);
                if ch == '"' {
                    state = ScanState::InsideString;
                }
            }
            ScanState::AfterEscape => {
                out.push(ch);
                state = ScanState::InsideString;
            }
            ScanState::InsideString => match ch {
                '\\' => {
                    out.push(ch);
                    state = ScanState::AfterEscape;
                }
                '"' => {
                    if terminates_string(&chars, i + 1) {
                        out.push('"');
                        state = ScanState::OutsideString;
                    } else {
                        out.push_str("\\\"");
                    }
                }
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(ch),
            },
        }
    }

    out
}

/// Lookahead past whitespace: a quote ends a string only if the next
/// significant character is a structural one or the input ends.
fn terminates_string(chars: &[char], from: usize) -> bool {
    let mut j = from;
    while j < chars.len() && matches!(chars[j], ' ' | '\t' | '\r' | '\n') {
        j += 1;
    }
    match chars.get(j).copied() {
        None => true,
        Some(':' | ',' | '}' | ']') => true,
        Some(_) => false,
    }
}

/// Find the byte index of the `}` matching the `{` at byte index `start`.
///
/// Tracks string-literal and escape state so braces inside string values
/// are ignored. Returns `None` when the object never closes.
pub fn find_matching_brace(raw: &str, start: usize) -> Option<usize> {
    let mut depth = 0u32;
    let mut state = ScanState::OutsideString;

    for (i, ch) in raw[start..].char_indices() {
        match state {
            ScanState::AfterEscape => state = ScanState::InsideString,
            ScanState::InsideString => match ch {
                '\\' => state = ScanState::AfterEscape,
                '"' => state = ScanState::OutsideString,
                _ => {}
            },
            ScanState::OutsideString => match ch {
                '"' => state = ScanState::InsideString,
                '{' => depth += 1,
                '}' => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return Some(start + i);
                    }
                }
                _ => {}
            },
        }
    }
    None
}

/// Strict parse, falling back to [`repair_json`] on failure.
pub fn parse_json_lenient(raw: &str) -> Option<serde_json::Value> {
    if let Ok(value) = serde_json::from_str(raw) {
        return Some(value);
    }
    serde_json::from_str(&repair_json(raw)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_json_is_untouched() {
        let cases = [
            r#"{"a": 1}"#,
            r#"{"a": "text with , ] inside"}"#,
            r#"{"nested": {"b": ["x", "y"]}}"#,
        ];
        for case in cases {
            assert_eq!(repair_json(case), case);
        }
    }

    #[test]
    fn test_trailing_commas_removed() {
        let repaired = repair_json(r#"{"a": [1, 2,], "b": 3,}"#);
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["a"][1], 2);
        assert_eq!(value["b"], 3);
    }

    #[test]
    fn test_interior_quote_escaped() {
        let repaired = repair_json(r#"{"a": "he said "hi""}"#);
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["a"], "he said \"hi\"");
    }

    #[test]
    fn test_control_chars_in_string_escaped() {
        let repaired = repair_json("{\"a\": \"line one\nline two\tend\"}");
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["a"], "line one\nline two\tend");
    }

    #[test]
    fn test_already_escaped_sequences_preserved() {
        let raw = r#"{"a": "quoted \" fine", "b": "slash \\",}"#;
        let repaired = repair_json(raw);
        let value: serde_json::Value = serde_json::from_str(&repaired).unwrap();
        assert_eq!(value["a"], "quoted \" fine");
        assert_eq!(value["b"], "slash \\");
    }

    #[test]
    fn test_find_matching_brace_nested() {
        let raw = r#"prefix {"a": {"b": 1}, "c": 2} suffix"#;
        let start = raw.find('{').unwrap();
        let end = find_matching_brace(raw, start).unwrap();
        assert_eq!(&raw[start..=end], r#"{"a": {"b": 1}, "c": 2}"#);
    }

    #[test]
    fn test_find_matching_brace_ignores_braces_in_strings() {
        let raw = r#"{"a": "}}}"}"#;
        let end = find_matching_brace(raw, 0).unwrap();
        assert_eq!(end, raw.len() - 1);
    }

    #[test]
    fn test_find_matching_brace_unclosed() {
        assert_eq!(find_matching_brace(r#"{"a": 1"#, 0), None);
    }

    #[test]
    fn test_parse_json_lenient_repairs() {
        let value = parse_json_lenient(r#"{"a": "x "y"",}"#).unwrap();
        assert_eq!(value["a"], "x \"y\"");
    }

    #[test]
    fn test_parse_json_lenient_gives_up_on_prose() {
        assert!(parse_json_lenient("I cannot summarize this page.").is_none());
    }
}
