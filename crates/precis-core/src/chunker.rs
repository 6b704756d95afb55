//! Context-budget text chunker.
//!
//! Splits the raw content body into an ordered sequence of chunks sized to
//! fit the provider's context window, leaving headroom for the system
//! prompt, content metadata, and the reserved output budget. Splitting
//! prefers paragraph boundaries (`\n\n`); a paragraph larger than the whole
//! budget is hard-split at the nearest whitespace, snapped to a UTF-8 char
//! boundary.
//!
//! Guarantees:
//! - Concatenating the returned chunks reproduces the input exactly —
//!   paragraph separators stay attached to the chunk they follow and no
//!   text is trimmed.
//! - Same input and window always produce the same chunk sequence.

/// Rough heuristic: 4 chars ≈ 1 token.
const CHARS_PER_TOKEN: usize = 4;

/// Tokens reserved for the system prompt and content metadata block.
const PROMPT_OVERHEAD_TOKENS: usize = 2_048;

/// Tokens reserved for the model's output.
const RESERVED_OUTPUT_TOKENS: usize = 8_192;

/// Floor for pathologically small declared windows.
const MIN_CHUNK_TOKENS: usize = 512;

/// Split `text` into chunks fitting `context_window` tokens.
pub fn chunk_text(text: &str, context_window: u32) -> Vec<String> {
    let max_chars = chunk_budget_chars(context_window);

    if text.len() <= max_chars {
        return vec![text.to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for segment in split_paragraphs(text) {
        if segment.len() > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            current = hard_split(segment, max_chars, &mut chunks);
        } else if !current.is_empty() && current.len() + segment.len() > max_chars {
            chunks.push(std::mem::take(&mut current));
            current.push_str(segment);
        } else {
            current.push_str(segment);
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Usable chunk size in characters for a declared context window.
pub fn chunk_budget_chars(context_window: u32) -> usize {
    let budget_tokens = (context_window as usize)
        .saturating_sub(PROMPT_OVERHEAD_TOKENS + RESERVED_OUTPUT_TOKENS)
        .max(MIN_CHUNK_TOKENS);
    budget_tokens * CHARS_PER_TOKEN
}

/// Split into segments, each keeping its trailing blank-line run, so that
/// the segments concatenate back to the original text.
fn split_paragraphs(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\n' && i + 1 < bytes.len() && bytes[i + 1] == b'\n' {
            let mut end = i + 2;
            while end < bytes.len() && bytes[end] == b'\n' {
                end += 1;
            }
            segments.push(&text[start..end]);
            start = end;
            i = end;
        } else {
            i += 1;
        }
    }

    if start < text.len() {
        segments.push(&text[start..]);
    }
    segments
}

/// Hard-split an oversized paragraph. Full pieces are pushed to `out`; the
/// final piece is returned so the caller can keep packing into it.
fn hard_split(paragraph: &str, max_chars: usize, out: &mut Vec<String>) -> String {
    let mut remaining = paragraph;

    while remaining.len() > max_chars {
        let mut split_at = snap_to_char_boundary(remaining, max_chars);
        // Prefer the last whitespace inside the slice; keep the separator
        // with the leading piece. Whitespace here is single-byte, so the
        // +1 lands on a char boundary.
        if let Some(pos) = remaining[..split_at].rfind([' ', '\n', '\t']) {
            if pos > 0 {
                split_at = pos + 1;
            }
        }
        if split_at == 0 {
            split_at = remaining
                .char_indices()
                .nth(1)
                .map(|(i, _)| i)
                .unwrap_or(remaining.len());
        }
        out.push(remaining[..split_at].to_string());
        remaining = &remaining[split_at..];
    }

    remaining.to_string()
}

/// Snap a byte index back to the nearest valid UTF-8 char boundary.
fn snap_to_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
