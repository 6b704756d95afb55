//! Placeholder token substitution.
//!
//! Prompts reference attachments by opaque tokens (`{{IMG_n}}`,
//! `{{FILE_n}}`, `{{VIDEO_URL}}`) instead of real URLs, which may be long or
//! sensitive to echo verbatim. After parsing, every text field of the
//! document - including nested extra-section titles and bodies - has the
//! tokens substituted with real values. Substitution is idempotent: once
//! replaced, no token remains to match again.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::summarizer::options::ImageRef;
use crate::types::{ContentType, ExtractedContent, ProsAndCons, SummaryDocument};

static TIMESTAMP_PARAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[&?]t=\d+s?").unwrap());

/// Build the token → value table for one piece of content.
pub fn build_placeholders(
    content: &ExtractedContent,
    image_urls: &[ImageRef],
) -> Vec<(String, String)> {
    let mut replacements = Vec::new();

    for (i, image) in image_urls.iter().enumerate() {
        replacements.push((format!("{{{{IMG_{}}}}}", i + 1), image.url.clone()));
    }

    if content.content_type == ContentType::Video {
        // Strip any timestamp param so appended &t=SECONDS links are clean.
        let clean_url = TIMESTAMP_PARAM_RE.replace_all(&content.url, "").into_owned();
        replacements.push(("{{VIDEO_URL}}".to_string(), clean_url));
    }

    for (key, url) in &content.file_map {
        replacements.push((format!("{{{{FILE_{key}}}}}"), url.clone()));
    }

    replacements
}

/// Substitute every known token in every text field of the document.
pub fn replace_placeholders(
    mut doc: SummaryDocument,
    replacements: &[(String, String)],
) -> SummaryDocument {
    if replacements.is_empty() {
        return doc;
    }

    let replace = |text: &str| -> String {
        let mut result = text.to_string();
        for (token, value) in replacements {
            if result.contains(token.as_str()) {
                result = result.replace(token.as_str(), value);
            }
        }
        result
    };
    let replace_all = |items: &mut Vec<String>| {
        for item in items.iter_mut() {
            *item = replace(item);
        }
    };

    doc.tldr = replace(&doc.tldr);
    doc.summary = replace(&doc.summary);
    doc.conclusion = replace(&doc.conclusion);
    replace_all(&mut doc.key_takeaways);
    replace_all(&mut doc.notable_quotes);
    replace_all(&mut doc.related_topics);
    doc.fact_check = doc.fact_check.map(|t| replace(&t));
    if let Some(highlights) = doc.comments_highlights.as_mut() {
        replace_all(highlights);
    }
    doc.pros_and_cons = doc.pros_and_cons.map(|mut pc: ProsAndCons| {
        replace_all(&mut pc.pros);
        replace_all(&mut pc.cons);
        pc
    });
    doc.extra_sections = doc
        .extra_sections
        .into_iter()
        .map(|(title, body)| (replace(&title), replace(&body)))
        .collect();

    doc
}
