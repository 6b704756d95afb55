//! The structured summary document produced by the pipeline.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Pros/cons pair, present only when the content discusses trade-offs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProsAndCons {
    #[serde(default)]
    pub pros: Vec<String>,
    #[serde(default)]
    pub cons: Vec<String>,
}

/// Final summary record returned to the caller.
///
/// List fields always default to an empty sequence, never absent, so
/// consumers can iterate without option-handling. `extra_sections` is a map
/// from section title to markdown body; titles are unique and insertion
/// order carries no meaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct SummaryDocument {
    /// Short 2-4 sentence synopsis.
    pub tldr: String,
    /// Ordered, labeled takeaways.
    pub key_takeaways: Vec<String>,
    /// Long-form summary body (markdown).
    pub summary: String,
    pub notable_quotes: Vec<String>,
    pub conclusion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pros_and_cons: Option<ProsAndCons>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact_check: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments_highlights: Option<Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_sections: BTreeMap<String, String>,
    pub related_topics: Vec<String>,
    pub tags: Vec<String>,
    /// ISO 639-1 code of the source content language.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    /// ISO 639-1 code of the language the summary was written in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary_language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated_title: Option<String>,
    /// Inferred metadata, populated only when the extraction left the
    /// corresponding field missing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inferred_publish_date: Option<String>,
    /// Provider/model attribution, filled in by the engine.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lists_are_empty_not_absent() {
        let doc = SummaryDocument::default();
        assert!(doc.key_takeaways.is_empty());
        assert!(doc.notable_quotes.is_empty());
        assert!(doc.related_topics.is_empty());
        assert!(doc.tags.is_empty());
    }

    #[test]
    fn test_deserializes_with_missing_lists() {
        let doc: SummaryDocument =
            serde_json::from_str(r#"{"tldr": "short", "summary": "body"}"#).unwrap();
        assert_eq!(doc.tldr, "short");
        assert!(doc.key_takeaways.is_empty());
        assert!(doc.extra_sections.is_empty());
    }
}
