//! Extracted content — the read-only input to the pipeline.
//!
//! Extraction itself lives outside this crate; the pipeline consumes the
//! already-extracted record as an immutable value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Kind of page the content was extracted from.
///
/// Drives content-type-specific prompt policy (discussion mode, timestamp
/// links, the code-hosting status line).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ContentType {
    Article,
    Video,
    Discussion,
    CodeHosting,
    #[default]
    Generic,
}

impl ContentType {
    /// Human-readable label used in prompts.
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Article => "article",
            ContentType::Video => "video",
            ContentType::Discussion => "discussion thread",
            ContentType::CodeHosting => "code repository page",
            ContentType::Generic => "page",
        }
    }
}

/// Relevance tier of an extracted image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageTier {
    /// Embedded in the article body.
    Inline,
    /// Surrounding/decorative context (thumbnails, sidebars).
    Contextual,
}

/// An image reference found during extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedImage {
    pub url: String,
    #[serde(default)]
    pub alt: String,
    pub tier: ImageTier,
}

/// A user comment attached to the content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedComment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub likes: Option<u32>,
}

/// Content handed to the pipeline by the extraction collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExtractedContent {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub url: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Main text body (markdown).
    pub content: String,
    pub word_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // Video-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    // Discussion-specific
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subreddit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_score: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment_count: Option<u32>,

    /// Code-hosting file map: reference index → source file URL. Referenced
    /// from prompts via `{{FILE_n}}` placeholders.
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub file_map: HashMap<String, String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<ExtractedComment>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ExtractedImage>,
}

impl ExtractedContent {
    /// Whether comments are the primary content rather than supplementary.
    pub fn is_discussion(&self) -> bool {
        self.content_type == ContentType::Discussion
    }
}
