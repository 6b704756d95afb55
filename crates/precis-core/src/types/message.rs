//! Message types for provider chat calls.

use serde::{Deserialize, Serialize};

/// Role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Default for MessageRole {
    fn default() -> Self {
        Self::User
    }
}

/// A base64-encoded image attached to a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub base64: String,
    pub mime_type: String,
}

/// A message in a conversation.
///
/// Messages are constructed fresh for every provider call and never mutated
/// after being sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
    /// Images attached to this message (first-chunk user message only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<ImageData>,
    /// Marks a prompt-cache segment boundary. Providers that support prompt
    /// caching anchor a cache breakpoint here; others ignore it.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cache_boundary: bool,
}

impl ChatMessage {
    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            images: Vec::new(),
            cache_boundary: false,
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            images: Vec::new(),
            cache_boundary: false,
        }
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            images: Vec::new(),
            cache_boundary: false,
        }
    }

    /// Attach images to this message.
    pub fn with_images(mut self, images: Vec<ImageData>) -> Self {
        self.images = images;
        self
    }

    /// Mark this message as a prompt-cache segment boundary.
    pub fn with_cache_boundary(mut self) -> Self {
        self.cache_boundary = true;
        self
    }
}
