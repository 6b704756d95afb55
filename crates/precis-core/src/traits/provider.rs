//! ChatProvider trait and related types.

use std::pin::Pin;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::PrecisResult;
use crate::types::ChatMessage;

/// Stream item for streaming responses.
pub type StreamItem = Result<String, crate::error::PrecisError>;

/// Stream type for incremental provider output.
pub type ChatStream = Pin<Box<dyn futures::Stream<Item = StreamItem> + Send>>;

/// Response format for provider output.
#[derive(Debug, Clone, Default)]
pub enum ResponseFormat {
    /// Plain text response.
    #[default]
    Text,
    /// Best-effort JSON mode.
    Json,
    /// Provider-enforced JSON with a specific schema.
    JsonSchema(serde_json::Value),
}

/// Options for one chat call.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Requested output format.
    pub response_format: ResponseFormat,
    /// Cooperative cancellation, observed at every suspension point.
    pub cancel: CancellationToken,
}

impl ChatOptions {
    /// Options for a short plain-text call.
    pub fn text(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Default::default()
        }
    }
}

/// Uniform interface over heterogeneous chat-completion backends.
///
/// Adapters normalize auth header shape, token-limit parameter naming,
/// schema enforcement, and image attachment encoding. An in-flight call
/// observes `options.cancel` and surfaces [`PrecisError::Cancelled`]
/// distinctly from ordinary failures.
///
/// [`PrecisError::Cancelled`]: crate::error::PrecisError::Cancelled
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send a chat request and return the complete assistant text.
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> PrecisResult<String>;

    /// Send a chat request and stream assistant text fragments in order.
    ///
    /// Malformed stream frames are skipped, not fatal.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> PrecisResult<ChatStream>;

    /// Stable provider identifier (e.g. `"openai"`).
    fn id(&self) -> &str;

    /// Model identifier this adapter was constructed with.
    fn model(&self) -> &str;

    /// Whether the backend enforces a JSON schema natively. When false, the
    /// prompt builder embeds the schema as text and requests JSON mode.
    fn supports_json_schema(&self) -> bool {
        false
    }

    /// Whether the backend accepts image attachments.
    fn supports_vision(&self) -> bool {
        false
    }

    /// Cheap connectivity probe: a one-token round trip. Errors propagate
    /// so the caller can surface a readable message.
    async fn test_connection(&self) -> PrecisResult<()> {
        let messages = [ChatMessage::user("Reply with \"ok\"")];
        let options = ChatOptions {
            max_tokens: Some(10),
            ..Default::default()
        };
        self.send_chat(&messages, &options).await.map(|_| ())
    }
}
