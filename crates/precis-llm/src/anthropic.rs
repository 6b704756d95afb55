//! Anthropic (Claude) provider adapter.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use precis_core::{
    ChatMessage, ChatOptions, ChatProvider, ChatStream, MessageRole, PrecisError, PrecisResult,
    ProviderConfig,
};

use crate::sse::sse_stream;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 4_096;

/// Anthropic provider adapter.
///
/// The messages API wants the system prompt as a top-level field, content
/// as typed blocks, and base64 image sources. There is no native JSON
/// schema enforcement; the pipeline embeds the schema in the prompt
/// instead.
pub struct AnthropicProvider {
    client: Client,
    config: ProviderConfig,
    endpoint: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: &'static str,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Text {
        text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        cache_control: Option<Value>,
    },
    Image {
        source: ImageSource,
    },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: Option<String>,
}

impl AnthropicProvider {
    /// Create a new Anthropic provider adapter.
    pub fn new(config: ProviderConfig) -> PrecisResult<Self> {
        if config.api_key.is_empty() {
            return Err(PrecisError::Configuration(
                "API key required for provider 'anthropic'".to_string(),
            ));
        }

        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "x-api-key",
            config
                .api_key
                .parse()
                .map_err(|_| PrecisError::Configuration("Invalid API key format".to_string()))?,
        );
        headers.insert(
            "anthropic-version",
            ANTHROPIC_VERSION
                .parse()
                .map_err(|_| PrecisError::Configuration("Invalid version header".to_string()))?,
        );
        headers.insert(
            "content-type",
            "application/json"
                .parse()
                .map_err(|_| PrecisError::Configuration("Invalid content type".to_string()))?,
        );

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| {
                PrecisError::Configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        let endpoint = config.resolved_endpoint();
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    fn build_request(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
        stream: bool,
    ) -> AnthropicRequest {
        // The system message moves to the top-level field.
        let system = messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.clone());

        let conversation = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(|m| {
                let mut content = vec![ContentBlock::Text {
                    text: m.content.clone(),
                    cache_control: m
                        .cache_boundary
                        .then(|| serde_json::json!({ "type": "ephemeral" })),
                }];
                for image in &m.images {
                    content.push(ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64",
                            media_type: image.mime_type.clone(),
                            data: image.base64.clone(),
                        },
                    });
                }
                AnthropicMessage {
                    role: match m.role {
                        MessageRole::Assistant => "assistant",
                        _ => "user",
                    },
                    content,
                }
            })
            .collect();

        AnthropicRequest {
            model: self.config.model.clone(),
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: Some(options.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
            system,
            messages: conversation,
            stream,
        }
    }

    async fn post_messages(
        &self,
        request: &AnthropicRequest,
        options: &ChatOptions,
    ) -> PrecisResult<reqwest::Response> {
        let url = format!("{}/v1/messages", self.endpoint);
        let send = self.client.post(&url).json(request).send();

        let response = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => return Err(PrecisError::Cancelled),
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PrecisError::provider(status.as_u16(), body));
        }
        Ok(response)
    }
}

fn content_block_delta(frame: &Value) -> Option<String> {
    if frame.get("type").and_then(Value::as_str) != Some("content_block_delta") {
        return None;
    }
    frame
        .pointer("/delta/text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl ChatProvider for AnthropicProvider {
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> PrecisResult<String> {
        let request = self.build_request(messages, options, false);
        let response = self.post_messages(&request, options).await?;

        let text = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => return Err(PrecisError::Cancelled),
            text = response.text() => text?,
        };
        let parsed: AnthropicResponse = serde_json::from_str(&text)
            .map_err(|e| PrecisError::parse(format!("undecodable messages response: {e}")))?;

        Ok(parsed
            .content
            .iter()
            .find(|c| c.content_type == "text")
            .and_then(|c| c.text.clone())
            .unwrap_or_default())
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> PrecisResult<ChatStream> {
        let request = self.build_request(messages, options, true);
        let response = self.post_messages(&request, options).await?;
        Ok(sse_stream(response, content_block_delta))
    }

    fn id(&self) -> &str {
        self.config.provider.id()
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_json_schema(&self) -> bool {
        // No native JSON mode; the schema travels in the system prompt.
        false
    }

    fn supports_vision(&self) -> bool {
        true
    }
}
