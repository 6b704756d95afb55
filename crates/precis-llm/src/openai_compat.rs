//! OpenAI-compatible provider adapter.
//!
//! One adapter covers the backends speaking the `/v1/chat/completions`
//! dialect: OpenAI itself, xAI, DeepSeek, and self-hosted gateways (Ollama,
//! LM Studio, vLLM). Differences are parameterized: OpenAI's newer model
//! families take `max_completion_tokens` instead of `max_tokens`, and only
//! OpenAI gets native JSON-schema enforcement.

use async_trait::async_trait;
use serde_json::{json, Value};

use precis_core::{
    ChatMessage, ChatOptions, ChatProvider, ChatStream, MessageRole, PrecisError, PrecisResult,
    ProviderConfig, ProviderKind, ResponseFormat,
};

use crate::sse::sse_stream;

const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 4_096;

/// Adapter for OpenAI-compatible chat APIs.
#[derive(Debug)]
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    endpoint: String,
}

impl OpenAiCompatProvider {
    /// Create a new adapter from the given configuration.
    pub fn new(config: ProviderConfig) -> PrecisResult<Self> {
        if config.api_key.is_empty() && config.provider != ProviderKind::SelfHosted {
            return Err(PrecisError::Configuration(format!(
                "API key required for provider '{}'",
                config.provider.id()
            )));
        }

        let endpoint = config.resolved_endpoint();
        Ok(Self {
            client: reqwest::Client::new(),
            config,
            endpoint,
        })
    }

    fn is_openai(&self) -> bool {
        self.config.provider == ProviderKind::OpenAi
    }

    fn message_to_value(message: &ChatMessage) -> Value {
        let role = match message.role {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };

        if message.images.is_empty() {
            return json!({ "role": role, "content": message.content });
        }

        let mut parts = vec![json!({ "type": "text", "text": message.content })];
        for image in &message.images {
            parts.push(json!({
                "type": "image_url",
                "image_url": {
                    "url": format!("data:{};base64,{}", image.mime_type, image.base64)
                }
            }));
        }
        json!({ "role": role, "content": parts })
    }

    fn build_body(&self, messages: &[ChatMessage], options: &ChatOptions, stream: bool) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages.iter().map(Self::message_to_value).collect::<Vec<_>>(),
            "temperature": options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "stream": stream,
        });

        // OpenAI's newer model families require max_completion_tokens.
        let token_param = if self.is_openai() {
            "max_completion_tokens"
        } else {
            "max_tokens"
        };
        body[token_param] = json!(options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS));

        match &options.response_format {
            ResponseFormat::Text => {}
            ResponseFormat::Json => {
                body["response_format"] = json!({ "type": "json_object" });
            }
            ResponseFormat::JsonSchema(schema) => {
                body["response_format"] = json!({
                    "type": "json_schema",
                    "json_schema": {
                        "name": precis_core::summarizer::RESPONSE_SCHEMA_NAME,
                        "schema": schema,
                    }
                });
            }
        }

        body
    }

    async fn post_chat(&self, body: &Value, options: &ChatOptions) -> PrecisResult<reqwest::Response> {
        let url = format!("{}/v1/chat/completions", self.endpoint);
        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(body)
            .send();

        let response = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => return Err(PrecisError::Cancelled),
            response = request => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PrecisError::provider(status.as_u16(), body));
        }
        Ok(response)
    }
}

fn delta_content(frame: &Value) -> Option<String> {
    frame
        .pointer("/choices/0/delta/content")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> PrecisResult<String> {
        let body = self.build_body(messages, options, false);
        let response = self.post_chat(&body, options).await?;

        let text = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => return Err(PrecisError::Cancelled),
            text = response.text() => text?,
        };
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| PrecisError::parse(format!("undecodable chat response: {e}")))?;

        Ok(value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string())
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> PrecisResult<ChatStream> {
        let body = self.build_body(messages, options, true);
        let response = self.post_chat(&body, options).await?;
        Ok(sse_stream(response, delta_content))
    }

    fn id(&self) -> &str {
        self.config.provider.id()
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_json_schema(&self) -> bool {
        self.is_openai()
    }

    fn supports_vision(&self) -> bool {
        matches!(
            self.config.provider,
            ProviderKind::OpenAi | ProviderKind::XAi
        )
    }
}
