//! Google Gemini provider adapter.

use async_trait::async_trait;
use serde_json::{json, Value};

use precis_core::{
    ChatMessage, ChatOptions, ChatProvider, ChatStream, MessageRole, PrecisError, PrecisResult,
    ProviderConfig, ResponseFormat,
};

use crate::sse::sse_stream;

const DEFAULT_TEMPERATURE: f32 = 0.3;
const DEFAULT_MAX_TOKENS: u32 = 4_096;

/// Gemini provider adapter.
///
/// The generateContent API takes `contents` with `user`/`model` roles, a
/// separate `systemInstruction`, inline base64 images, and enforces JSON
/// natively through `responseMimeType` + `responseSchema`.
pub struct GeminiProvider {
    client: reqwest::Client,
    config: ProviderConfig,
    endpoint: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider adapter.
    pub fn new(config: ProviderConfig) -> PrecisResult<Self> {
        if config.api_key.is_empty() {
            return Err(PrecisError::Configuration(
                "API key required for provider 'gemini'".to_string(),
            ));
        }
        let endpoint = config.resolved_endpoint();
        Ok(Self {
            client: reqwest::Client::new(),
            config,
            endpoint,
        })
    }

    fn message_to_content(message: &ChatMessage) -> Value {
        let role = match message.role {
            MessageRole::Assistant => "model",
            _ => "user",
        };
        let mut parts = vec![json!({ "text": message.content })];
        for image in &message.images {
            parts.push(json!({
                "inline_data": { "mime_type": image.mime_type, "data": image.base64 }
            }));
        }
        json!({ "role": role, "parts": parts })
    }

    fn build_body(&self, messages: &[ChatMessage], options: &ChatOptions) -> Value {
        let system = messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.clone());

        let contents: Vec<Value> = messages
            .iter()
            .filter(|m| m.role != MessageRole::System)
            .map(Self::message_to_content)
            .collect();

        let mut generation_config = json!({
            "temperature": options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            "maxOutputTokens": options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });
        match &options.response_format {
            ResponseFormat::Text => {}
            ResponseFormat::Json => {
                generation_config["responseMimeType"] = json!("application/json");
            }
            ResponseFormat::JsonSchema(schema) => {
                generation_config["responseMimeType"] = json!("application/json");
                generation_config["responseSchema"] = schema.clone();
            }
        }

        let mut body = json!({
            "contents": contents,
            "generationConfig": generation_config,
        });
        if let Some(system) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }
        body
    }

    async fn post_generate(
        &self,
        body: &Value,
        options: &ChatOptions,
        stream: bool,
    ) -> PrecisResult<reqwest::Response> {
        let url = if stream {
            format!(
                "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
                self.endpoint, self.config.model
            )
        } else {
            format!(
                "{}/v1beta/models/{}:generateContent",
                self.endpoint, self.config.model
            )
        };

        let send = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send();

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

fn candidate_text(frame: &Value) -> Option<String> {
    frame
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> PrecisResult<String> {
        let body = self.build_body(messages, options);
        let response = self.post_generate(&body, options, false).await?;

        let text = tokio::select! {
            biased;
            _ = options.cancel.cancelled() => return Err(PrecisError::Cancelled),
            text = response.text() => text?,
        };
        let value: Value = serde_json::from_str(&text)
            .map_err(|e| PrecisError::parse(format!("undecodable generateContent response: {e}")))?;

        Ok(candidate_text(&value).unwrap_or_default())
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> PrecisResult<ChatStream> {
        let body = self.build_body(messages, options);
        let response = self.post_generate(&body, options, true).await?;
        Ok(sse_stream(response, candidate_text))
    }

    fn id(&self) -> &str {
        self.config.provider.id()
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn supports_json_schema(&self) -> bool {
        true
    }

    fn supports_vision(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use precis_core::ProviderKind;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(ProviderConfig::new(
            ProviderKind::Gemini,
            "AIza-test",
            "gemini-2.0-flash",
        ))
        .unwrap()
    }

    #[test]
    fn test_roles_and_system_instruction() {
        let messages = [
            ChatMessage::system("be terse"),
            ChatMessage::user("summarize"),
            ChatMessage::assistant("ok"),
        ];
        let body = provider().build_body(&messages, &ChatOptions::default());
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be terse");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][1]["role"], "model");
    }

    #[test]
    fn test_schema_enforced_natively() {
        let options = ChatOptions {
            response_format: ResponseFormat::JsonSchema(json!({"type": "object"})),
            ..Default::default()
        };
        let body = provider().build_body(&[ChatMessage::user("x")], &options);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "object");
    }

    #[test]
    fn test_candidate_text_extraction() {
        let frame: Value = serde_json::from_str(
            r#"{"candidates": [{"content": {"parts": [{"text": "hello"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(candidate_text(&frame), Some("hello".to_string()));
    }
}
