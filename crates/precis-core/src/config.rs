//! Provider configuration.

use serde::{Deserialize, Serialize};

/// Chat-completion backend type.
///
/// A closed set: the adapter for a config is resolved once at construction
/// time by the provider factory, never re-branched per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Anthropic,
    Gemini,
    XAi,
    DeepSeek,
    SelfHosted,
}

impl ProviderKind {
    /// Stable identifier used in attribution and logs.
    pub fn id(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Gemini => "gemini",
            ProviderKind::XAi => "xai",
            ProviderKind::DeepSeek => "deepseek",
            ProviderKind::SelfHosted => "self-hosted",
        }
    }

    /// Default API endpoint for this provider.
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com",
            ProviderKind::Anthropic => "https://api.anthropic.com",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
            ProviderKind::XAi => "https://api.x.ai",
            ProviderKind::DeepSeek => "https://api.deepseek.com",
            ProviderKind::SelfHosted => "http://localhost:11434",
        }
    }

    /// Default context window in tokens.
    pub fn default_context_window(&self) -> u32 {
        match self {
            ProviderKind::OpenAi => 128_000,
            ProviderKind::Anthropic => 200_000,
            ProviderKind::Gemini => 1_000_000,
            ProviderKind::XAi => 128_000,
            ProviderKind::DeepSeek => 64_000,
            ProviderKind::SelfHosted => 100_000,
        }
    }
}

/// Configuration for one provider, supplied by the host settings layer.
///
/// Immutable for the duration of a summarization call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider type.
    pub provider: ProviderKind,
    /// API credential. May be empty for self-hosted endpoints.
    #[serde(default)]
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Custom endpoint override (self-hosted, proxies).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Declared context window in tokens.
    #[serde(default)]
    pub context_window: u32,
}

impl ProviderConfig {
    /// Create a config with the provider's default endpoint and window.
    pub fn new(provider: ProviderKind, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            provider,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: None,
            context_window: provider.default_context_window(),
        }
    }

    /// Builder: set a custom endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Builder: set the context window.
    pub fn with_context_window(mut self, tokens: u32) -> Self {
        self.context_window = tokens;
        self
    }

    /// Resolved endpoint, falling back to the provider default. Trailing
    /// slashes are stripped so adapters can append paths uniformly.
    pub fn resolved_endpoint(&self) -> String {
        self.endpoint
            .as_deref()
            .unwrap_or_else(|| self.provider.default_endpoint())
            .trim_end_matches('/')
            .to_string()
    }

    /// Resolved context window, falling back to the provider default.
    pub fn resolved_context_window(&self) -> u32 {
        if self.context_window > 0 {
            self.context_window
        } else {
            self.provider.default_context_window()
        }
    }
}
