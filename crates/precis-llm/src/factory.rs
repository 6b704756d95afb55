//! Factory for creating provider adapters.

use std::sync::Arc;

use precis_core::{ChatProvider, PrecisResult, ProviderConfig, ProviderKind};

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::openai_compat::OpenAiCompatProvider;

/// Factory resolving a [`ProviderConfig`] to its adapter once, at
/// construction time.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create a provider adapter from the given configuration.
    pub fn create(config: ProviderConfig) -> PrecisResult<Arc<dyn ChatProvider>> {
        tracing::debug!(
            provider = config.provider.id(),
            model = %config.model,
            "creating provider adapter"
        );
        match config.provider {
            ProviderKind::Anthropic => {
                let provider = AnthropicProvider::new(config)?;
                Ok(Arc::new(provider))
            }
            ProviderKind::Gemini => {
                let provider = GeminiProvider::new(config)?;
                Ok(Arc::new(provider))
            }
            ProviderKind::OpenAi
            | ProviderKind::XAi
            | ProviderKind::DeepSeek
            | ProviderKind::SelfHosted => {
                let provider = OpenAiCompatProvider::new(config)?;
                Ok(Arc::new(provider))
            }
        }
    }

    /// Create an OpenAI provider with a specific model.
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> PrecisResult<Arc<dyn ChatProvider>> {
        Self::create(ProviderConfig::new(ProviderKind::OpenAi, api_key, model))
    }

    /// Create an Anthropic provider with a specific model.
    pub fn anthropic(api_key: impl Into<String>, model: impl Into<String>) -> PrecisResult<Arc<dyn ChatProvider>> {
        Self::create(ProviderConfig::new(ProviderKind::Anthropic, api_key, model))
    }

    /// Create a Gemini provider with a specific model.
    pub fn gemini(api_key: impl Into<String>, model: impl Into<String>) -> PrecisResult<Arc<dyn ChatProvider>> {
        Self::create(ProviderConfig::new(ProviderKind::Gemini, api_key, model))
    }

    /// Create a self-hosted (OpenAI-compatible) provider.
    pub fn self_hosted(endpoint: impl Into<String>, model: impl Into<String>) -> PrecisResult<Arc<dyn ChatProvider>> {
        Self::create(
            ProviderConfig::new(ProviderKind::SelfHosted, "", model).with_endpoint(endpoint),
        )
    }
}
