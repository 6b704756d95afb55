//! precis-llm - Chat-completion provider adapters for precis.
//!
//! This crate implements the [`ChatProvider`] trait for the supported
//! backends and normalizes their wire differences: authentication header
//! shape, token-limit parameter naming, native JSON-schema enforcement vs
//! best-effort JSON mode, and image attachment encoding.
//!
//! # Supported Providers
//!
//! - **OpenAI-compatible** - OpenAI, xAI, DeepSeek, self-hosted gateways
//! - **Anthropic** - Claude models
//! - **Gemini** - Google Gemini models
//!
//! # Example
//!
//! ```ignore
//! use precis_llm::ProviderFactory;
//!
//! let provider = ProviderFactory::openai(api_key, "gpt-4o")?;
//!
//! // Or from a host-supplied config
//! let provider = ProviderFactory::create(config)?;
//! ```

mod anthropic;
mod factory;
mod gemini;
mod openai_compat;
mod sse;

pub use anthropic::AnthropicProvider;
pub use factory::ProviderFactory;
pub use gemini::GeminiProvider;
pub use openai_compat::OpenAiCompatProvider;

// Re-export core types for convenience
pub use precis_core::{ChatOptions, ChatProvider, ChatStream, ProviderConfig, ProviderKind};
