//! precis-core - Core library for precis.
//!
//! This crate provides the types, trait seams, and orchestration pipeline
//! for turning extracted page/video/discussion text into a structured
//! summary document by driving interchangeable chat-completion backends.
//!
//! # Example
//!
//! ```ignore
//! use precis_core::{summarizer, ExtractedContent, SummarizeOptions};
//!
//! let options = SummarizeOptions::new(128_000);
//! let doc = summarizer::summarize(provider.as_ref(), &content, &options).await?;
//! println!("{}", doc.tldr);
//! ```

pub mod chunker;
pub mod config;
pub mod error;
pub mod registry;
pub mod summarizer;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{ProviderConfig, ProviderKind};
pub use error::{extract_api_error, PrecisError, PrecisResult};
pub use registry::{TaskGuard, TaskRegistry};
pub use summarizer::{
    summarize, DetailLevel, ImageRef, LanguagePolicy, Observer, SummarizeOptions,
};
pub use traits::{ChatOptions, ChatProvider, ChatStream, ImageFetcher, ResponseFormat};
pub use types::{
    ChatMessage, ContentType, ExtractedComment, ExtractedContent, ExtractedImage, ImageData,
    ImageTier, MessageRole, ProsAndCons, SummaryDocument,
};
