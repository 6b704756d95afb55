//! Core data types for the summarization pipeline.

mod content;
mod message;
mod summary;

pub use content::{
    ContentType, ExtractedComment, ExtractedContent, ExtractedImage, ImageTier,
};
pub use message::{ChatMessage, ImageData, MessageRole};
pub use summary::{ProsAndCons, SummaryDocument};
