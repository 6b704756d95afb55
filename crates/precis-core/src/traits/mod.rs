//! Trait seams for the pipeline: chat providers and image fetching.

mod images;
mod provider;

pub use images::{HttpImageFetcher, ImageFetcher};
pub use provider::{ChatOptions, ChatProvider, ChatStream, ResponseFormat, StreamItem};
