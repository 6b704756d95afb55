//! Options and observer callbacks for one summarization invocation.

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;

use crate::summarizer::prompts::{DetailLevel, LanguagePolicy};
use crate::traits::{HttpImageFetcher, ImageFetcher};
use crate::types::{ChatMessage, ImageData};

/// An image URL with its alt text, listed in prompts by placeholder ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    pub url: String,
    pub alt: String,
}

impl ImageRef {
    pub fn new(url: impl Into<String>, alt: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            alt: alt.into(),
        }
    }
}

type TextCallback = Box<dyn Fn(&str) + Send + Sync>;

/// Debug/progress observer callbacks. All optional, all best-effort.
#[derive(Default)]
pub struct Observer {
    /// Each raw model response string.
    pub on_raw_response: Option<TextCallback>,
    /// The assembled system prompt.
    pub on_system_prompt: Option<TextCallback>,
    /// The full conversation before each provider call.
    pub on_conversation: Option<Box<dyn Fn(&[ChatMessage]) + Send + Sync>>,
    /// The rolling summary after each intermediate chunk.
    pub on_rolling_summary: Option<TextCallback>,
    /// Accumulated streaming text, throttled to ~10/s.
    pub on_stream_chunk: Option<TextCallback>,
    /// `(chunk_index, total_chunks)` when rolling context advances.
    pub on_chunk_progress: Option<Box<dyn Fn(usize, usize) + Send + Sync>>,
}

impl Observer {
    pub(crate) fn raw_response(&self, response: &str) {
        if let Some(cb) = &self.on_raw_response {
            cb(response);
        }
    }

    pub(crate) fn system_prompt(&self, prompt: &str) {
        if let Some(cb) = &self.on_system_prompt {
            cb(prompt);
        }
    }

    pub(crate) fn conversation(&self, messages: &[ChatMessage]) {
        if let Some(cb) = &self.on_conversation {
            cb(messages);
        }
    }

    pub(crate) fn rolling_summary(&self, summary: &str) {
        if let Some(cb) = &self.on_rolling_summary {
            cb(summary);
        }
    }

    pub(crate) fn chunk_progress(&self, index: usize, total: usize) {
        if let Some(cb) = &self.on_chunk_progress {
            cb(index, total);
        }
    }
}

impl fmt::Debug for Observer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observer")
            .field("on_raw_response", &self.on_raw_response.is_some())
            .field("on_system_prompt", &self.on_system_prompt.is_some())
            .field("on_conversation", &self.on_conversation.is_some())
            .field("on_rolling_summary", &self.on_rolling_summary.is_some())
            .field("on_stream_chunk", &self.on_stream_chunk.is_some())
            .field("on_chunk_progress", &self.on_chunk_progress.is_some())
            .finish()
    }
}

/// Options for one summarization call.
pub struct SummarizeOptions {
    pub detail_level: DetailLevel,
    pub language: LanguagePolicy,
    /// Declared context window of the active model, in tokens.
    pub context_window: u32,
    /// Retries after the first attempt (default 2).
    pub max_retries: u32,
    /// Verbatim user instruction block, appended last at highest priority.
    pub user_instructions: Option<String>,
    /// Pre-fetched images to attach to the first chunk.
    pub images: Vec<ImageData>,
    /// URL + alt listing matching `images`, used for placeholder IDs.
    pub image_urls: Vec<ImageRef>,
    /// Whether the model may request more images (one bounded round trip).
    pub image_analysis: bool,
    /// Today's date; an explicit input so prompt assembly stays pure.
    pub today: NaiveDate,
    /// Cooperative cancellation, observed at every suspension point.
    pub cancel: CancellationToken,
    /// Fetch seam for the image round trip.
    pub fetcher: Arc<dyn ImageFetcher>,
    pub observer: Observer,
}

impl SummarizeOptions {
    /// Options with defaults: standard detail, auto language, 2 retries,
    /// today from the local clock, HTTP image fetching.
    pub fn new(context_window: u32) -> Self {
        Self {
            detail_level: DetailLevel::Standard,
            language: LanguagePolicy::Auto,
            context_window,
            max_retries: 2,
            user_instructions: None,
            images: Vec::new(),
            image_urls: Vec::new(),
            image_analysis: false,
            today: chrono::Local::now().date_naive(),
            cancel: CancellationToken::new(),
            fetcher: Arc::new(HttpImageFetcher::new()),
            observer: Observer::default(),
        }
    }
}
