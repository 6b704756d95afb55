//! The summarization engine.
//!
//! Drives the chunker, prompt builder, provider, collector, and parser:
//! single-shot for content that fits one chunk, rolling context otherwise,
//! the whole pipeline wrapped in a bounded retry loop with the image round
//! trip layered on top.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::chunker::chunk_text;
use crate::error::{PrecisError, PrecisResult};
use crate::summarizer::collector::collect_stream;
use crate::summarizer::options::{ImageRef, SummarizeOptions};
use crate::summarizer::placeholders::{build_placeholders, replace_placeholders};
use crate::summarizer::prompts::{self, field_policy, WordCountBucket};
use crate::summarizer::response::parse_summary_response;
use crate::summarizer::schema::response_schema;
use crate::traits::{ChatOptions, ChatProvider, ResponseFormat};
use crate::types::{ChatMessage, ExtractedContent, ImageData, SummaryDocument};

const MAX_OUTPUT_TOKENS: u32 = 8_192;
const DEFAULT_TEMPERATURE: f32 = 0.3;
const BACKOFF_UNIT: Duration = Duration::from_millis(1_000);

/// Images the model may request in one round trip.
const MAX_REQUESTED_IMAGES: usize = 3;
/// Hard cap on images attached to one summarization.
const MAX_TOTAL_IMAGES: usize = 5;

/// Summarize `content` with the given provider.
///
/// Returns either a complete [`SummaryDocument`] or one of the distinct
/// signals in [`PrecisError`] - never a partially-populated document. The
/// image round trip, when the model asks for more visual evidence, happens
/// inside this call and is bounded to one extra pass.
pub async fn summarize(
    provider: &dyn ChatProvider,
    content: &ExtractedContent,
    options: &SummarizeOptions,
) -> PrecisResult<SummaryDocument> {
    let image_analysis = options.image_analysis && provider.supports_vision();
    let policy = field_policy(
        options.detail_level,
        WordCountBucket::from_word_count(content.word_count),
        content.content_type,
    );
    let system_prompt = prompts::with_user_instructions(
        prompts::system_prompt(
            &policy,
            &options.language,
            content.content_type,
            options.today,
            !options.images.is_empty(),
            !provider.supports_json_schema(),
        ),
        options.user_instructions.as_deref(),
    );
    options.observer.system_prompt(&system_prompt);

    let chunks = chunk_text(&content.content, options.context_window);
    tracing::debug!(
        chunks = chunks.len(),
        provider = provider.id(),
        model = provider.model(),
        "starting summarization"
    );

    let first_pass = run_attempts(
        provider,
        content,
        &chunks,
        &system_prompt,
        options,
        &options.images,
        &options.image_urls,
        image_analysis,
    )
    .await;

    let result = match first_pass {
        Err(PrecisError::ImageRequest { urls }) if image_analysis => {
            let (images, image_urls) = fetch_requested_images(options, &urls).await?;
            // One round trip only: image requests in the second response
            // are not honored.
            run_attempts(
                provider,
                content,
                &chunks,
                &system_prompt,
                options,
                &images,
                &image_urls,
                false,
            )
            .await
        }
        other => other,
    };

    result.map(|mut doc| {
        doc.provider = Some(provider.id().to_string());
        doc.model = Some(provider.model().to_string());
        doc
    })
}

/// Bounded retry loop: terminal signals propagate immediately, everything
/// else backs off linearly (1s, 2s, ...) up to `max_retries`.
#[allow(clippy::too_many_arguments)]
async fn run_attempts(
    provider: &dyn ChatProvider,
    content: &ExtractedContent,
    chunks: &[String],
    system_prompt: &str,
    options: &SummarizeOptions,
    images: &[ImageData],
    image_urls: &[ImageRef],
    allow_image_request: bool,
) -> PrecisResult<SummaryDocument> {
    let mut last_error: Option<PrecisError> = None;

    for attempt in 0..=options.max_retries {
        if options.cancel.is_cancelled() {
            return Err(PrecisError::Cancelled);
        }

        let result = if chunks.len() == 1 {
            one_shot(
                provider,
                content,
                system_prompt,
                options,
                images,
                image_urls,
                allow_image_request,
            )
            .await
        } else {
            rolling(
                provider,
                content,
                chunks,
                system_prompt,
                options,
                images,
                image_urls,
            )
            .await
        };

        match result {
            Ok(doc) => return Ok(doc),
            Err(err) if !err.is_retryable() => return Err(err),
            Err(err) => {
                tracing::warn!(attempt, error = %err, "summarization attempt failed");
                last_error = Some(err);
                if attempt < options.max_retries {
                    let delay = BACKOFF_UNIT * (attempt + 1);
                    tokio::select! {
                        biased;
                        _ = options.cancel.cancelled() => return Err(PrecisError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| PrecisError::Internal("summarization failed without an error".into())))
}

/// Single provider call for content that fits one chunk.
#[allow(clippy::too_many_arguments)]
async fn one_shot(
    provider: &dyn ChatProvider,
    content: &ExtractedContent,
    system_prompt: &str,
    options: &SummarizeOptions,
    images: &[ImageData],
    image_urls: &[ImageRef],
    allow_image_request: bool,
) -> PrecisResult<SummaryDocument> {
    let mut user_prompt = prompts::summarization_prompt(content);
    if !images.is_empty() && !image_urls.is_empty() {
        user_prompt.push_str(&prompts::image_listing(
            image_urls,
            content.thumbnail_url.as_deref(),
        ));
    }

    let messages = vec![
        ChatMessage::system(system_prompt).with_cache_boundary(),
        ChatMessage::user(user_prompt).with_images(images.to_vec()),
    ];
    options.observer.conversation(&messages);

    let chat_options = structured_chat_options(provider, &options.cancel);
    let stream = provider.stream_chat(&messages, &chat_options).await?;
    let response = collect_stream(
        stream,
        &options.cancel,
        options.observer.on_stream_chunk.as_deref(),
    )
    .await?;
    options.observer.raw_response(&response);

    let doc = parse_summary_response(&response, allow_image_request && !images.is_empty())?;
    Ok(replace_placeholders(
        doc,
        &build_placeholders(content, image_urls),
    ))
}

/// Rolling-context orchestration over two or more chunks.
///
/// Images attach to the first chunk only; comments are injected into the
/// final chunk only; only the final response is parsed as JSON -
/// intermediate responses become the next iteration's context verbatim.
#[allow(clippy::too_many_arguments)]
async fn rolling(
    provider: &dyn ChatProvider,
    content: &ExtractedContent,
    chunks: &[String],
    system_prompt: &str,
    options: &SummarizeOptions,
    images: &[ImageData],
    image_urls: &[ImageRef],
) -> PrecisResult<SummaryDocument> {
    let total = chunks.len();
    let mut rolling_summary = String::new();

    for (i, chunk) in chunks.iter().enumerate() {
        if options.cancel.is_cancelled() {
            return Err(PrecisError::Cancelled);
        }
        options.observer.chunk_progress(i, total);
        let is_last = i + 1 == total;

        let user_prompt = if i == 0 {
            let mut chunk_content = content.clone();
            chunk_content.content = chunk.clone();
            chunk_content.comments.clear();
            let mut prompt = prompts::summarization_prompt(&chunk_content);
            if !images.is_empty() && !image_urls.is_empty() {
                prompt.push_str(&prompts::image_listing(
                    image_urls,
                    content.thumbnail_url.as_deref(),
                ));
            }
            prompt
        } else {
            let mut prompt = prompts::rolling_context_prompt(&rolling_summary);
            prompt.push_str("\n\n");
            if is_last {
                prompt.push_str(prompts::final_chunk_prompt());
                prompt.push_str("\n\n");
            }
            prompt.push_str(&format!(
                "**Content (part {} of {}):**\n\n{}",
                i + 1,
                total,
                chunk
            ));
            if is_last && !content.is_discussion() && !content.comments.is_empty() {
                prompt.push_str(&prompts::format_comments(&content.comments));
            }
            prompt
        };

        let user_message = if i == 0 {
            ChatMessage::user(user_prompt).with_images(images.to_vec())
        } else {
            ChatMessage::user(user_prompt)
        };
        let messages = vec![
            ChatMessage::system(system_prompt).with_cache_boundary(),
            user_message,
        ];
        options.observer.conversation(&messages);

        let chat_options = if is_last {
            structured_chat_options(provider, &options.cancel)
        } else {
            freeform_chat_options(&options.cancel)
        };
        let stream = provider.stream_chat(&messages, &chat_options).await?;
        let response = collect_stream(
            stream,
            &options.cancel,
            options.observer.on_stream_chunk.as_deref(),
        )
        .await?;
        options.observer.raw_response(&response);

        if is_last {
            // Images never attach past the first chunk, so image requests
            // are not honored on this path.
            let doc = parse_summary_response(&response, false)?;
            return Ok(replace_placeholders(
                doc,
                &build_placeholders(content, image_urls),
            ));
        }

        rolling_summary = response;
        options.observer.rolling_summary(&rolling_summary);
    }

    Err(PrecisError::Internal("no chunks to process".into()))
}

/// Fetch model-requested images, bounded per request and in total, and
/// merge them into the attachment set.
async fn fetch_requested_images(
    options: &SummarizeOptions,
    urls: &[String],
) -> PrecisResult<(Vec<ImageData>, Vec<ImageRef>)> {
    let mut images = options.images.clone();
    let mut refs = options.image_urls.clone();
    let room = MAX_TOTAL_IMAGES.saturating_sub(images.len());

    for url in urls.iter().take(MAX_REQUESTED_IMAGES.min(room)) {
        if refs.iter().any(|r| &r.url == url) {
            continue;
        }
        let data = options.fetcher.fetch(url, &options.cancel).await?;
        tracing::debug!(%url, "fetched requested image");
        images.push(data);
        refs.push(ImageRef::new(url.clone(), ""));
    }

    Ok((images, refs))
}

fn structured_chat_options(provider: &dyn ChatProvider, cancel: &CancellationToken) -> ChatOptions {
    let response_format = if provider.supports_json_schema() {
        ResponseFormat::JsonSchema(response_schema())
    } else {
        ResponseFormat::Json
    };
    ChatOptions {
        temperature: Some(DEFAULT_TEMPERATURE),
        max_tokens: Some(MAX_OUTPUT_TOKENS),
        response_format,
        cancel: cancel.clone(),
    }
}

fn freeform_chat_options(cancel: &CancellationToken) -> ChatOptions {
    ChatOptions {
        temperature: Some(DEFAULT_TEMPERATURE),
        max_tokens: Some(MAX_OUTPUT_TOKENS),
        response_format: ResponseFormat::Text,
        cancel: cancel.clone(),
    }
}
