//! End-to-end pipeline tests against a scripted in-memory provider.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use precis_core::{
    summarize, ChatMessage, ChatOptions, ChatProvider, ChatStream, ExtractedContent, ImageData,
    ImageFetcher, ImageRef, PrecisError, PrecisResult, ResponseFormat, SummarizeOptions,
    TaskRegistry,
};

#[derive(Debug, Clone)]
struct RecordedCall {
    structured: bool,
    image_count: usize,
    user_prompt: String,
}

/// Provider that replays a scripted sequence of responses and records what
/// it was called with.
struct MockProvider {
    responses: Mutex<VecDeque<PrecisResult<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
    schema: bool,
    vision: bool,
    stall: bool,
}

impl MockProvider {
    fn new(responses: Vec<PrecisResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            calls: Mutex::new(Vec::new()),
            schema: false,
            vision: false,
            stall: false,
        }
    }

    fn with_vision(mut self) -> Self {
        self.vision = true;
        self
    }

    fn stalled() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            schema: false,
            vision: false,
            stall: true,
        }
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, messages: &[ChatMessage], options: &ChatOptions) {
        let user = messages
            .iter()
            .rev()
            .find(|m| m.role == precis_core::MessageRole::User);
        self.calls.lock().unwrap().push(RecordedCall {
            structured: !matches!(options.response_format, ResponseFormat::Text),
            image_count: user.map(|m| m.images.len()).unwrap_or(0),
            user_prompt: user.map(|m| m.content.clone()).unwrap_or_default(),
        });
    }

    async fn next_response(&self, options: &ChatOptions) -> PrecisResult<String> {
        if self.stall {
            tokio::select! {
                biased;
                _ = options.cancel.cancelled() => return Err(PrecisError::Cancelled),
                _ = tokio::time::sleep(Duration::from_secs(3600)) => unreachable!(),
            }
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PrecisError::Internal("script exhausted".into())))
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn send_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> PrecisResult<String> {
        self.record(messages, options);
        self.next_response(options).await
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> PrecisResult<ChatStream> {
        self.record(messages, options);
        let response = self.next_response(options).await?;
        Ok(Box::pin(futures::stream::iter(vec![Ok(response)])))
    }

    fn id(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    fn supports_json_schema(&self) -> bool {
        self.schema
    }

    fn supports_vision(&self) -> bool {
        self.vision
    }
}

struct StubFetcher;

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str, _cancel: &CancellationToken) -> PrecisResult<ImageData> {
        Ok(ImageData {
            base64: format!("bytes-of-{url}"),
            mime_type: "image/png".to_string(),
        })
    }
}

fn article(words: usize) -> ExtractedContent {
    ExtractedContent {
        title: "A Test Article".into(),
        url: "https://example.com/article".into(),
        content: vec!["word"; words].join(" "),
        word_count: words as u32,
        ..Default::default()
    }
}

fn envelope(tldr: &str) -> String {
    format!(
        r#"{{"text": "", "summary": {{"tldr": "{tldr}", "keyTakeaways": ["**One** - a", "**Two** - b", "**Three** - c", "**Four** - d"], "summary": "The long-form summary body.", "conclusion": "Done.", "tags": ["test"]}}}}"#
    )
}

fn options(context_window: u32) -> SummarizeOptions {
    let mut options = SummarizeOptions::new(context_window);
    options.fetcher = Arc::new(StubFetcher);
    options
}

fn three_chunk_content() -> ExtractedContent {
    // Under the minimum chunk budget (512 tokens = 2048 chars), six
    // 700-char paragraphs pack into exactly three chunks.
    let para = "y".repeat(698);
    ExtractedContent {
        title: "A Long Read".into(),
        url: "https://example.com/long".into(),
        content: vec![para; 6].join("\n\n"),
        word_count: 6_000,
        ..Default::default()
    }
}

// Scenario A: short article, large window, single-shot path.
#[tokio::test]
async fn scenario_a_single_chunk_article() {
    let provider = MockProvider::new(vec![Ok(envelope("A crisp overview."))]);
    let doc = summarize(&provider, &article(200), &options(128_000))
        .await
        .unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 1, "single-shot path makes exactly one call");
    assert!(calls[0].structured);
    assert_eq!(doc.tldr, "A crisp overview.");
    assert_eq!(doc.summary, "The long-form summary body.");
    assert!((3..=5).contains(&doc.key_takeaways.len()));
    assert_eq!(doc.provider.as_deref(), Some("mock"));
    assert_eq!(doc.model.as_deref(), Some("mock-model"));
}

// Scenario B: three chunks, three calls, only the last parsed as JSON.
#[tokio::test]
async fn scenario_b_rolling_context_three_chunks() {
    let provider = MockProvider::new(vec![
        Ok("Intermediate summary of part one.".to_string()),
        Ok("Combined summary of parts one and two.".to_string()),
        Ok(envelope("The final rolled-up summary.")),
    ]);

    let rolling_seen: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let rolling_cb = rolling_seen.clone();
    let mut options = options(1);
    options.observer.on_rolling_summary = Some(Box::new(move |s: &str| {
        rolling_cb.lock().unwrap().push(s.to_string());
    }));

    let doc = summarize(&provider, &three_chunk_content(), &options)
        .await
        .unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 3, "one provider call per chunk");
    assert!(!calls[0].structured, "intermediate chunks are free-form");
    assert!(!calls[1].structured);
    assert!(calls[2].structured, "final chunk requests structured output");
    assert!(calls[1]
        .user_prompt
        .contains("Intermediate summary of part one."));
    assert!(calls[1].user_prompt.contains("part 2 of 3"));
    assert!(calls[2].user_prompt.contains("FINAL portion"));
    assert_eq!(doc.tldr, "The final rolled-up summary.");
    assert_eq!(
        *rolling_seen.lock().unwrap(),
        vec![
            "Intermediate summary of part one.".to_string(),
            "Combined summary of parts one and two.".to_string(),
        ]
    );
}

// Scenario C: the no-content sentinel surfaces as a distinct signal.
#[tokio::test]
async fn scenario_c_no_content_signal() {
    let provider = MockProvider::new(vec![Ok(
        r#"{"noContent": true, "reason": "login page"}"#.to_string()
    )]);
    let err = summarize(&provider, &article(50), &options(128_000))
        .await
        .unwrap_err();

    assert_eq!(provider.calls().len(), 1, "signals are not retried");
    match err {
        PrecisError::NoContent { reason } => assert_eq!(reason, "login page"),
        other => panic!("expected NoContent, got {other:?}"),
    }
}

// Scenario D: one image round trip; a second request is ignored.
#[tokio::test]
async fn scenario_d_single_image_round_trip() {
    let first = r#"{"text": "", "requestedImages": ["https://img/u1", "https://img/u2"]}"#;
    let second = r#"{"text": "", "requestedImages": ["https://img/u3"], "summary": {"tldr": "With images.", "summary": "Body."}}"#;
    let provider =
        MockProvider::new(vec![Ok(first.to_string()), Ok(second.to_string())]).with_vision();

    let mut options = options(128_000);
    options.image_analysis = true;
    options.images = vec![ImageData {
        base64: "original".into(),
        mime_type: "image/png".into(),
    }];
    options.image_urls = vec![ImageRef::new("https://page/hero.png", "hero")];

    let doc = summarize(&provider, &article(200), &options).await.unwrap();

    let calls = provider.calls();
    assert_eq!(calls.len(), 2, "exactly one additional pass");
    assert_eq!(calls[0].image_count, 1);
    assert_eq!(
        calls[1].image_count, 3,
        "two requested images merged into the set"
    );
    assert_eq!(doc.tldr, "With images.");
}

#[tokio::test]
async fn image_request_ignored_when_analysis_disabled() {
    let response = r#"{"text": "", "requestedImages": ["https://img/u1"], "summary": {"tldr": "No round trip.", "summary": "Body."}}"#;
    let provider = MockProvider::new(vec![Ok(response.to_string())]).with_vision();

    let mut options = options(128_000);
    options.images = vec![ImageData {
        base64: "original".into(),
        mime_type: "image/png".into(),
    }];

    let doc = summarize(&provider, &article(200), &options).await.unwrap();
    assert_eq!(provider.calls().len(), 1);
    assert_eq!(doc.tldr, "No round trip.");
}

// Retry bound: transient failures retried exactly max_retries times.
#[tokio::test(start_paused = true)]
async fn transient_failures_retried_to_the_limit() {
    let provider = MockProvider::new(vec![
        Err(PrecisError::provider(500, "boom 1")),
        Err(PrecisError::provider(502, "boom 2")),
        Err(PrecisError::provider(503, "boom 3")),
    ]);
    let err = summarize(&provider, &article(200), &options(128_000))
        .await
        .unwrap_err();

    assert_eq!(provider.calls().len(), 3, "initial attempt + 2 retries");
    match err {
        PrecisError::Provider { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "boom 3");
        }
        other => panic!("expected the last provider error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn transient_failure_then_success() {
    let provider = MockProvider::new(vec![
        Err(PrecisError::network("connection reset")),
        Ok(envelope("Recovered.")),
    ]);
    let doc = summarize(&provider, &article(200), &options(128_000))
        .await
        .unwrap();
    assert_eq!(provider.calls().len(), 2);
    assert_eq!(doc.tldr, "Recovered.");
}

#[tokio::test]
async fn conversational_response_not_retried() {
    let provider = MockProvider::new(vec![Ok(
        "I'd be happy to help once you share the text.".to_string()
    )]);
    let err = summarize(&provider, &article(200), &options(128_000))
        .await
        .unwrap_err();
    assert_eq!(provider.calls().len(), 1);
    assert!(matches!(err, PrecisError::TextResponse { .. }));
}

#[tokio::test]
async fn cancelled_before_start_makes_no_calls() {
    let provider = MockProvider::new(vec![Ok(envelope("Never."))]);
    let options = {
        let mut options = options(128_000);
        options.cancel.cancel();
        options
    };
    let err = summarize(&provider, &article(200), &options)
        .await
        .unwrap_err();
    assert_eq!(provider.calls().len(), 0);
    assert!(matches!(err, PrecisError::Cancelled));
}

// At-most-one-active-per-key: beginning a key cancels the prior run.
#[tokio::test]
async fn registry_second_invocation_cancels_first() {
    let registry = TaskRegistry::new();
    let provider = Arc::new(MockProvider::stalled());

    let guard = registry.begin("tab-7");
    let first_token = guard.token();
    let first = tokio::spawn({
        let provider = provider.clone();
        async move {
            let mut options = options(128_000);
            options.cancel = first_token;
            summarize(provider.as_ref(), &article(200), &options).await
        }
    });

    // Let the first invocation reach its provider call, then start a
    // second one for the same key.
    tokio::task::yield_now().await;
    let _second = registry.begin("tab-7");

    let err = first.await.unwrap().unwrap_err();
    assert!(matches!(err, PrecisError::Cancelled));
}
