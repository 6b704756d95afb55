//! Error types for precis operations.
//!
//! The pipeline distinguishes terminal signals (conversational text,
//! no-content, image requests, cancellation) from transient failures that
//! the retry loop may attempt again. Signals are first-class variants here
//! rather than sentinel strings so callers can match on them.

use thiserror::Error;

/// Result type alias for precis operations.
pub type PrecisResult<T> = Result<T, PrecisError>;

/// Main error type for all precis operations.
#[derive(Error, Debug)]
pub enum PrecisError {
    /// The summarization was cancelled by the caller.
    #[error("Summarization cancelled")]
    Cancelled,

    /// The model answered in prose instead of structured JSON (refusal,
    /// clarifying question, or the user asked to chat instead of summarize).
    #[error("Model returned a text response")]
    TextResponse { text: String },

    /// The model judged the page to have nothing worth summarizing.
    #[error("No meaningful content: {reason}")]
    NoContent { reason: String },

    /// The model asked for additional image URLs before summarizing.
    #[error("Model requested {} additional image(s)", urls.len())]
    ImageRequest { urls: Vec<String> },

    /// Provider returned a non-2xx HTTP response. Raw status and body are
    /// preserved for classification and for readable error extraction.
    #[error("Provider error ({status}): {body}")]
    Provider { status: u16, body: String },

    /// Network-level failure before or during a provider call.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Response body could not be decoded into the expected wire shape.
    #[error("Parse error: {message}")]
    Parse { message: String },

    /// Configuration error (missing credential, unknown provider, bad URL).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Programming-contract violation (e.g. an empty chunk sequence).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PrecisError {
    /// Create a provider error from an HTTP status and raw body.
    pub fn provider(status: u16, body: impl Into<String>) -> Self {
        Self::Provider {
            status,
            body: body.into(),
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a conversational-text signal.
    pub fn text_response(text: impl Into<String>) -> Self {
        Self::TextResponse { text: text.into() }
    }

    /// Create a no-content signal.
    pub fn no_content(reason: impl Into<String>) -> Self {
        Self::NoContent {
            reason: reason.into(),
        }
    }

    /// Whether the retry loop may attempt this failure again.
    ///
    /// Terminal signals and cancellation propagate immediately; everything
    /// else (network failures, provider errors, undecodable bodies) is
    /// considered transient up to the retry limit.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Cancelled
                | Self::TextResponse { .. }
                | Self::NoContent { .. }
                | Self::ImageRequest { .. }
                | Self::Configuration(_)
        )
    }
}

impl From<reqwest::Error> for PrecisError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

/// Extract a readable message from a provider error body.
///
/// Provider error bodies are usually JSON like
/// `{"error": {"message": "..."}}`; surface the message when present,
/// otherwise return the raw text.
pub fn extract_api_error(raw: &str) -> String {
    let start = match raw.find('{') {
        Some(i) => i,
        None => return raw.to_string(),
    };
    let end = match raw.rfind('}') {
        Some(i) => i,
        None => return raw.to_string(),
    };
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(&raw[start..=end]) {
        let msg = value
            .pointer("/error/message")
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str());
        if let Some(msg) = msg {
            return msg.to_string();
        }
    }
    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_are_not_retryable() {
        assert!(!PrecisError::Cancelled.is_retryable());
        assert!(!PrecisError::text_response("hi").is_retryable());
        assert!(!PrecisError::no_content("login page").is_retryable());
        assert!(!PrecisError::ImageRequest { urls: vec![] }.is_retryable());
    }

    #[test]
    fn test_transient_failures_are_retryable() {
        assert!(PrecisError::provider(500, "upstream died").is_retryable());
        assert!(PrecisError::network("connection reset").is_retryable());
        assert!(PrecisError::parse("bad frame").is_retryable());
    }

    #[test]
    fn test_provider_error_preserves_status_and_body() {
        let err = PrecisError::provider(429, "slow down");
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("slow down"));
    }

    #[test]
    fn test_extract_api_error_from_json_body() {
        let raw = r#"API error (400): {"error": {"message": "invalid model"}}"#;
        assert_eq!(extract_api_error(raw), "invalid model");
    }

    #[test]
    fn test_extract_api_error_passthrough() {
        assert_eq!(extract_api_error("plain failure"), "plain failure");
    }
}
