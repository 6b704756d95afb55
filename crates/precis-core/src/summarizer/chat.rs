//! Post-summary chat refinement.
//!
//! After a summary exists, the caller can keep a conversation going about
//! it. The current document is embedded in the system prompt as JSON; the
//! model replies with plain text, optionally carrying an updated summary
//! inside a ```json fence that the host extracts with the same repair
//! machinery as the main pipeline.

use tokio_util::sync::CancellationToken;

use crate::error::PrecisResult;
use crate::traits::{ChatOptions, ChatProvider};
use crate::types::{ChatMessage, ExtractedContent, ImageData, SummaryDocument};

/// Build the refinement system prompt embedding the current summary.
pub fn refinement_system_prompt(
    content: &ExtractedContent,
    summary: &SummaryDocument,
) -> PrecisResult<String> {
    let summary_json = serde_json::to_string_pretty(summary)
        .map_err(|e| crate::error::PrecisError::Internal(e.to_string()))?;

    Ok(format!(
        r#"You are a helpful assistant that helps refine and discuss content summaries.
The user has a summary of a {} titled "{}".

Current summary (JSON):
{}

Response format rules:
- If you need to UPDATE the summary, include the full updated JSON inside a ```json fenced code block.
- If you want to say something to the user (explanation, answer, comment), write it as plain text OUTSIDE the code block.
- You may include BOTH a text message and a JSON update in the same response, or just one of them.
- When updating the summary, always return the COMPLETE JSON object (all fields), not just the changed parts.
- Never wrap plain-text chat in a code block. Only use ```json for summary updates."#,
        content.content_type.label(),
        content.title,
        summary_json,
    ))
}

/// Send one refinement turn: the conversation so far plus the summary
/// context. Cached images from the original summarization may be re-attached
/// so the model keeps its visual context.
pub async fn refine(
    provider: &dyn ChatProvider,
    content: &ExtractedContent,
    summary: &SummaryDocument,
    conversation: &[ChatMessage],
    cached_images: &[ImageData],
    cancel: CancellationToken,
) -> PrecisResult<String> {
    let system = refinement_system_prompt(content, summary)?;

    let mut messages = Vec::with_capacity(conversation.len() + 1);
    messages.push(ChatMessage::system(system).with_cache_boundary());
    for (i, message) in conversation.iter().enumerate() {
        if i == 0 && !cached_images.is_empty() && provider.supports_vision() {
            messages.push(message.clone().with_images(cached_images.to_vec()));
        } else {
            messages.push(message.clone());
        }
    }

    let options = ChatOptions {
        cancel,
        ..Default::default()
    };
    provider.send_chat(&messages, &options).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refinement_prompt_embeds_summary_json() {
        let content = ExtractedContent {
            title: "A post".into(),
            ..Default::default()
        };
        let summary = SummaryDocument {
            tldr: "The gist.".into(),
            ..Default::default()
        };
        let prompt = refinement_system_prompt(&content, &summary).unwrap();
        assert!(prompt.contains("\"A post\""));
        assert!(prompt.contains("The gist."));
        assert!(prompt.contains("COMPLETE JSON object"));
    }
}
