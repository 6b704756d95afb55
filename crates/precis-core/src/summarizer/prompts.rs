//! Prompt assembly and summarization policy tables.
//!
//! Everything here is a pure function of its inputs (the date is passed in)
//! so a prompt can be rebuilt byte-for-byte for logging and debugging.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::summarizer::options::ImageRef;
use crate::types::{ContentType, ExtractedComment, ExtractedContent};

/// How thorough the summary should be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DetailLevel {
    Brief,
    #[default]
    Standard,
    Detailed,
}

/// Target-language policy for the emitted summary.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LanguagePolicy {
    /// Respond in the source content's language.
    #[default]
    Auto,
    /// Always respond in this language (ISO 639-1 code).
    Fixed(String),
    /// Respond in `target`, except when the source is one of `except` —
    /// then keep the source language.
    FixedExcept { target: String, except: Vec<String> },
}

/// Word-count bucket tuning target lengths and optional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordCountBucket {
    /// Under 500 words.
    Short,
    /// 500 to 3000 words.
    Medium,
    /// Over 3000 words.
    Long,
}

impl WordCountBucket {
    pub fn from_word_count(words: u32) -> Self {
        if words < 500 {
            WordCountBucket::Short
        } else if words <= 3_000 {
            WordCountBucket::Medium
        } else {
            WordCountBucket::Long
        }
    }
}

/// Which fields the prompt requests and at what target sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPolicy {
    pub tldr_sentences: (u8, u8),
    pub takeaways: (u8, u8),
    pub request_quotes: bool,
    pub request_pros_cons: bool,
    pub request_fact_check: bool,
    pub request_extra_sections: bool,
}

/// Resolve the field policy for a detail level, word-count bucket, and
/// content type.
///
/// Short content gets the compact treatment regardless of detail level;
/// code-hosting pages never get quotes (a status line stands in for them).
pub fn field_policy(
    detail: DetailLevel,
    bucket: WordCountBucket,
    content_type: ContentType,
) -> FieldPolicy {
    let takeaways = match (bucket, detail) {
        (WordCountBucket::Short, _) => (3, 5),
        (_, DetailLevel::Brief) => (3, 5),
        (_, DetailLevel::Standard) => (5, 7),
        (_, DetailLevel::Detailed) => (7, 10),
    };
    let tldr_sentences = match (bucket, detail) {
        (WordCountBucket::Short, _) => (1, 2),
        (_, DetailLevel::Detailed) => (3, 4),
        _ => (2, 3),
    };
    let long_form = bucket != WordCountBucket::Short;

    FieldPolicy {
        tldr_sentences,
        takeaways,
        request_quotes: long_form && content_type != ContentType::CodeHosting,
        request_pros_cons: long_form,
        request_fact_check: long_form,
        request_extra_sections: bucket == WordCountBucket::Long
            || (long_form && detail == DetailLevel::Detailed),
    }
}

/// ISO 639-1 code → display name, for the language instruction.
fn language_name(code: &str) -> &str {
    match code {
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "de" => "German",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "zh" => "Chinese",
        "ja" => "Japanese",
        "ko" => "Korean",
        other => other,
    }
}

fn language_instruction(policy: &LanguagePolicy) -> String {
    match policy {
        LanguagePolicy::Auto => {
            "Respond in the same language as the source content. Match the content language exactly.".to_string()
        }
        LanguagePolicy::Fixed(target) => format!("Respond in {}.", language_name(target)),
        LanguagePolicy::FixedExcept { target, except } => {
            let except_names: Vec<&str> = except.iter().map(|c| language_name(c)).collect();
            format!(
                "LANGUAGE RULE: If the source content is written in {}, you MUST respond in that same language - do NOT translate it. For all other source languages, translate and respond in {}.",
                except_names.join(" or "),
                language_name(target)
            )
        }
    }
}

fn detail_instruction(policy: &FieldPolicy) -> String {
    format!(
        "Keep the TLDR to {}-{} sentences and provide {}-{} key takeaways. Each field must add unique value - never pad or restate the same points across fields, and the summary must be shorter than the original content.",
        policy.tldr_sentences.0, policy.tldr_sentences.1, policy.takeaways.0, policy.takeaways.1
    )
}

/// Textual description of the response structure, used when the provider
/// cannot enforce a schema natively.
fn schema_as_text() -> &'static str {
    r#"You MUST respond with a single valid JSON object (no markdown code fences, just raw JSON) of this shape:
{
  "text": "Conversational reply when no summary is produced; empty string otherwise.",
  "summary": {
    "tldr": "A concise overview of the entire content.",
    "keyTakeaways": ["**Bold label** - explanation", ...],
    "summary": "A comprehensive summary of the content.",
    "notableQuotes": ["Direct quote 1", ...],
    "conclusion": "The main conclusion or final thoughts.",
    "prosAndCons": { "pros": ["..."], "cons": ["..."] },
    "factCheck": "Critical analysis of factual accuracy, or null",
    "commentsHighlights": ["Notable comment 1", ...],
    "extraSections": [{"title": "Section Title", "content": "markdown body"}],
    "relatedTopics": ["Related topic 1", ...],
    "tags": ["tag1", "tag2", ...],
    "sourceLanguage": "xx",
    "summaryLanguage": "xx",
    "translatedTitle": "Title in summary language, or null",
    "inferredTitle": "Descriptive title, or null",
    "inferredAuthor": "Author name, or null",
    "inferredPublishDate": "YYYY-MM-DD, or null"
  }
}"#
}

/// Assemble the system prompt.
pub fn system_prompt(
    policy: &FieldPolicy,
    language: &LanguagePolicy,
    content_type: ContentType,
    today: NaiveDate,
    has_images: bool,
    schema_in_prompt: bool,
) -> String {
    let mut prompt = format!(
        "You are an expert content summarizer. Today's date is {}. {}\n\n{}\n\n",
        today.format("%Y-%m-%d"),
        language_instruction(language),
        detail_instruction(policy),
    );

    if schema_in_prompt {
        prompt.push_str(schema_as_text());
    } else {
        prompt.push_str("Respond with a single JSON object conforming to the response schema provided with this request.");
    }

    prompt.push_str("\n\nGuidelines:\n");

    if content_type == ContentType::CodeHosting {
        prompt.push_str("- \"notableQuotes\" must be an empty array for repository pages. Instead, open the \"summary\" field with a single status line: **Status:** followed by the project's key signals (stars, forks, last activity, license) separated by middle dots.\n");
    } else if policy.request_quotes {
        prompt.push_str("- \"notableQuotes\" should be actual quotes from the text (empty array if none exist). When the summary language differs from the source language, append a translation in parentheses after each quote.\n");
    } else {
        prompt.push_str("- Keep \"notableQuotes\" an empty array for this content.\n");
    }

    if policy.request_pros_cons {
        prompt.push_str("- \"prosAndCons\" is optional - include it only if the content discusses trade-offs, comparisons, or evaluations. Set to null if not applicable.\n");
    } else {
        prompt.push_str("- Set \"prosAndCons\" to null.\n");
    }

    if policy.request_fact_check {
        prompt.push_str("- \"factCheck\" - include ONLY when the content makes specific, verifiable factual claims that matter (statistics, scientific claims, historical assertions). Set to null for opinion, personal narrative, tutorials, or creative writing. When included, use one markdown bullet per claim: **\"Claim\"** - icon verdict, then a brief explanation. Icons: verified (only for indisputable public facts), contested (the default for any claim where sources have a stake), false (only with definitive contradicting knowledge), unverifiable (no information either way - never mark recent unknown events as false).\n");
    } else {
        prompt.push_str("- Set \"factCheck\" to null.\n");
    }

    prompt.push_str("- \"commentsHighlights\" is optional - include it only if user comments are provided. Set to null if not applicable.\n- \"relatedTopics\" should suggest 3-5 topics a reader of this content might explore next.\n- \"tags\" should be 3-7 short, lowercase tags.\n- \"sourceLanguage\" and \"summaryLanguage\" must be ISO 639-1 codes of the original content language and of the language you actually wrote the summary in.\n- \"translatedTitle\" - when sourceLanguage differs from summaryLanguage, the title translated to the summary language; otherwise null.\n- \"inferredTitle\", \"inferredAuthor\", \"inferredPublishDate\" - only when the corresponding metadata below is marked MISSING, infer it from the content; otherwise null.\n");

    if policy.request_extra_sections {
        prompt.push_str("- \"extraSections\" is optional - use it for supplementary sections that don't fit the standard fields (cheat sheets, reference tables). Set to null if not applicable.\n");
    } else {
        prompt.push_str("- Set \"extraSections\" to null.\n");
    }

    prompt.push_str("- All text fields support markdown. Start each key takeaway with \"**Bold label** - \" and bold key terms, names, and statistics throughout. Break a long \"summary\" into sections with ### subheadings.\n- The content may contain mature or sensitive topics. Summarize it fully and accurately in a clinical tone - never refuse.\n- If the provided text contains no meaningful content - a login page, error page, cookie banner, navigation menu, or other interface boilerplate - respond with ONLY: {\"noContent\": true, \"reason\": \"Brief explanation\"}.\n- If the user's additional instructions ask you NOT to summarize and only to chat, respect that and respond with ONLY: {\"noSummary\": true, \"message\": \"Your conversational response\"}.\n");

    if has_images {
        prompt.push_str("\nImage analysis:\n- Images from the page are attached. Analyze them as part of the content and reference them by their placeholder IDs, e.g. ![description]({{IMG_1}}) - never by raw URL.\n- If image URLs listed in the text are essential to understanding but were NOT attached, you may return \"requestedImages\": [\"url1\", ...] (max 3) alongside the normal JSON. The system will fetch them and re-run. Do not request images the attached set already covers.\n");
    }

    prompt
}

/// Append the verbatim user instruction block, declared highest priority.
pub fn with_user_instructions(mut system: String, user_instructions: Option<&str>) -> String {
    if let Some(instructions) = user_instructions {
        system.push_str(&format!(
            "\n\nAdditional user instructions (HIGHEST PRIORITY - these override any prior rules above): {instructions}"
        ));
    }
    system
}

/// Build the first (or only) chunk's user prompt from content metadata.
pub fn summarization_prompt(content: &ExtractedContent) -> String {
    let mut prompt = format!("Summarize the following {}.\n\n", content.content_type.label());

    prompt.push_str(&format!(
        "**Title:** {}\n",
        missing_or(&content.title, "MISSING - infer a concise, descriptive title from the content")
    ));
    prompt.push_str(&format!("**URL:** {}\n", content.url));
    prompt.push_str(&format!(
        "**Author:** {}\n",
        missing_or(
            content.author.as_deref().unwrap_or(""),
            "MISSING - try to infer from content"
        )
    ));
    prompt.push_str(&format!(
        "**Published:** {}\n",
        missing_or(
            content.publish_date.as_deref().unwrap_or(""),
            "MISSING - try to infer from content"
        )
    ));

    if let Some(channel) = &content.channel_name {
        prompt.push_str(&format!("**Channel:** {channel}\n"));
    }
    if let Some(duration) = &content.duration {
        prompt.push_str(&format!("**Duration:** {duration}\n"));
    }
    if let Some(views) = &content.view_count {
        prompt.push_str(&format!("**Views:** {views}\n"));
    }
    if content.content_type == ContentType::Video {
        prompt.push_str("\n**IMPORTANT - Timestamp Links:** When referencing specific moments, use clickable timestamp links in this exact format: [MM:SS]({{VIDEO_URL}}&t=SECONDS). Use them for key moments and notable quotes where they add genuine value.\n");
    }
    if let Some(subreddit) = &content.subreddit {
        prompt.push_str(&format!("**Subreddit:** r/{subreddit}\n"));
    }
    if let Some(score) = content.post_score {
        prompt.push_str(&format!("**Post Score:** {score}\n"));
    }
    if let Some(count) = content.comment_count {
        prompt.push_str(&format!("**Comments:** {count}\n"));
    }
    prompt.push_str(&format!("**Word count:** {}\n\n", content.word_count));

    if let Some(description) = &content.description {
        prompt.push_str(&format!("**Description:**\n{description}\n\n"));
    }

    if !content.file_map.is_empty() {
        prompt.push_str("**Source files (reference by placeholder, e.g. [name]({{FILE_1}})):**\n");
        let mut keys: Vec<&String> = content.file_map.keys().collect();
        keys.sort();
        for key in keys {
            prompt.push_str(&format!("- {{{{FILE_{key}}}}}\n"));
        }
        prompt.push('\n');
    }

    if content.is_discussion() {
        prompt.push_str("**IMPORTANT - Discussion Mode:** This is a community discussion; the comments ARE the primary content. Synthesize the key themes and arguments into a coherent narrative, identify consensus and disagreement, note the overall sentiment, and use \"commentsHighlights\" for the most notable individual contributions. \"notableQuotes\" should quote commenters, not just the original poster.\n\n");
    }

    prompt.push_str(&format!("---\n\n**Content:**\n\n{}\n", content.content));

    // Discussion comments are already embedded in the content body.
    if !content.is_discussion() && !content.comments.is_empty() {
        prompt.push_str(&format_comments(&content.comments));
    }

    prompt
}

fn missing_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}

/// Format the comment block appended to the final prompt. Capped at 20.
pub fn format_comments(comments: &[ExtractedComment]) -> String {
    let mut block = String::from("\n---\n\n**User Comments:**\n\n");
    for comment in comments.iter().take(20) {
        let author = comment
            .author
            .as_deref()
            .map(|a| format!("**{a}**"))
            .unwrap_or_else(|| "Anonymous".to_string());
        let likes = comment
            .likes
            .map(|n| format!(" ({n} likes)"))
            .unwrap_or_default();
        block.push_str(&format!("- {author}{likes}: {}\n", comment.text));
    }
    block
}

/// List attached images by placeholder ID for the first chunk's prompt.
pub fn image_listing(images: &[ImageRef], thumbnail_url: Option<&str>) -> String {
    let mut listing = String::from(
        "\n\n**Attached images (use placeholder IDs for embeds, e.g. ![alt]({{IMG_1}})):**\n",
    );
    for (i, image) in images.iter().enumerate() {
        listing.push_str(&format!("{}. {{{{IMG_{}}}}}", i + 1, i + 1));
        if !image.alt.is_empty() {
            listing.push_str(&format!(" - \"{}\"", image.alt));
        }
        if thumbnail_url == Some(image.url.as_str()) {
            listing.push_str(" [THUMBNAIL]");
        }
        listing.push('\n');
    }
    listing
}

/// Carry-forward context prompt for chunks after the first.
pub fn rolling_context_prompt(previous_summary: &str) -> String {
    format!(
        "Here is a summary of the previous portion of the content. Use it as context for summarizing the next portion, then produce an updated combined summary.\n\n**Previous summary context:**\n{previous_summary}\n\n---\n\nNow continue summarizing the next portion below. Integrate it with the context above to produce a comprehensive summary."
    )
}

/// Instruction added on the final chunk only.
pub fn final_chunk_prompt() -> &'static str {
    "This is the FINAL portion of the content. Produce the complete, final structured JSON summary incorporating all previous context and this last section."
}
