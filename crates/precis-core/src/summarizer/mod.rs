//! The summarization pipeline: prompts, parsing, streaming collection, and
//! the rolling-context engine.

pub mod chat;
mod collector;
mod engine;
pub mod json_repair;
mod options;
mod placeholders;
pub mod prompts;
mod response;
mod schema;

pub use engine::summarize;
pub use options::{ImageRef, Observer, SummarizeOptions};
pub use placeholders::{build_placeholders, replace_placeholders};
pub use prompts::{DetailLevel, FieldPolicy, LanguagePolicy, WordCountBucket};
pub use response::{coerce_extra_sections, parse_summary_response};
pub use schema::{response_schema, RESPONSE_SCHEMA_NAME};
