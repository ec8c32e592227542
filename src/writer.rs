//! Script writing through the generative model.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::GenerationError;
use crate::failover::FailoverInvoker;

/// Title and narration produced by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterDraft {
    #[serde(deserialize_with = "non_blank")]
    pub title: String,
    #[serde(deserialize_with = "non_blank")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footage_keyword: Option<String>,
}

fn non_blank<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(serde::de::Error::custom("field must not be blank"));
    }
    Ok(trimmed.to_string())
}

const OUTPUT_CONTRACT: &str = r#"Output format MUST be a single raw JSON object, nothing else:
{"title": "...", "content": "...", "footage_keyword": "..."}
- "title": a short, very catchy clickbait video title.
- "content": the narration script, detailed and educational, written to be read aloud.
- "footage_keyword": two or three English words describing stock footage that fits the video."#;

pub fn keyword_prompt(keyword: &str) -> String {
    format!(
        "You are a writer of viral video content. Based on the keyword \"{}\", write a video title \
         and a long, detailed, educational narration.\n{}",
        keyword.trim(),
        OUTPUT_CONTRACT
    )
}

pub fn youtube_prompt(url: &str) -> String {
    format!(
        "Analyze this YouTube video: {}. Recreate it as a new short video with a fresh narration \
         in your own words.\n{}",
        url.trim(),
        OUTPUT_CONTRACT
    )
}

/// Drafts a title and narration for `keyword`.
pub async fn write_from_keyword(
    invoker: &FailoverInvoker,
    keyword: &str,
) -> Result<WriterDraft, GenerationError> {
    invoker.generate_json(&keyword_prompt(keyword)).await
}

/// Drafts a fresh narration for a YouTube link.
pub async fn write_from_youtube(
    invoker: &FailoverInvoker,
    url: &str,
) -> Result<WriterDraft, GenerationError> {
    invoker.generate_json(&youtube_prompt(url)).await
}
