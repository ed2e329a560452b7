//! Notes generation from aggregated post content.

use crate::analysis::TextGenerator;
use crate::analysis::prompts::{NOTES_PROMPT, render};
use crate::error::ModelError;
use crate::record::NotesArtifact;
use regex::Regex;
use std::sync::{Arc, LazyLock};

static LINE_BREAK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("static regex should be valid"));

static MARKUP_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<.*?>").expect("static regex should be valid"));

/// Strips markup that would break rendering: backticks, `<br>` variants
/// (turned into line breaks), any other `<...>` tag and `*` emphasis.
///
/// Applying it twice gives the same result as applying it once.
pub fn sanitize(text: &str) -> String {
    let text = text.replace('`', "");
    let text = LINE_BREAK_TAG.replace_all(&text, "\n");
    let text = MARKUP_TAG.replace_all(&text, "");
    let text = text.replace("**", "").replace('*', "");
    text.trim().to_string()
}

/// Placeholder notes for a post with nothing extracted
pub fn no_content_notes(post_id: &str) -> String {
    format!("Post {}: No content available.", post_id)
}

/// Turns aggregated content into structured notes with one model call
pub struct Summarizer {
    generator: Arc<dyn TextGenerator>,
}

impl Summarizer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Notes for one post. Empty content never reaches the model; a model
    /// failure is returned as is, without retrying.
    pub async fn summarize(&self, post_id: &str, aggregated: &str) -> Result<String, ModelError> {
        if aggregated.is_empty() {
            ::log::info!("Post {} has no content, skipping the model", post_id);
            return Ok(no_content_notes(post_id));
        }

        let cleaned = sanitize(aggregated);

        let prompt = render(
            NOTES_PROMPT,
            &[("post_id", post_id), ("combined_text", cleaned.as_str())],
        );
        ::log::debug!("Summarizing post {} ({} chars)", post_id, cleaned.chars().count());

        let response = self.generator.generate(&prompt).await?;
        Ok(sanitize(&response))
    }

    pub async fn notes_for(&self, post_id: &str, aggregated: &str) -> Result<NotesArtifact, ModelError> {
        let notes = self.summarize(post_id, aggregated).await?;
        Ok(NotesArtifact::new(post_id, notes))
    }
}
