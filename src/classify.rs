//! Topic classification of saved posts.

use crate::analysis::TextGenerator;
use crate::analysis::prompts::{CLASSIFY_PROMPT, render};
use crate::browser::PostBrowser;
use crate::extractors::TextExtractor;
use crate::parsers::text::{first_non_empty_line, truncate_chars};
use crate::record::{ClassificationResult, Credentials, ExtractionRecord, SavedPost, TopicGroups};
use std::sync::Arc;

/// Characters of post text sent to the model
pub const CLASSIFY_TEXT_CHARS: usize = 2000;

/// Characters of post text kept as the description
pub const DESCRIPTION_CHARS: usize = 300;

pub const NO_CONTENT: &str = "No content found.";

pub const UNKNOWN_TOPIC: &str = "Unknown";

/// Assigns one free-form topic label to each saved post
pub struct Classifier {
    text: TextExtractor,
    generator: Arc<dyn TextGenerator>,
}

impl Classifier {
    pub fn new(browser: Arc<dyn PostBrowser>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            text: TextExtractor::new(browser),
            generator,
        }
    }

    /// Classifies every post in order. A post whose text or topic cannot be
    /// fetched still gets a result.
    pub async fn classify_all(
        &self,
        posts: &[SavedPost],
        credentials: Option<&Credentials>,
    ) -> Vec<ClassificationResult> {
        let mut results = Vec::with_capacity(posts.len());
        for (index, post) in posts.iter().enumerate() {
            ::log::info!("Classifying saved post {} of {}: {}", index + 1, posts.len(), post.urn);
            results.push(self.classify(post, credentials).await);
        }
        results
    }

    pub async fn classify(
        &self,
        post: &SavedPost,
        credentials: Option<&Credentials>,
    ) -> ClassificationResult {
        let text = self.post_text(post, credentials).await;

        let prompt = render(CLASSIFY_PROMPT, &[("content", text.as_str())]);
        let topic = match self.generator.generate(&prompt).await {
            Ok(response) => topic_label(&response),
            Err(e) => {
                ::log::warn!("Classification of post {} failed: {}", post.id, e);
                UNKNOWN_TOPIC.to_string()
            }
        };

        ClassificationResult {
            id: post.id,
            urn: post.urn.clone(),
            url: post.url.clone(),
            description: truncate_chars(&text, DESCRIPTION_CHARS).to_string(),
            topic,
        }
    }

    async fn post_text(&self, post: &SavedPost, credentials: Option<&Credentials>) -> String {
        if post.url.is_empty() {
            return NO_CONTENT.to_string();
        }

        let record = ExtractionRecord::new(post.url.clone()).with_credentials(credentials);
        match self.text.extract_text(&record).await {
            Ok(text) if !text.is_empty() => truncate_chars(&text, CLASSIFY_TEXT_CHARS).to_string(),
            Ok(_) => NO_CONTENT.to_string(),
            Err(e) => {
                ::log::warn!("Could not fetch text of saved post {}: {}", post.id, e);
                NO_CONTENT.to_string()
            }
        }
    }
}

/// First non-empty line of the model's answer, or `Unknown`
pub fn topic_label(response: &str) -> String {
    first_non_empty_line(response)
        .map(|line| line.trim_matches(|c: char| c == '"' || c == '\'' || c == '*').trim())
        .filter(|line| !line.is_empty())
        .unwrap_or(UNKNOWN_TOPIC)
        .to_string()
}

/// Groups results by topic; topics keep first-seen order and each group
/// keeps input order
pub fn group_by_topic(results: Vec<ClassificationResult>) -> TopicGroups {
    let mut groups = TopicGroups::new();
    for result in results {
        groups.entry(result.topic.clone()).or_default().push(result);
    }
    groups
}
