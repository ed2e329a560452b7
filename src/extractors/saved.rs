use crate::browser::PostBrowser;
use crate::error::{BrowserError, Result};
use crate::extractors::Extractor;
use crate::record::{ExtractionRecord, FieldValue, RecordField};
use async_trait::async_trait;
use std::sync::Arc;

/// The logged-in account's saved posts
pub struct SavedPostsExtractor {
    browser: Arc<dyn PostBrowser>,
}

impl SavedPostsExtractor {
    pub fn new(browser: Arc<dyn PostBrowser>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Extractor for SavedPostsExtractor {
    fn name(&self) -> &'static str {
        "saved_posts"
    }

    fn field(&self) -> RecordField {
        RecordField::SavedPosts
    }

    async fn extract(&self, record: &ExtractionRecord) -> Result<FieldValue> {
        let credentials = record
            .credentials()
            .ok_or(BrowserError::MissingCredentials)?;
        let posts = self.browser.saved_posts(&credentials).await?;
        Ok(FieldValue::SavedPosts(posts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Credentials;
    use crate::testing::ScriptedBrowser;

    #[tokio::test]
    async fn test_missing_credentials_is_error() {
        let extractor = SavedPostsExtractor::new(Arc::new(ScriptedBrowser::new()));
        let result = extractor.extract(&ExtractionRecord::new("")).await;
        assert!(matches!(
            result,
            Err(crate::error::Error::Browser(BrowserError::MissingCredentials))
        ));
    }

    #[tokio::test]
    async fn test_lists_saved_posts() {
        let browser = ScriptedBrowser::new().with_saved_posts(&["urn:li:activity:1", "urn:li:activity:2"]);
        let extractor = SavedPostsExtractor::new(Arc::new(browser));
        let record = ExtractionRecord::new("").with_credentials(Some(&Credentials::new("a@b.c", "pw")));
        let value = extractor.extract(&record).await.unwrap();
        assert_eq!(value.item_count(), 2);
    }
}
