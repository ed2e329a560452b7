use crate::classify::{Classifier, group_by_topic};
use crate::error::Result;
use crate::extractors::Extractor;
use crate::record::{ExtractionRecord, FieldValue, RecordField, TopicGroups};
use async_trait::async_trait;
use std::sync::Arc;

/// Groups the record's saved posts by topic
pub struct ClassifyExtractor {
    classifier: Arc<Classifier>,
}

impl ClassifyExtractor {
    pub fn new(classifier: Arc<Classifier>) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl Extractor for ClassifyExtractor {
    fn name(&self) -> &'static str {
        "classify_posts"
    }

    fn field(&self) -> RecordField {
        RecordField::ClassifiedPosts
    }

    async fn extract(&self, record: &ExtractionRecord) -> Result<FieldValue> {
        if record.saved_posts.is_empty() {
            ::log::debug!("No saved posts to classify");
            return Ok(FieldValue::ClassifiedPosts(TopicGroups::new()));
        }

        let credentials = record.credentials();
        let results = self
            .classifier
            .classify_all(&record.saved_posts, credentials.as_ref())
            .await;
        Ok(FieldValue::ClassifiedPosts(group_by_topic(results)))
    }
}
