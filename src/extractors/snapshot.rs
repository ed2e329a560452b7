use crate::browser::PostBrowser;
use crate::error::Result;
use crate::extractors::Extractor;
use crate::record::{ExtractionRecord, FieldValue, RecordField};
use async_trait::async_trait;
use std::sync::Arc;

/// Single visit to the post page capturing everything visible at once.
///
/// Runs before the content stages of the extended pipeline so they have
/// something to fall back on.
pub struct SnapshotExtractor {
    browser: Arc<dyn PostBrowser>,
}

impl SnapshotExtractor {
    pub fn new(browser: Arc<dyn PostBrowser>) -> Self {
        Self { browser }
    }
}

#[async_trait]
impl Extractor for SnapshotExtractor {
    fn name(&self) -> &'static str {
        "post_extract"
    }

    fn field(&self) -> RecordField {
        RecordField::Snapshot
    }

    async fn extract(&self, record: &ExtractionRecord) -> Result<FieldValue> {
        let credentials = record.credentials();
        let snapshot = self.browser.snapshot(&record.url, credentials.as_ref()).await?;
        Ok(FieldValue::Snapshot(snapshot))
    }
}
