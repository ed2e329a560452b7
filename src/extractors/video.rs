use crate::analysis::{MediaAnalyzer, MediaKind};
use crate::browser::PostBrowser;
use crate::error::Result;
use crate::extractors::{Extractor, analyze_all, locators_or_snapshot};
use crate::record::{ExtractionRecord, FieldValue, RecordField};
use async_trait::async_trait;
use std::sync::Arc;

/// Scene and transcript analysis of the post's videos
pub struct VideoExtractor {
    browser: Arc<dyn PostBrowser>,
    analyzer: Arc<dyn MediaAnalyzer>,
}

impl VideoExtractor {
    pub fn new(browser: Arc<dyn PostBrowser>, analyzer: Arc<dyn MediaAnalyzer>) -> Self {
        Self { browser, analyzer }
    }
}

#[async_trait]
impl Extractor for VideoExtractor {
    fn name(&self) -> &'static str {
        "videos"
    }

    fn field(&self) -> RecordField {
        RecordField::Videos
    }

    async fn extract(&self, record: &ExtractionRecord) -> Result<FieldValue> {
        let credentials = record.credentials();
        let lookup = self
            .browser
            .video_sources(&record.url, credentials.as_ref())
            .await
            .map_err(Into::into);
        let sources = locators_or_snapshot(self.name(), lookup, &record.snapshot.video_urls)?;

        if sources.is_empty() {
            return Ok(FieldValue::Videos(Vec::new()));
        }

        ::log::debug!("Analyzing {} videos from {}", sources.len(), record.url);
        let texts = analyze_all(self.analyzer.as_ref(), MediaKind::Video, &sources).await?;
        Ok(FieldValue::Videos(texts))
    }
}
