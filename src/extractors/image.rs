use crate::analysis::{MediaAnalyzer, MediaKind};
use crate::browser::PostBrowser;
use crate::error::Result;
use crate::extractors::{Extractor, analyze_all, locators_or_snapshot};
use crate::record::{ExtractionRecord, FieldValue, RecordField};
use async_trait::async_trait;
use std::sync::Arc;

/// OCR of the post's images.
///
/// Collects image URLs from the page, then has each one read by the media
/// analyzer. No analysis happens when the post has no images.
pub struct ImageExtractor {
    browser: Arc<dyn PostBrowser>,
    analyzer: Arc<dyn MediaAnalyzer>,
}

impl ImageExtractor {
    pub fn new(browser: Arc<dyn PostBrowser>, analyzer: Arc<dyn MediaAnalyzer>) -> Self {
        Self { browser, analyzer }
    }
}

#[async_trait]
impl Extractor for ImageExtractor {
    fn name(&self) -> &'static str {
        "images"
    }

    fn field(&self) -> RecordField {
        RecordField::Images
    }

    async fn extract(&self, record: &ExtractionRecord) -> Result<FieldValue> {
        let credentials = record.credentials();
        let lookup = self
            .browser
            .image_urls(&record.url, credentials.as_ref())
            .await
            .map_err(Into::into);
        let urls = locators_or_snapshot(self.name(), lookup, &record.snapshot.image_urls)?;

        if urls.is_empty() {
            return Ok(FieldValue::Images(Vec::new()));
        }

        ::log::debug!("Analyzing {} images from {}", urls.len(), record.url);
        let texts = analyze_all(self.analyzer.as_ref(), MediaKind::Image, &urls).await?;
        Ok(FieldValue::Images(texts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedBrowser, StubAnalyzer};

    #[tokio::test]
    async fn test_no_images_skips_analysis() {
        let analyzer = Arc::new(StubAnalyzer::new());
        let extractor = ImageExtractor::new(Arc::new(ScriptedBrowser::new()), analyzer.clone());
        let value = extractor.extract(&ExtractionRecord::new("https://x/p")).await.unwrap();
        assert_eq!(value, FieldValue::Images(vec![]));
        assert_eq!(analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn test_each_image_analyzed_in_order() {
        let browser = ScriptedBrowser::new().with_images(&["img1", "img2"]);
        let analyzer = Arc::new(StubAnalyzer::new());
        let extractor = ImageExtractor::new(Arc::new(browser), analyzer.clone());
        let value = extractor.extract(&ExtractionRecord::new("https://x/p")).await.unwrap();
        assert_eq!(
            value,
            FieldValue::Images(vec!["text of img1".to_string(), "text of img2".to_string()])
        );
        assert_eq!(analyzer.calls(), 2);
    }

    #[tokio::test]
    async fn test_uses_snapshot_images_when_viewer_is_empty() {
        let analyzer = Arc::new(StubAnalyzer::new());
        let extractor = ImageExtractor::new(Arc::new(ScriptedBrowser::new()), analyzer.clone());
        let mut record = ExtractionRecord::new("https://x/p");
        record.snapshot.image_urls = vec!["inline".to_string()];
        let value = extractor.extract(&record).await.unwrap();
        assert_eq!(value, FieldValue::Images(vec!["text of inline".to_string()]));
    }
}
