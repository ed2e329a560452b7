use crate::browser::PostBrowser;
use crate::error::Result;
use crate::extractors::Extractor;
use crate::record::{ExtractionRecord, FieldValue, RecordField};
use async_trait::async_trait;
use std::sync::Arc;

/// Post body text
pub struct TextExtractor {
    browser: Arc<dyn PostBrowser>,
}

impl TextExtractor {
    pub fn new(browser: Arc<dyn PostBrowser>) -> Self {
        Self { browser }
    }

    /// Text of the post at `record.url`, or the snapshot's text when the page
    /// shows none
    pub async fn extract_text(&self, record: &ExtractionRecord) -> Result<String> {
        let credentials = record.credentials();
        let lookup = self.browser.post_text(&record.url, credentials.as_ref()).await;

        match lookup {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) | Err(_) if !record.snapshot.text.is_empty() => {
                ::log::debug!("text: using the post snapshot");
                Ok(record.snapshot.text.clone())
            }
            Ok(_) => Ok(String::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Extractor for TextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn field(&self) -> RecordField {
        RecordField::Text
    }

    async fn extract(&self, record: &ExtractionRecord) -> Result<FieldValue> {
        self.extract_text(record).await.map(FieldValue::Text)
    }
}
