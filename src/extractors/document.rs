use crate::analysis::{MediaAnalyzer, MediaKind};
use crate::browser::PostBrowser;
use crate::error::Result;
use crate::extractors::{Extractor, analyze_all};
use crate::record::{ExtractionRecord, FieldValue, RecordField};
use async_trait::async_trait;
use std::sync::Arc;

/// OCR output of a document carousel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentText {
    /// All pages joined with a single space
    Combined(String),
    /// One entry per page, in page order
    Pages(Vec<String>),
}

impl DocumentText {
    fn empty(combine_pages: bool) -> Self {
        if combine_pages {
            DocumentText::Combined(String::new())
        } else {
            DocumentText::Pages(Vec::new())
        }
    }

    pub fn into_combined(self) -> String {
        match self {
            DocumentText::Combined(text) => text,
            DocumentText::Pages(pages) => pages.join(" "),
        }
    }
}

/// OCR of an embedded document (PDF carousel).
///
/// The manifest URL comes from the page; the manifest lists page images that
/// are read one by one by the media analyzer.
pub struct DocumentExtractor {
    browser: Arc<dyn PostBrowser>,
    analyzer: Arc<dyn MediaAnalyzer>,
}

impl DocumentExtractor {
    pub fn new(browser: Arc<dyn PostBrowser>, analyzer: Arc<dyn MediaAnalyzer>) -> Self {
        Self { browser, analyzer }
    }

    pub async fn extract_document(
        &self,
        record: &ExtractionRecord,
        combine_pages: bool,
    ) -> Result<DocumentText> {
        let credentials = record.credentials();
        let manifest_url = match self
            .browser
            .document_manifest_url(&record.url, credentials.as_ref())
            .await
        {
            Ok(Some(url)) => Some(url),
            Ok(None) => record.snapshot.document_manifest_url.clone(),
            Err(e) => match &record.snapshot.document_manifest_url {
                Some(url) => {
                    ::log::warn!("documents: lookup failed ({}), using the post snapshot", e);
                    Some(url.clone())
                }
                None => return Err(e.into()),
            },
        };

        let Some(manifest_url) = manifest_url else {
            return Ok(DocumentText::empty(combine_pages));
        };

        let pages = self.browser.document_pages(&manifest_url).await?;
        if pages.is_empty() {
            ::log::debug!("Document manifest for {} lists no pages", record.url);
            return Ok(DocumentText::empty(combine_pages));
        }

        ::log::debug!("Reading {} document pages from {}", pages.len(), record.url);
        let texts = analyze_all(self.analyzer.as_ref(), MediaKind::DocumentPage, &pages).await?;

        Ok(if combine_pages {
            DocumentText::Combined(texts.join(" "))
        } else {
            DocumentText::Pages(texts)
        })
    }
}

#[async_trait]
impl Extractor for DocumentExtractor {
    fn name(&self) -> &'static str {
        "documents"
    }

    fn field(&self) -> RecordField {
        RecordField::Documents
    }

    async fn extract(&self, record: &ExtractionRecord) -> Result<FieldValue> {
        let document = self.extract_document(record, true).await?;
        Ok(FieldValue::Documents(document.into_combined()))
    }
}
