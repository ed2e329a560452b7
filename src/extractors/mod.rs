//! Extraction stages.
//!
//! Each extractor reads the shared record, calls its collaborators and
//! returns the value for the one field it owns. Failures are returned, not
//! swallowed; [`crate::pipeline::StageRunner`] turns them into empty fields.

mod classify;
mod document;
mod image;
mod saved;
mod snapshot;
mod text;
mod video;

pub use classify::ClassifyExtractor;
pub use document::{DocumentExtractor, DocumentText};
pub use image::ImageExtractor;
pub use saved::SavedPostsExtractor;
pub use snapshot::SnapshotExtractor;
pub use text::TextExtractor;
pub use video::VideoExtractor;

use crate::analysis::{MediaAnalyzer, MediaKind};
use crate::error::{Error, Result};
use crate::record::{ExtractionRecord, FieldValue, RecordField};
use async_trait::async_trait;

/// One stage of the pipeline
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Stage name used in status lines
    fn name(&self) -> &'static str;

    /// Record field this stage writes
    fn field(&self) -> RecordField;

    async fn extract(&self, record: &ExtractionRecord) -> Result<FieldValue>;
}

/// Phase-A locators, falling back to what the snapshot stage saw.
///
/// A lookup error is only returned when the snapshot has nothing either.
fn locators_or_snapshot(
    stage: &str,
    lookup: Result<Vec<String>>,
    snapshot: &[String],
) -> Result<Vec<String>> {
    match lookup {
        Ok(urls) if !urls.is_empty() => Ok(urls),
        Ok(urls) if snapshot.is_empty() => Ok(urls),
        Err(e) if snapshot.is_empty() => Err(e),
        Ok(_) => {
            ::log::debug!("{}: using {} locators from the post snapshot", stage, snapshot.len());
            Ok(snapshot.to_vec())
        }
        Err(e) => {
            ::log::warn!("{}: lookup failed ({}), using the post snapshot", stage, e);
            Ok(snapshot.to_vec())
        }
    }
}

/// Phase B: analyze each locator in order.
///
/// Items that fail or come back blank are skipped. When every item fails the
/// first error is returned.
async fn analyze_all(
    analyzer: &dyn MediaAnalyzer,
    kind: MediaKind,
    locators: &[String],
) -> Result<Vec<String>> {
    let mut texts = Vec::with_capacity(locators.len());
    let mut first_error: Option<Error> = None;

    for (index, locator) in locators.iter().enumerate() {
        match analyzer.analyze(kind, locator).await {
            Ok(text) if !text.trim().is_empty() => texts.push(text),
            Ok(_) => ::log::debug!("{:?} {} produced no text", kind, index + 1),
            Err(e) => {
                ::log::warn!("{:?} {} of {} failed: {}", kind, index + 1, locators.len(), e);
                first_error.get_or_insert(e.into());
            }
        }
    }

    match first_error {
        Some(e) if texts.is_empty() && !locators.is_empty() => Err(e),
        _ => Ok(texts),
    }
}
