//! Fixed-order chain of extraction stages.

use crate::analysis::MediaAnalyzer;
use crate::browser::PostBrowser;
use crate::classify::Classifier;
use crate::error::Error;
use crate::extractors::{
    ClassifyExtractor, DocumentExtractor, Extractor, ImageExtractor, SavedPostsExtractor,
    SnapshotExtractor, TextExtractor, VideoExtractor,
};
use crate::record::ExtractionRecord;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// What happened to one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// The stage wrote this many items
    Extracted(usize),
    /// The stage succeeded with nothing to write
    Empty,
    /// The stage failed and its field was reset to empty
    Failed(String),
}

/// Runs one stage against the record, isolating its failures.
///
/// Whatever happens, the stage's field is written exactly once: with the
/// extracted value on success, with the field's empty form on failure or
/// timeout.
#[derive(Debug, Clone)]
pub struct StageRunner {
    stage_timeout: Duration,
}

impl StageRunner {
    pub fn new(stage_timeout: Duration) -> Self {
        Self { stage_timeout }
    }

    pub async fn run(&self, stage: &dyn Extractor, record: &mut ExtractionRecord) -> StageOutcome {
        let field = stage.field();

        let result = match timeout(self.stage_timeout, stage.extract(record)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(self.stage_timeout.as_secs())),
        };

        match result {
            Ok(value) if value.field() == field => {
                let count = value.item_count();
                record.write(value);
                if count == 0 {
                    ::log::info!("[{}] no {} found for {}", stage.name(), field.label(), record.url);
                    StageOutcome::Empty
                } else {
                    ::log::info!("[{}] extracted {} {} item(s)", stage.name(), count, field.label());
                    StageOutcome::Extracted(count)
                }
            }
            Ok(value) => {
                let reason = format!("returned {} instead of {}", value.field().label(), field.label());
                ::log::error!("[{}] {}", stage.name(), reason);
                record.write(field.empty());
                StageOutcome::Failed(reason)
            }
            Err(e) => {
                ::log::warn!("[{}] failed for {}: {}", stage.name(), record.url, e);
                record.write(field.empty());
                StageOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Linear chain of stages fixed at construction.
pub struct Pipeline {
    stages: Vec<Arc<dyn Extractor>>,
    runner: StageRunner,
}

impl Pipeline {
    pub fn new(stages: Vec<Arc<dyn Extractor>>, runner: StageRunner) -> Self {
        Self { stages, runner }
    }

    /// `text → images → documents → videos`
    pub fn minimal(
        browser: Arc<dyn PostBrowser>,
        analyzer: Arc<dyn MediaAnalyzer>,
        runner: StageRunner,
    ) -> Self {
        Self::new(content_stages(browser, analyzer), runner)
    }

    /// `saved_posts → classify_posts → post_extract`, then the minimal chain
    pub fn extended(
        browser: Arc<dyn PostBrowser>,
        analyzer: Arc<dyn MediaAnalyzer>,
        classifier: Arc<Classifier>,
        runner: StageRunner,
    ) -> Self {
        let mut stages: Vec<Arc<dyn Extractor>> = vec![
            Arc::new(SavedPostsExtractor::new(browser.clone())),
            Arc::new(ClassifyExtractor::new(classifier)),
            Arc::new(SnapshotExtractor::new(browser.clone())),
        ];
        stages.extend(content_stages(browser, analyzer));
        Self::new(stages, runner)
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Runs every stage in order; a failed stage never stops the ones after it
    pub async fn run(&self, mut record: ExtractionRecord) -> ExtractionRecord {
        ::log::debug!("Running {} stages for {}", self.stages.len(), record.url);
        for stage in &self.stages {
            self.runner.run(stage.as_ref(), &mut record).await;
        }
        record
    }
}

fn content_stages(
    browser: Arc<dyn PostBrowser>,
    analyzer: Arc<dyn MediaAnalyzer>,
) -> Vec<Arc<dyn Extractor>> {
    vec![
        Arc::new(TextExtractor::new(browser.clone())),
        Arc::new(ImageExtractor::new(browser.clone(), analyzer.clone())),
        Arc::new(DocumentExtractor::new(browser.clone(), analyzer.clone())),
        Arc::new(VideoExtractor::new(browser, analyzer)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::record::{Credentials, FieldValue, PostSnapshot, RecordField};
    use crate::testing::{CountingGenerator, ScriptedBrowser, StubAnalyzer};
    use async_trait::async_trait;

    struct SlowStage;

    #[async_trait]
    impl Extractor for SlowStage {
        fn name(&self) -> &'static str {
            "slow"
        }

        fn field(&self) -> RecordField {
            RecordField::Text
        }

        async fn extract(&self, _record: &ExtractionRecord) -> Result<FieldValue> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(FieldValue::Text("late".to_string()))
        }
    }

    struct MislabelledStage;

    #[async_trait]
    impl Extractor for MislabelledStage {
        fn name(&self) -> &'static str {
            "mislabelled"
        }

        fn field(&self) -> RecordField {
            RecordField::Documents
        }

        async fn extract(&self, _record: &ExtractionRecord) -> Result<FieldValue> {
            Ok(FieldValue::Text("wrong".to_string()))
        }
    }

    fn runner() -> StageRunner {
        StageRunner::new(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_failing_collaborators_leave_empty_fields() {
        let pipeline = Pipeline::minimal(
            Arc::new(ScriptedBrowser::failing()),
            Arc::new(StubAnalyzer::failing()),
            runner(),
        );
        let mut record = ExtractionRecord::new("https://x/p");
        record.text = "stale".to_string();
        record.images = vec!["stale".to_string()];

        let record = pipeline.run(record).await;
        assert_eq!(record.text, "");
        assert!(record.images.is_empty());
        assert_eq!(record.documents, "");
        assert!(record.videos.is_empty());
    }

    #[tokio::test]
    async fn test_one_failed_stage_does_not_stop_the_rest() {
        let browser = ScriptedBrowser::new()
            .with_text("Body")
            .with_images(&["img"])
            .with_videos(&["vid"]);
        let analyzer = StubAnalyzer::new().failing_on("img");
        let pipeline = Pipeline::minimal(Arc::new(browser), Arc::new(analyzer), runner());

        let record = pipeline.run(ExtractionRecord::new("https://x/p")).await;
        assert_eq!(record.text, "Body");
        assert!(record.images.is_empty());
        assert_eq!(record.videos, vec!["text of vid".to_string()]);
    }

    #[tokio::test]
    async fn test_stage_timeout_writes_empty() {
        let runner = StageRunner::new(Duration::from_millis(20));
        let mut record = ExtractionRecord::new("u");
        record.text = "previous".to_string();
        let outcome = runner.run(&SlowStage, &mut record).await;
        assert!(matches!(outcome, StageOutcome::Failed(_)));
        assert_eq!(record.text, "");
    }

    #[tokio::test]
    async fn test_value_for_wrong_field_is_rejected() {
        let mut record = ExtractionRecord::new("u");
        let outcome = runner().run(&MislabelledStage, &mut record).await;
        assert!(matches!(outcome, StageOutcome::Failed(_)));
        assert_eq!(record.text, "");
        assert_eq!(record.documents, "");
    }

    #[tokio::test]
    async fn test_stage_order() {
        let browser: Arc<dyn PostBrowser> = Arc::new(ScriptedBrowser::new());
        let analyzer: Arc<dyn MediaAnalyzer> = Arc::new(StubAnalyzer::new());
        let minimal = Pipeline::minimal(browser.clone(), analyzer.clone(), runner());
        assert_eq!(minimal.stage_names(), vec!["text", "images", "documents", "videos"]);

        let classifier = Arc::new(Classifier::new(
            browser.clone(),
            Arc::new(CountingGenerator::replying("AI")),
        ));
        let extended = Pipeline::extended(browser, analyzer, classifier, runner());
        assert_eq!(
            extended.stage_names(),
            vec![
                "saved_posts",
                "classify_posts",
                "post_extract",
                "text",
                "images",
                "documents",
                "videos"
            ]
        );
    }

    #[tokio::test]
    async fn test_extended_without_credentials_still_runs_everything() {
        let generator = Arc::new(CountingGenerator::replying("AI"));
        let browser: Arc<dyn PostBrowser> = Arc::new(ScriptedBrowser::new().with_text("Body"));
        let classifier = Arc::new(Classifier::new(browser.clone(), generator.clone()));
        let pipeline = Pipeline::extended(browser, Arc::new(StubAnalyzer::new()), classifier, runner());

        let record = pipeline.run(ExtractionRecord::new("https://x/p")).await;
        assert!(record.saved_posts.is_empty());
        assert!(record.classified_posts.is_empty());
        assert_eq!(record.text, "Body");
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_extended_classifies_and_uses_snapshot() {
        let generator = Arc::new(CountingGenerator::replying("Career"));
        let browser: Arc<dyn PostBrowser> = Arc::new(
            ScriptedBrowser::new()
                .with_saved_posts(&["urn:li:activity:1", "urn:li:article:2"])
                .with_snapshot(PostSnapshot {
                    text: "Snapshot text".to_string(),
                    image_urls: vec!["inline-img".to_string()],
                    video_urls: Vec::new(),
                    document_manifest_url: None,
                }),
        );
        let classifier = Arc::new(Classifier::new(browser.clone(), generator.clone()));
        let pipeline = Pipeline::extended(browser, Arc::new(StubAnalyzer::new()), classifier, runner());

        let record = ExtractionRecord::new("https://x/p")
            .with_credentials(Some(&Credentials::new("me@x.com", "pw")));
        let record = pipeline.run(record).await;

        assert_eq!(record.saved_posts.len(), 2);
        assert_eq!(record.classified_posts["Career"].len(), 2);
        assert_eq!(record.text, "Snapshot text");
        assert_eq!(record.images, vec!["text of inline-img".to_string()]);
    }
}
