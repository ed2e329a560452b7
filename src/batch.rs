//! Runs the pipeline over many posts and assembles the combined notes.

use crate::aggregate::aggregate;
use crate::browser::PostBrowser;
use crate::error::{ExportError, ModelError, Result};
use crate::export::{ExportFormat, NotesExporter};
use crate::pipeline::Pipeline;
use crate::record::{Credentials, ExtractionRecord, NotesArtifact, Post, combine_notes};
use crate::summarize::Summarizer;
use futures::future::join_all;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Result of one batch run
#[derive(Debug)]
pub struct BatchOutput {
    /// Combined document, notes in input order
    pub combined: String,
    pub artifacts: Vec<NotesArtifact>,
    /// Where the document was written, or why it was not
    pub export: std::result::Result<PathBuf, ExportError>,
}

pub struct BatchDriver {
    pipeline: Arc<Pipeline>,
    summarizer: Arc<Summarizer>,
    browser: Arc<dyn PostBrowser>,
    exporter: Arc<dyn NotesExporter>,
    max_concurrency: usize,
    post_timeout: Duration,
}

impl BatchDriver {
    pub fn new(
        pipeline: Arc<Pipeline>,
        summarizer: Arc<Summarizer>,
        browser: Arc<dyn PostBrowser>,
        exporter: Arc<dyn NotesExporter>,
    ) -> Self {
        Self {
            pipeline,
            summarizer,
            browser,
            exporter,
            max_concurrency: 1,
            post_timeout: Duration::from_secs(600),
        }
    }

    /// Posts processed at the same time (at least one)
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    /// Upper bound for the extraction of one post
    pub fn with_post_timeout(mut self, post_timeout: Duration) -> Self {
        self.post_timeout = post_timeout;
        self
    }

    /// Processes every post and exports the combined notes.
    ///
    /// A post that fails to summarize still gets a placeholder entry, so the
    /// combined document always has one section per input post. The combined
    /// text is returned even when exporting fails.
    pub async fn run(
        &self,
        posts: &[Post],
        credentials: Option<&Credentials>,
        format: ExportFormat,
        filename: &str,
    ) -> BatchOutput {
        ::log::info!(
            "Processing {} post(s) with concurrency {}",
            posts.len(),
            self.max_concurrency
        );
        self.prepare_session(credentials).await;

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let tasks = posts.iter().map(|post| {
            let semaphore = semaphore.clone();
            async move {
                let _permit = semaphore.acquire().await;
                match self.run_post(post, credentials).await {
                    Ok(artifact) => artifact,
                    Err(e) => {
                        ::log::error!("Summarizing post {} failed: {}", post.id, e);
                        NotesArtifact::new(
                            &post.id,
                            format!("Post {}: Notes unavailable ({})", post.id, e),
                        )
                    }
                }
            }
        });
        // join_all yields results in input order, whatever order they finish in
        let artifacts = join_all(tasks).await;

        let combined = combine_notes(&artifacts);
        let export = self.export(combined.clone(), format, filename).await;
        match &export {
            Ok(path) => ::log::info!("Combined notes saved to {}", path.display()),
            Err(e) => ::log::error!("Exporting combined notes failed: {}", e),
        }

        BatchOutput {
            combined,
            artifacts,
            export,
        }
    }

    /// Runs one post end to end and exports its notes on their own.
    ///
    /// Unlike [`BatchDriver::run`], a summarization or export failure is
    /// returned to the caller.
    pub async fn run_single(
        &self,
        post: &Post,
        credentials: Option<&Credentials>,
        format: ExportFormat,
        filename: &str,
    ) -> Result<(NotesArtifact, PathBuf)> {
        self.prepare_session(credentials).await;
        let artifact = self.run_post(post, credentials).await?;
        let path = self.export(artifact.to_string(), format, filename).await?;
        Ok((artifact, path))
    }

    /// Extract, aggregate and summarize one post.
    ///
    /// Extraction that exceeds the post timeout counts as extracting nothing.
    pub async fn run_post(
        &self,
        post: &Post,
        credentials: Option<&Credentials>,
    ) -> std::result::Result<NotesArtifact, ModelError> {
        let record = ExtractionRecord::new(&post.url).with_credentials(credentials);
        let record = match timeout(self.post_timeout, self.pipeline.run(record)).await {
            Ok(record) => record,
            Err(_) => {
                ::log::warn!(
                    "Post {} timed out after {}s, continuing with empty content",
                    post.id,
                    self.post_timeout.as_secs()
                );
                ExtractionRecord::new(&post.url)
            }
        };

        let aggregated = aggregate(&record);
        ::log::debug!("Post {} aggregated to {} chars", post.id, aggregated.len());
        self.summarizer.notes_for(&post.id, &aggregated).await
    }

    /// Refreshes the browser session once, before any post runs
    async fn prepare_session(&self, credentials: Option<&Credentials>) {
        if let Err(e) = self.browser.prepare_session(credentials).await {
            ::log::warn!("Could not prepare browser session: {}", e);
        }
    }

    async fn export(
        &self,
        combined: String,
        format: ExportFormat,
        filename: &str,
    ) -> std::result::Result<PathBuf, ExportError> {
        let exporter = self.exporter.clone();
        let filename = filename.to_string();
        tokio::task::spawn_blocking(move || exporter.export_notes(&combined, format, &filename))
            .await
            .map_err(|e| ExportError::Io(std::io::Error::other(e.to_string())))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::TextGenerator;
    use crate::error::Error;
    use crate::pipeline::StageRunner;
    use crate::testing::{CountingGenerator, ScriptedBrowser, StubAnalyzer};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingExporter {
        exported: Mutex<Vec<(String, ExportFormat, String)>>,
    }

    impl NotesExporter for RecordingExporter {
        fn export_notes(
            &self,
            combined: &str,
            format: ExportFormat,
            filename: &str,
        ) -> std::result::Result<PathBuf, ExportError> {
            self.exported
                .lock()
                .unwrap()
                .push((combined.to_string(), format, filename.to_string()));
            Ok(PathBuf::from(format!("{}.{}", filename, format.extension())))
        }
    }

    struct FailingExporter;

    impl NotesExporter for FailingExporter {
        fn export_notes(
            &self,
            _combined: &str,
            _format: ExportFormat,
            _filename: &str,
        ) -> std::result::Result<PathBuf, ExportError> {
            Err(ExportError::Pdf("disk full".to_string()))
        }
    }

    fn driver(
        browser: Arc<ScriptedBrowser>,
        generator: Arc<dyn TextGenerator>,
        exporter: Arc<dyn NotesExporter>,
    ) -> BatchDriver {
        let pipeline = Pipeline::minimal(
            browser.clone(),
            Arc::new(StubAnalyzer::new()),
            StageRunner::new(Duration::from_secs(5)),
        );
        BatchDriver::new(
            Arc::new(pipeline),
            Arc::new(Summarizer::new(generator)),
            browser,
            exporter,
        )
    }

    /// Replies with the extracted text found in the prompt
    fn echo_generator() -> Arc<CountingGenerator> {
        Arc::new(CountingGenerator::new(|prompt| {
            Ok(prompt
                .lines()
                .find(|line| line.starts_with("body "))
                .unwrap_or("none")
                .to_string())
        }))
    }

    fn posts() -> Vec<Post> {
        vec![
            Post::new("1", "https://x/1"),
            Post::new("2", "https://x/2"),
            Post::new("3", "https://x/3"),
        ]
    }

    #[tokio::test]
    async fn test_order_preserved_when_middle_post_is_slow() {
        let browser = Arc::new(
            ScriptedBrowser::new()
                .with_text_for("https://x/1", "body one")
                .with_text_for("https://x/2", "body two")
                .with_text_for("https://x/3", "body three")
                .with_delay("https://x/2", Duration::from_millis(100)),
        );
        let exporter = Arc::new(RecordingExporter::default());
        let driver = driver(browser, echo_generator(), exporter.clone()).with_max_concurrency(3);

        let output = driver
            .run(&posts(), None, ExportFormat::Pdf, "combined")
            .await;

        assert_eq!(
            output.combined,
            "# Post 1 Notes\nbody one\n\n# Post 2 Notes\nbody two\n\n# Post 3 Notes\nbody three"
        );
        assert_eq!(output.export.unwrap(), PathBuf::from("combined.pdf"));
        let exported = exporter.exported.lock().unwrap();
        assert_eq!(exported.len(), 1);
        assert_eq!(exported[0].0, output.combined);
    }

    #[tokio::test]
    async fn test_session_prepared_once_per_batch() {
        let browser = Arc::new(ScriptedBrowser::new().with_text("body x"));
        let driver = driver(
            browser.clone(),
            echo_generator(),
            Arc::new(RecordingExporter::default()),
        )
        .with_max_concurrency(2);

        let credentials = Credentials::new("me@x.com", "pw");
        driver
            .run(&posts(), Some(&credentials), ExportFormat::Excel, "n")
            .await;
        assert_eq!(browser.prepare_calls(), 1);
    }

    #[tokio::test]
    async fn test_post_timeout_gives_placeholder_notes() {
        let browser = Arc::new(
            ScriptedBrowser::new()
                .with_text("body slow")
                .with_delay("https://x/1", Duration::from_secs(2)),
        );
        let generator = echo_generator();
        let driver = driver(
            browser,
            generator.clone(),
            Arc::new(RecordingExporter::default()),
        )
        .with_post_timeout(Duration::from_millis(50));

        let output = driver
            .run(&[Post::new("1", "https://x/1")], None, ExportFormat::Pdf, "n")
            .await;
        assert_eq!(output.artifacts[0].notes, "Post 1: No content available.");
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_summarize_failure_does_not_stop_batch() {
        let browser = Arc::new(ScriptedBrowser::new().with_text("body x"));
        let driver = driver(
            browser,
            Arc::new(CountingGenerator::failing()),
            Arc::new(RecordingExporter::default()),
        );

        let output = driver.run(&posts(), None, ExportFormat::Pdf, "n").await;
        assert_eq!(output.artifacts.len(), 3);
        assert!(output.artifacts[1].notes.starts_with("Post 2: Notes unavailable"));
    }

    #[tokio::test]
    async fn test_combined_returned_when_export_fails() {
        let browser = Arc::new(ScriptedBrowser::new().with_text("body x"));
        let driver = driver(browser, echo_generator(), Arc::new(FailingExporter));

        let output = driver
            .run(&[Post::new("9", "https://x/9")], None, ExportFormat::Pdf, "n")
            .await;
        assert!(output.export.is_err());
        assert_eq!(output.combined, "# Post 9 Notes\nbody x");
    }

    #[tokio::test]
    async fn test_run_single_propagates_model_error() {
        let browser = Arc::new(ScriptedBrowser::new().with_text("body x"));
        let driver = driver(
            browser,
            Arc::new(CountingGenerator::failing()),
            Arc::new(RecordingExporter::default()),
        );

        let result = driver
            .run_single(&Post::new("1", "https://x/1"), None, ExportFormat::Pdf, "n")
            .await;
        assert!(matches!(result, Err(Error::Model(_))));
    }
}
