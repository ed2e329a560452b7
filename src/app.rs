use crate::analysis::gemini::GeminiClient;
use crate::batch::BatchDriver;
use crate::browser::PostBrowser;
use crate::browser::webdriver::WebDriverBrowser;
use crate::classify::Classifier;
use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::export::FileExporter;
use crate::filter::PostUrlFilter;
use crate::pipeline::{Pipeline, StageRunner};
use crate::summarize::Summarizer;
use std::path::Path;
use std::sync::Arc;

/// Production collaborators wired from one [`AppConfig`]
pub struct App {
    config: AppConfig,
    browser: Arc<WebDriverBrowser>,
    summary_client: GeminiClient,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let browser = Arc::new(WebDriverBrowser::from_config(&config));
        let summary_client = GeminiClient::from_config(&config, &config.summary_model);
        Self {
            config,
            browser,
            summary_client,
        }
    }

    /// Load configuration from a JSON file, then apply environment overrides
    pub fn with_config_file(path: impl AsRef<Path>) -> Result<Self> {
        let config = AppConfig::from_file(path).map_err(|e| Error::Config(e.to_string()))?;
        Ok(Self::new(config.with_env_overrides()))
    }

    /// Override the number of posts processed at the same time
    pub fn with_max_concurrency(mut self, value: usize) -> Self {
        self.config.max_concurrency = value;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn browser(&self) -> Arc<dyn PostBrowser> {
        self.browser.clone()
    }

    pub fn url_filter(&self) -> Result<PostUrlFilter> {
        PostUrlFilter::new(self.config.url_filter.clone())
            .map_err(|e| Error::Config(format!("invalid URL pattern: {}", e)))
    }

    pub fn exporter(&self) -> Arc<FileExporter> {
        Arc::new(FileExporter::new(&self.config.output_dir))
    }

    /// Clients for the other models share the summary client's request pacing
    pub fn classifier(&self) -> Arc<Classifier> {
        let generator = self.summary_client.for_model(&self.config.classify_model);
        Arc::new(Classifier::new(self.browser(), Arc::new(generator)))
    }

    fn media_client(&self) -> GeminiClient {
        self.summary_client.for_model(&self.config.media_model)
    }

    fn runner(&self) -> StageRunner {
        StageRunner::new(self.config.stage_timeout())
    }

    pub fn minimal_pipeline(&self) -> Pipeline {
        Pipeline::minimal(self.browser(), Arc::new(self.media_client()), self.runner())
    }

    pub fn extended_pipeline(&self) -> Pipeline {
        Pipeline::extended(
            self.browser(),
            Arc::new(self.media_client()),
            self.classifier(),
            self.runner(),
        )
    }

    /// Batch driver over the minimal or the extended pipeline
    pub fn batch_driver(&self, extended: bool) -> BatchDriver {
        let pipeline = if extended {
            self.extended_pipeline()
        } else {
            self.minimal_pipeline()
        };
        BatchDriver::new(
            Arc::new(pipeline),
            Arc::new(Summarizer::new(Arc::new(self.summary_client.clone()))),
            self.browser(),
            self.exporter(),
        )
        .with_max_concurrency(self.config.max_concurrency)
        .with_post_timeout(self.config.post_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_stage_layout() {
        let app = App::new(AppConfig::default()).with_max_concurrency(3);
        assert_eq!(app.config().max_concurrency, 3);
        assert_eq!(app.minimal_pipeline().stage_names().len(), 4);
        assert_eq!(app.extended_pipeline().stage_names()[0], "saved_posts");
    }

    #[test]
    fn test_missing_config_file_is_error() {
        let result = App::with_config_file("/nonexistent/post-notes.json");
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
