use crate::filter::PostUrlFilterConfig;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime configuration for the extraction pipeline, the model client and
/// the HTTP server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// URL for the WebDriver instance
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Whether the browser runs without a window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// API key for the generative model service
    #[serde(default)]
    pub gemini_api_key: String,

    /// Base URL of the generative model REST API
    #[serde(default = "default_gemini_base_url")]
    pub gemini_base_url: String,

    /// Model used to write notes
    #[serde(default = "default_model")]
    pub summary_model: String,

    /// Model used for image, document and video analysis
    #[serde(default = "default_model")]
    pub media_model: String,

    /// Model used to classify saved posts
    #[serde(default = "default_model")]
    pub classify_model: String,

    /// Minimum spacing between two model calls
    #[serde(default = "default_min_request_interval_ms")]
    pub min_request_interval_ms: u64,

    /// Directory for generated files and session records
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Browser cookie file shared by all extractions
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,

    /// Number of posts processed at the same time
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Upper bound for one extraction stage
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,

    /// Upper bound for the whole pipeline of one post
    #[serde(default = "default_post_timeout_secs")]
    pub post_timeout_secs: u64,

    /// Maximum images collected from one gallery
    #[serde(default = "default_max_gallery_images")]
    pub max_gallery_images: usize,

    /// Maximum size of a downloaded image, page or video
    #[serde(default = "default_max_media_bytes")]
    pub max_media_bytes: usize,

    /// Pause after navigation so dynamic content can render
    #[serde(default = "default_page_settle_ms")]
    pub page_settle_ms: u64,

    /// Listen address of the HTTP server
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Rules for accepting post URLs
    #[serde(default)]
    pub url_filter: PostUrlFilterConfig,
}

fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_min_request_interval_ms() -> u64 {
    1000
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_session_file() -> PathBuf {
    PathBuf::from("linkedin_state.json")
}

fn default_max_concurrency() -> usize {
    1
}

fn default_stage_timeout_secs() -> u64 {
    120
}

fn default_post_timeout_secs() -> u64 {
    600
}

fn default_max_gallery_images() -> usize {
    20
}

fn default_max_media_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_page_settle_ms() -> u64 {
    2000
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            webdriver_url: default_webdriver_url(),
            headless: default_headless(),
            gemini_api_key: String::new(),
            gemini_base_url: default_gemini_base_url(),
            summary_model: default_model(),
            media_model: default_model(),
            classify_model: default_model(),
            min_request_interval_ms: default_min_request_interval_ms(),
            output_dir: default_output_dir(),
            session_file: default_session_file(),
            max_concurrency: default_max_concurrency(),
            stage_timeout_secs: default_stage_timeout_secs(),
            post_timeout_secs: default_post_timeout_secs(),
            max_gallery_images: default_max_gallery_images(),
            max_media_bytes: default_max_media_bytes(),
            page_settle_ms: default_page_settle_ms(),
            bind_addr: default_bind_addr(),
            url_filter: PostUrlFilterConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, Box<dyn Error>> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Apply `WEBDRIVER_URL` and `GEMINI_API_KEY` from the environment when set
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.webdriver_url = webdriver_url;
            }
        }
        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            if !api_key.is_empty() {
                self.gemini_api_key = api_key;
            }
        }
        self
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    pub fn post_timeout(&self) -> Duration {
        Duration::from_secs(self.post_timeout_secs)
    }

    pub fn page_settle(&self) -> Duration {
        Duration::from_millis(self.page_settle_ms)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }

    /// Directory holding one JSON file per API session
    pub fn sessions_dir(&self) -> PathBuf {
        self.output_dir.join("sessions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert_eq!(config.summary_model, "gemini-2.5-flash");
        assert_eq!(config.max_concurrency, 1);
        assert_eq!(config.max_gallery_images, 20);
        assert!(config.headless);
        assert_eq!(config.sessions_dir(), PathBuf::from("outputs").join("sessions"));
        assert!(!config.session_file.starts_with(&config.output_dir));
    }

    #[test]
    fn test_partial_json_overrides() {
        let config =
            AppConfig::from_json(r#"{"max_concurrency": 4, "output_dir": "/tmp/notes"}"#).unwrap();
        assert_eq!(config.max_concurrency, 4);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/notes"));
        assert_eq!(config.stage_timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"headless": false}"#).unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert!(!config.headless);
    }

    #[test]
    fn test_invalid_json_is_error() {
        assert!(AppConfig::from_json("{not json").is_err());
    }
}
