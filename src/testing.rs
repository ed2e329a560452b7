//! Hand-written collaborators for unit tests.

use crate::analysis::{MediaAnalyzer, MediaKind, TextGenerator};
use crate::browser::PostBrowser;
use crate::error::{BrowserError, ModelError};
use crate::filter::url_for_urn;
use crate::record::{Credentials, PostSnapshot, SavedPost};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

fn scripted_failure() -> BrowserError {
    BrowserError::Connect("scripted failure".to_string())
}

/// Browser returning canned page content
#[derive(Default)]
pub struct ScriptedBrowser {
    failing: bool,
    text: String,
    text_by_url: HashMap<String, String>,
    delay_by_url: HashMap<String, Duration>,
    images: Vec<String>,
    videos: Vec<String>,
    document: Option<(String, Vec<String>)>,
    saved_urns: Vec<String>,
    snapshot: PostSnapshot,
    prepare_calls: AtomicUsize,
    page_visits: AtomicUsize,
}

impl ScriptedBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_text_for(mut self, url: &str, text: &str) -> Self {
        self.text_by_url.insert(url.to_string(), text.to_string());
        self
    }

    /// Delays every page visit of `url`
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delay_by_url.insert(url.to_string(), delay);
        self
    }

    pub fn with_images(mut self, urls: &[&str]) -> Self {
        self.images = urls.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_videos(mut self, urls: &[&str]) -> Self {
        self.videos = urls.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_document(mut self, manifest_url: &str, pages: &[&str]) -> Self {
        self.document = Some((
            manifest_url.to_string(),
            pages.iter().map(|s| s.to_string()).collect(),
        ));
        self
    }

    pub fn with_saved_posts(mut self, urns: &[&str]) -> Self {
        self.saved_urns = urns.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_snapshot(mut self, snapshot: PostSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn prepare_calls(&self) -> usize {
        self.prepare_calls.load(Ordering::SeqCst)
    }

    pub fn page_visits(&self) -> usize {
        self.page_visits.load(Ordering::SeqCst)
    }

    async fn visit(&self, url: &str) -> Result<(), BrowserError> {
        self.page_visits.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay_by_url.get(url) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing {
            Err(scripted_failure())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PostBrowser for ScriptedBrowser {
    async fn prepare_session(&self, _credentials: Option<&Credentials>) -> Result<(), BrowserError> {
        self.prepare_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn post_text(&self, url: &str, _credentials: Option<&Credentials>) -> Result<String, BrowserError> {
        self.visit(url).await?;
        Ok(self
            .text_by_url
            .get(url)
            .cloned()
            .unwrap_or_else(|| self.text.clone()))
    }

    async fn image_urls(
        &self,
        url: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Vec<String>, BrowserError> {
        self.visit(url).await?;
        Ok(self.images.clone())
    }

    async fn document_manifest_url(
        &self,
        url: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Option<String>, BrowserError> {
        self.visit(url).await?;
        Ok(self.document.as_ref().map(|(manifest, _)| manifest.clone()))
    }

    async fn document_pages(&self, manifest_url: &str) -> Result<Vec<String>, BrowserError> {
        if self.failing {
            return Err(scripted_failure());
        }
        Ok(match &self.document {
            Some((manifest, pages)) if manifest == manifest_url => pages.clone(),
            _ => Vec::new(),
        })
    }

    async fn video_sources(
        &self,
        url: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Vec<String>, BrowserError> {
        self.visit(url).await?;
        Ok(self.videos.clone())
    }

    async fn snapshot(
        &self,
        url: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<PostSnapshot, BrowserError> {
        self.visit(url).await?;
        Ok(self.snapshot.clone())
    }

    async fn saved_posts(&self, _credentials: &Credentials) -> Result<Vec<SavedPost>, BrowserError> {
        if self.failing {
            return Err(scripted_failure());
        }
        Ok(self
            .saved_urns
            .iter()
            .enumerate()
            .map(|(i, urn)| SavedPost {
                id: (i + 1) as u32,
                urn: urn.clone(),
                url: url_for_urn(urn).unwrap_or_default(),
            })
            .collect())
    }
}

/// Media analyzer answering `text of {locator}`
#[derive(Default)]
pub struct StubAnalyzer {
    fail_all: bool,
    failing_locators: HashSet<String>,
    calls: AtomicUsize,
}

impl StubAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn failing_on(mut self, locator: &str) -> Self {
        self.failing_locators.insert(locator.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MediaAnalyzer for StubAnalyzer {
    async fn analyze(&self, _kind: MediaKind, locator: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all || self.failing_locators.contains(locator) {
            return Err(ModelError::Download {
                url: locator.to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        Ok(format!("text of {}", locator))
    }
}

type Reply = Box<dyn Fn(&str) -> Result<String, ModelError> + Send + Sync>;

/// Text generator that records every prompt it receives
pub struct CountingGenerator {
    reply: Reply,
    prompts: Mutex<Vec<String>>,
}

impl CountingGenerator {
    pub fn new(reply: impl Fn(&str) -> Result<String, ModelError> + Send + Sync + 'static) -> Self {
        Self {
            reply: Box::new(reply),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn failing() -> Self {
        Self::new(|_| {
            Err(ModelError::Api {
                status: 503,
                body: "scripted failure".to_string(),
            })
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for CountingGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        (self.reply)(prompt)
    }
}
