//! Browser automation collaborator.
//!
//! Extractors talk to the post page through [`PostBrowser`]; the production
//! implementation is [`webdriver::WebDriverBrowser`].

pub mod session;
pub mod webdriver;

use crate::error::BrowserError;
use crate::record::{Credentials, PostSnapshot, SavedPost};
use async_trait::async_trait;

/// Page-level operations needed by the extraction stages.
///
/// Every call opens the page itself; nothing is shared between calls except
/// the persisted login session.
#[async_trait]
pub trait PostBrowser: Send + Sync {
    /// Makes sure a reusable login session exists. Must be called before
    /// concurrent extractions start, since it is the only writer of the
    /// session.
    async fn prepare_session(&self, credentials: Option<&Credentials>) -> Result<(), BrowserError>;

    /// Visible text of the post body
    async fn post_text(&self, url: &str, credentials: Option<&Credentials>) -> Result<String, BrowserError>;

    /// Image URLs collected by walking the post's image viewer
    async fn image_urls(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<String>, BrowserError>;

    /// Manifest URL of the post's document carousel, if it has one
    async fn document_manifest_url(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Option<String>, BrowserError>;

    /// Page image URLs listed by a document manifest
    async fn document_pages(&self, manifest_url: &str) -> Result<Vec<String>, BrowserError>;

    /// Downloadable video sources of the post
    async fn video_sources(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Vec<String>, BrowserError>;

    /// Everything visible on the post page in one visit
    async fn snapshot(
        &self,
        url: &str,
        credentials: Option<&Credentials>,
    ) -> Result<PostSnapshot, BrowserError>;

    /// The account's saved-items listing
    async fn saved_posts(&self, credentials: &Credentials) -> Result<Vec<SavedPost>, BrowserError>;
}

/// Outcome of feeding one viewer image to a [`GalleryWalk`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GalleryStep {
    Continue,
    Stop,
}

/// Collects image URLs while paging through an image viewer.
///
/// The walk stops when the first image comes around again or after `limit`
/// viewer pages, so carousels that never cycle back terminate too.
#[derive(Debug)]
pub struct GalleryWalk {
    first: Option<String>,
    urls: Vec<String>,
    visits: usize,
    limit: usize,
}

impl GalleryWalk {
    pub fn new(limit: usize) -> Self {
        Self {
            first: None,
            urls: Vec::new(),
            visits: 0,
            limit,
        }
    }

    pub fn visit(&mut self, src: &str) -> GalleryStep {
        if self.first.as_deref() == Some(src) {
            return GalleryStep::Stop;
        }
        if self.first.is_none() {
            self.first = Some(src.to_string());
        }

        self.visits += 1;
        if !self.urls.iter().any(|url| url == src) {
            self.urls.push(src.to_string());
        }

        if self.visits >= self.limit {
            ::log::debug!("Gallery limit of {} pages reached", self.limit);
            GalleryStep::Stop
        } else {
            GalleryStep::Continue
        }
    }

    pub fn into_urls(self) -> Vec<String> {
        self.urls
    }
}
