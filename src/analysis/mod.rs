//! Generative model collaborators.
//!
//! The pipeline only sees the two traits below; [`gemini::GeminiClient`]
//! implements both against the Gemini REST API.

pub mod gemini;
pub mod prompts;

use crate::error::ModelError;
use async_trait::async_trait;

/// Kind of media handed to a [`MediaAnalyzer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    DocumentPage,
    Video,
}

impl MediaKind {
    pub fn prompt(self) -> &'static str {
        match self {
            MediaKind::Image => prompts::IMAGE_PROMPT,
            MediaKind::DocumentPage => prompts::DOCUMENT_PAGE_PROMPT,
            MediaKind::Video => prompts::VIDEO_PROMPT,
        }
    }

    /// MIME type assumed when neither the server nor the URL tells us
    pub fn fallback_mime(self) -> &'static str {
        match self {
            MediaKind::Image | MediaKind::DocumentPage => "image/jpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    /// Top-level MIME type a download must have to be accepted as this kind
    fn mime_family(self) -> &'static str {
        match self {
            MediaKind::Image | MediaKind::DocumentPage => "image/",
            MediaKind::Video => "video/",
        }
    }
}

/// Downloaded media ready to be sent inline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// Free-text generation from a prompt
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

/// Turns one media item, located by URL, into text
#[async_trait]
pub trait MediaAnalyzer: Send + Sync {
    async fn analyze(&self, kind: MediaKind, locator: &str) -> Result<String, ModelError>;
}

/// Picks the MIME type for a download: a matching `Content-Type` wins, then
/// the URL's extension, then the kind's fallback
pub fn resolve_mime(kind: MediaKind, content_type: Option<&str>, url: &str) -> String {
    let family = kind.mime_family();

    if let Some(header) = content_type {
        let essence = header.split(';').next().unwrap_or_default().trim();
        if essence.starts_with(family) {
            return essence.to_string();
        }
    }

    let path = url::Url::parse(url)
        .map(|parsed| parsed.path().to_string())
        .unwrap_or_else(|_| url.to_string());
    if let Some(guess) = mime_guess::from_path(&path).first() {
        if guess.essence_str().starts_with(family) {
            return guess.essence_str().to_string();
        }
    }

    kind.fallback_mime().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_mime_prefers_header() {
        assert_eq!(
            resolve_mime(MediaKind::Image, Some("image/png; charset=binary"), "https://x/a.jpg"),
            "image/png"
        );
    }

    #[test]
    fn test_resolve_mime_ignores_wrong_family_header() {
        assert_eq!(
            resolve_mime(MediaKind::Video, Some("application/octet-stream"), "https://x/v.webm?e=1"),
            "video/webm"
        );
    }

    #[test]
    fn test_resolve_mime_falls_back() {
        assert_eq!(
            resolve_mime(MediaKind::DocumentPage, None, "https://x/page/0?t=abc"),
            "image/jpeg"
        );
        assert_eq!(resolve_mime(MediaKind::Video, None, "not a url"), "video/mp4");
    }
}
