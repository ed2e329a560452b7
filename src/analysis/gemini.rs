use crate::analysis::{MediaAnalyzer, MediaBlob, MediaKind, TextGenerator, resolve_mime};
use crate::config::AppConfig;
use crate::error::ModelError;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Client for the Gemini `generateContent` REST endpoint.
///
/// Calls made through one client (and its clones) are spaced at least
/// `min_interval` apart.
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    min_interval: Duration,
    max_media_bytes: usize,
    last_call: Arc<Mutex<Option<Instant>>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text {
        text: &'a str,
    },
    #[serde(rename_all = "camelCase")]
    Inline {
        inline_data: InlineData,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: model.into(),
            min_interval: Duration::from_millis(1000),
            max_media_bytes: 20 * 1024 * 1024,
            last_call: Arc::new(Mutex::new(None)),
        }
    }

    /// Build a client for `model` using the shared settings of `config`
    pub fn from_config(config: &AppConfig, model: &str) -> Self {
        Self::new(config.gemini_api_key.clone(), model)
            .with_base_url(config.gemini_base_url.clone())
            .with_min_interval(config.min_request_interval())
            .with_max_media_bytes(config.max_media_bytes)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_min_interval(mut self, interval: Duration) -> Self {
        self.min_interval = interval;
        self
    }

    pub fn with_max_media_bytes(mut self, limit: usize) -> Self {
        self.max_media_bytes = limit;
        self
    }

    /// A client for another model sharing this one's HTTP pool and pacing
    pub fn for_model(&self, model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..self.clone()
        }
    }

    /// Send a prompt plus optional inline media and return the response text
    pub async fn generate_with_media(
        &self,
        prompt: &str,
        media: &[MediaBlob],
    ) -> Result<String, ModelError> {
        if self.api_key.is_empty() {
            return Err(ModelError::Config("GEMINI_API_KEY is not set".into()));
        }

        let body = build_request(prompt, media);
        self.pace().await;

        let start = Instant::now();
        let response = self
            .http_client
            .post(format!("{}/models/{}:generateContent", self.base_url, self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                ::log::warn!("Model request failed: {}", e);
                ModelError::Network(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            ::log::warn!("Model API error {}: {}", status, body);
            return Err(ModelError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ModelError::Parse(e.to_string()))?;

        ::log::debug!(
            "Model {} answered in {:.2} seconds",
            self.model,
            start.elapsed().as_secs_f64()
        );

        response_text(parsed)
    }

    /// Download a media item, enforcing the size limit
    pub async fn download(&self, kind: MediaKind, url: &str) -> Result<MediaBlob, ModelError> {
        let download_error = |reason: String| ModelError::Download {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        if !response.status().is_success() {
            return Err(download_error(format!("HTTP {}", response.status())));
        }

        if let Some(length) = response.content_length() {
            let size = usize::try_from(length).unwrap_or(usize::MAX);
            if size > self.max_media_bytes {
                return Err(ModelError::MediaTooLarge {
                    url: url.to_string(),
                    size,
                    limit: self.max_media_bytes,
                });
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let data = response
            .bytes()
            .await
            .map_err(|e| download_error(e.to_string()))?;

        if data.len() > self.max_media_bytes {
            return Err(ModelError::MediaTooLarge {
                url: url.to_string(),
                size: data.len(),
                limit: self.max_media_bytes,
            });
        }

        Ok(MediaBlob {
            mime_type: resolve_mime(kind, content_type.as_deref(), url),
            data: data.to_vec(),
        })
    }

    /// Waits until `min_interval` has passed since the previous call
    async fn pace(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let wait = self.min_interval - elapsed;
                ::log::trace!("Spacing model call by {} ms", wait.as_millis());
                tokio::time::sleep(wait).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

fn build_request<'a>(prompt: &'a str, media: &[MediaBlob]) -> GenerateRequest<'a> {
    let mut parts = vec![Part::Text { text: prompt }];
    parts.extend(media.iter().map(|blob| Part::Inline {
        inline_data: InlineData {
            mime_type: blob.mime_type.clone(),
            data: BASE64.encode(&blob.data),
        },
    }));

    GenerateRequest {
        contents: vec![Content { role: "user", parts }],
        generation_config: GenerationConfig { temperature: 0.0 },
    }
}

/// Concatenates the text parts of the first candidate
fn response_text(response: GenerateResponse) -> Result<String, ModelError> {
    let text = response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(ModelError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        self.generate_with_media(prompt, &[]).await
    }
}

#[async_trait]
impl MediaAnalyzer for GeminiClient {
    async fn analyze(&self, kind: MediaKind, locator: &str) -> Result<String, ModelError> {
        let blob = self.download(kind, locator).await?;
        ::log::debug!(
            "Analyzing {:?} ({}, {} bytes) from {}",
            kind,
            blob.mime_type,
            blob.data.len(),
            locator
        );
        let text = self.generate_with_media(kind.prompt(), &[blob]).await?;
        Ok(text.trim().to_string())
    }
}
