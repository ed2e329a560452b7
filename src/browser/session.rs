//! File-backed browser session.
//!
//! Cookies captured after a fresh login are written once, before any
//! concurrent extraction starts; every extraction afterwards only reads them.

use crate::error::BrowserError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// A browser cookie in a driver-independent form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub http_only: bool,
}

/// Cookies of one logged-in browser, as persisted on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserSession {
    pub saved_at: DateTime<Utc>,
    pub cookies: Vec<SessionCookie>,
}

impl BrowserSession {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self {
            saved_at: Utc::now(),
            cookies,
        }
    }
}

/// Reads and writes the session file
#[derive(Debug)]
pub struct CookieSessionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CookieSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the saved session; a missing or empty file means no session
    pub async fn load(&self) -> Result<Option<BrowserSession>, BrowserError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BrowserError::Session(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if contents.trim().is_empty() {
            return Ok(None);
        }

        let session: BrowserSession = serde_json::from_str(&contents).map_err(|e| {
            BrowserError::Session(format!("invalid session file {}: {}", self.path.display(), e))
        })?;

        Ok(Some(session).filter(|session| !session.cookies.is_empty()))
    }

    /// Writes `session` unless another caller already stored one.
    ///
    /// Returns `false` when an existing session was kept.
    pub async fn save_if_absent(&self, session: &BrowserSession) -> Result<bool, BrowserError> {
        let _guard = self.write_lock.lock().await;

        if self.load().await?.is_some() {
            ::log::debug!("Session file {} already present", self.path.display());
            return Ok(false);
        }

        self.write(session).await?;
        Ok(true)
    }

    /// Replaces the stored session
    pub async fn save(&self, session: &BrowserSession) -> Result<(), BrowserError> {
        let _guard = self.write_lock.lock().await;
        self.write(session).await
    }

    async fn write(&self, session: &BrowserSession) -> Result<(), BrowserError> {
        let session_error =
            |e: &dyn std::fmt::Display| BrowserError::Session(format!("{}: {}", self.path.display(), e));

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| session_error(&e))?;
        }

        let json = serde_json::to_string_pretty(session).map_err(|e| session_error(&e))?;

        // Readers never see a half-written file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| session_error(&e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| session_error(&e))?;

        ::log::info!(
            "Saved browser session with {} cookies to {}",
            session.cookies.len(),
            self.path.display()
        );
        Ok(())
    }
}
