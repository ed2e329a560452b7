//! API sessions: kept in memory, mirrored to one JSON file each.

use crate::record::Credentials;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSession {
    #[serde(flatten)]
    pub credentials: Credentials,
    pub created_at: DateTime<Utc>,
    pub posts_processed: u64,
}

impl ApiSession {
    fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            created_at: Utc::now(),
            posts_processed: 0,
        }
    }
}

pub struct SessionStore {
    dir: PathBuf,
    sessions: RwLock<HashMap<String, ApiSession>>,
}

impl SessionStore {
    /// An empty store writing under `dir`
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// A store holding every readable session file already under `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let store = Self::new(dir);
        tokio::fs::create_dir_all(&store.dir).await?;

        let mut loaded = HashMap::new();
        let mut entries = tokio::fs::read_dir(&store.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            match read_session(&path).await {
                Ok(session) => {
                    loaded.insert(id, session);
                }
                Err(e) => ::log::warn!("Skipping session file {}: {}", path.display(), e),
            }
        }

        ::log::info!("Loaded {} session(s) from {}", loaded.len(), store.dir.display());
        *store.sessions.write().await = loaded;
        Ok(store)
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    /// Starts a session and returns its identifier
    pub async fn create(&self, credentials: Credentials) -> io::Result<String> {
        let id = Uuid::new_v4().to_string();
        let session = ApiSession::new(credentials);

        let mut sessions = self.sessions.write().await;
        tokio::fs::create_dir_all(&self.dir).await?;
        write_session(&self.path_for(&id), &session).await?;
        sessions.insert(id.clone(), session);

        ::log::info!("Created session {}", id);
        Ok(id)
    }

    pub async fn get(&self, id: &str) -> Option<ApiSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Ends a session; returns whether it existed
    pub async fn remove(&self, id: &str) -> io::Result<bool> {
        let mut sessions = self.sessions.write().await;
        if sessions.remove(id).is_none() {
            return Ok(false);
        }
        match tokio::fs::remove_file(self.path_for(id)).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        ::log::info!("Removed session {}", id);
        Ok(true)
    }

    /// Counts one more processed post; returns the new total
    pub async fn record_post(&self, id: &str) -> io::Result<Option<u64>> {
        let mut sessions = self.sessions.write().await;
        let Some(session) = sessions.get_mut(id) else {
            return Ok(None);
        };
        session.posts_processed += 1;
        let total = session.posts_processed;
        write_session(&self.path_for(id), session).await?;
        Ok(Some(total))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

async fn read_session(path: &Path) -> io::Result<ApiSession> {
    let contents = tokio::fs::read_to_string(path).await?;
    serde_json::from_str(&contents).map_err(io::Error::other)
}

async fn write_session(path: &Path, session: &ApiSession) -> io::Result<()> {
    let json = serde_json::to_vec_pretty(session).map_err(io::Error::other)?;
    tokio::fs::write(path, json).await
}
