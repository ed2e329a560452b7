//! JSON HTTP surface: sessions, single-post summaries and downloads.

pub mod error;
pub mod routes;
pub mod sessions;

use crate::app::App;
use crate::batch::BatchDriver;
use crate::error::Result;
use crate::filter::PostUrlFilter;
use axum::Router;
use axum::routing::{get, post};
use sessions::SessionStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared handles for every request
#[derive(Clone)]
pub struct ServerState {
    pub sessions: Arc<SessionStore>,
    pub driver: Arc<BatchDriver>,
    pub url_filter: Arc<PostUrlFilter>,
    /// Root for generated files; downloads never leave it
    pub output_dir: PathBuf,
    /// Browser cookie file, never served even when it sits under `output_dir`
    pub session_file: PathBuf,
}

pub fn router(state: ServerState) -> Router {
    let api = Router::new()
        .route("/login", post(routes::login))
        .route("/verify-session", post(routes::verify_session))
        .route("/logout", post(routes::logout))
        .route("/summarize", post(routes::summarize))
        .route("/download/{filename}", get(routes::download))
        .route("/health", get(routes::health));

    Router::new()
        .route("/", get(routes::index))
        .nest("/api", api)
        .with_state(state)
}

/// Serves the API on `bind_addr` until the process stops
pub async fn serve(app: &App, bind_addr: &str) -> Result<()> {
    let config = app.config();
    let state = ServerState {
        sessions: Arc::new(SessionStore::open(config.sessions_dir()).await?),
        driver: Arc::new(app.batch_driver(true)),
        url_filter: Arc::new(app.url_filter()?),
        output_dir: config.output_dir.clone(),
        session_file: config.session_file.clone(),
    };

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    ::log::info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state)).await?;
    Ok(())
}
