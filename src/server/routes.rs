use super::ServerState;
use super::error::ApiError;
use crate::export::ExportFormat;
use crate::record::{Credentials, Post};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::{Component, PathBuf};
use uuid::Uuid;

/// Extensions of the files this crate generates; nothing else is served
const DOWNLOAD_EXTENSIONS: [&str; 3] = ["pdf", "xlsx", "json"];

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub session_id: Option<String>,
    pub url: Option<String>,
    pub format: Option<String>,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// `GET /`
pub async fn index() -> Json<Value> {
    Json(json!({
        "message": "Post notes API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "login": "POST /api/login",
            "verify_session": "POST /api/verify-session",
            "logout": "POST /api/logout",
            "summarize": "POST /api/summarize",
            "download": "GET /api/download/{filename}",
            "health": "GET /api/health"
        }
    }))
}

/// `POST /api/login`
pub async fn login(
    State(state): State<ServerState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    let (Some(email), Some(password)) = (present(request.email), present(request.password)) else {
        return Err(ApiError::BadRequest("Missing email or password".into()));
    };

    let session_id = state
        .sessions
        .create(Credentials::new(email.clone(), password))
        .await?;
    Ok(Json(json!({
        "message": "Login successful",
        "session_id": session_id,
        "email": email
    })))
}

/// `POST /api/verify-session`
pub async fn verify_session(
    State(state): State<ServerState>,
    payload: Result<Json<SessionRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    let session_id = present(request.session_id).ok_or(ApiError::Unauthorized)?;
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or(ApiError::Unauthorized)?;

    Ok(Json(json!({
        "valid": true,
        "email": session.credentials.email,
        "posts_processed": session.posts_processed,
        "created_at": session.created_at.to_rfc3339()
    })))
}

/// `POST /api/logout`; unknown sessions log out successfully too
pub async fn logout(
    State(state): State<ServerState>,
    payload: Result<Json<SessionRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    let session_id = present(request.session_id)
        .ok_or_else(|| ApiError::BadRequest("Missing session_id".into()))?;
    state.sessions.remove(&session_id).await?;
    Ok(Json(json!({ "message": "Logout successful" })))
}

/// `POST /api/summarize`: runs the extended pipeline for one post and
/// writes `notes_{file_id}` in the requested format
pub async fn summarize(
    State(state): State<ServerState>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let request = body(payload)?;
    let session_id = present(request.session_id).ok_or(ApiError::Unauthorized)?;
    let session = state
        .sessions
        .get(&session_id)
        .await
        .ok_or(ApiError::Unauthorized)?;

    let raw_url = present(request.url).ok_or_else(|| ApiError::BadRequest("Missing post URL".into()))?;
    let url = state
        .url_filter
        .accept(&raw_url)
        .ok_or_else(|| ApiError::BadRequest(format!("Not a post URL: {}", raw_url)))?;
    let format: ExportFormat = request
        .format
        .as_deref()
        .unwrap_or("pdf")
        .parse()
        .map_err(ApiError::BadRequest)?;

    let file_id: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
    let filename = format!("notes_{}", file_id);
    let post = Post::new(&file_id, url.as_str());
    ::log::info!("Summarizing {} for session {}", url, session_id);

    let (_, path) = state
        .driver
        .run_single(&post, Some(&session.credentials), format, &filename)
        .await?;
    state.sessions.record_post(&session_id).await?;

    let stored_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(&filename)
        .to_string();
    Ok(Json(json!({
        "message": "Summary generated successfully",
        "download_link": format!("/api/download/{}", stored_name),
        "file_id": file_id,
        "format": format.to_string()
    })))
}

/// Path of `filename` under `root`, if it names a plain file directly in it
fn resolve_download(
    root: &std::path::Path,
    filename: &str,
    session_file: &std::path::Path,
) -> Option<PathBuf> {
    if filename.contains('\\') {
        return None;
    }
    let mut components = std::path::Path::new(filename).components();
    let path = match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => root.join(name),
        _ => return None,
    };
    let extension = path.extension().and_then(|e| e.to_str())?;
    if !DOWNLOAD_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str()) {
        return None;
    }
    if path == session_file {
        return None;
    }
    Some(path)
}

/// `GET /api/download/{filename}`
pub async fn download(
    State(state): State<ServerState>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let path = resolve_download(&state.output_dir, &filename, &state.session_file).ok_or_else(|| {
        ::log::warn!("Rejected download path {:?}", filename);
        ApiError::Forbidden
    })?;

    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::NotFound("File not found".into()));
        }
        Err(e) => return Err(e.into()),
    };

    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let disposition = format!("attachment; filename=\"{}\"", filename.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `GET /api/health`
pub async fn health(State(state): State<ServerState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "active_sessions": state.sessions.len().await,
        "timestamp": Utc::now().to_rfc3339()
    }))
}
