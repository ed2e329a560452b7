//! Error types shared across the crate.
//!
//! Stage-local failures are expressed with these types too, but the pipeline
//! never lets them escape a stage: [`crate::pipeline::StageRunner`] turns them
//! into empty record fields. Everything above the pipeline boundary propagates
//! them to the caller.

use thiserror::Error;

/// Failures talking to the browser automation backend.
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("failed to connect to any WebDriver server (tried {0})")]
    Connect(String),

    #[error("WebDriver command failed while {context}: {message}")]
    Command { context: String, message: String },

    #[error("missing email or password")]
    MissingCredentials,

    #[error("login failed: {0}")]
    Login(String),

    #[error("invalid post URL: {0}")]
    InvalidUrl(String),

    #[error("session store error: {0}")]
    Session(String),
}

impl BrowserError {
    pub fn command(context: &str, err: impl std::fmt::Display) -> Self {
        BrowserError::Command {
            context: context.to_string(),
            message: err.to_string(),
        }
    }
}

/// Failures from the generative model backend or media download.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model configuration error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse model response: {0}")]
    Parse(String),

    #[error("model returned no text")]
    EmptyResponse,

    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("media at {url} is {size} bytes, above the {limit} byte limit")]
    MediaTooLarge { url: String, size: usize, limit: usize },
}

/// Failures persisting notes or classification results.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("failed to write file: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error("spreadsheet writing failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-level error.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("stage timed out after {0} seconds")]
    Timeout(u64),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ModelError::Api {
            status: 429,
            body: "quota".to_string(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("quota"));
    }

    #[test]
    fn test_transparent_wrapping() {
        let err: Error = BrowserError::MissingCredentials.into();
        assert_eq!(err.to_string(), "missing email or password");
    }

    #[test]
    fn test_command_error_context() {
        let err = BrowserError::command("opening saved posts", "no such element");
        assert_eq!(
            err.to_string(),
            "WebDriver command failed while opening saved posts: no such element"
        );
    }
}
