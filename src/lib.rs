// Re-export modules
pub mod aggregate;
pub mod analysis;
pub mod app;
pub mod batch;
pub mod browser;
pub mod classify;
pub mod config;
pub mod error;
pub mod export;
pub mod extractors;
pub mod filter;
pub mod parsers;
pub mod pipeline;
pub mod record;
pub mod server;
pub mod summarize;

#[cfg(test)]
mod testing;

// Re-export commonly used types for convenience
pub use app::App;
pub use batch::{BatchDriver, BatchOutput};
pub use error::{Error, Result};
pub use pipeline::{Pipeline, StageRunner};
pub use record::{ExtractionRecord, NotesArtifact, Post};
