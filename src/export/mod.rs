//! Persistence of notes, saved-post listings and classification results.

pub mod pdf;
pub mod xlsx;

use crate::error::ExportError;
use crate::record::{ClassificationResult, SavedPost, TopicGroups};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::path::{Path, PathBuf};

pub const DEFAULT_NOTES_NAME: &str = "combined_notes";

/// File format of the combined notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Pdf,
    Excel,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "xlsx",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Excel => "excel",
        })
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "excel" | "xlsx" => Ok(ExportFormat::Excel),
            other => Err(format!("Format must be 'pdf' or 'excel', got '{}'", other)),
        }
    }
}

/// Writes the combined notes document somewhere
pub trait NotesExporter: Send + Sync {
    /// Persists `combined` and returns where it went
    fn export_notes(
        &self,
        combined: &str,
        format: ExportFormat,
        filename: &str,
    ) -> Result<PathBuf, ExportError>;
}

/// Writes files under one output directory
#[derive(Debug, Clone)]
pub struct FileExporter {
    output_dir: PathBuf,
}

impl FileExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path for `filename` with `extension`, always inside the output directory
    pub fn target(&self, filename: &str, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", safe_file_stem(filename, extension), extension))
    }

    fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), ExportError> {
        std::fs::create_dir_all(&self.output_dir)?;
        std::fs::write(path, bytes)?;
        ::log::info!("Wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Saved-items listing as a JSON array of `{id, urn, url}`
    pub fn save_saved_posts(&self, posts: &[SavedPost], filename: &str) -> Result<PathBuf, ExportError> {
        let path = self.target(filename, "json");
        let json = serde_json::to_vec_pretty(posts)?;
        self.write(&path, &json)?;
        Ok(path)
    }

    pub fn load_saved_posts(path: &Path) -> Result<Vec<SavedPost>, ExportError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Classification results, one row per post
    pub fn save_classified(
        &self,
        results: &[ClassificationResult],
        filename: &str,
    ) -> Result<PathBuf, ExportError> {
        let path = self.target(filename, "xlsx");
        self.write(&path, &xlsx::classified_workbook(results)?)?;
        Ok(path)
    }

    /// Classification results, one sheet per topic
    pub fn save_grouped(&self, groups: &TopicGroups, filename: &str) -> Result<PathBuf, ExportError> {
        let path = self.target(filename, "xlsx");
        self.write(&path, &xlsx::grouped_workbook(groups)?)?;
        Ok(path)
    }
}

impl NotesExporter for FileExporter {
    fn export_notes(
        &self,
        combined: &str,
        format: ExportFormat,
        filename: &str,
    ) -> Result<PathBuf, ExportError> {
        let bytes = match format {
            ExportFormat::Pdf => pdf::render_pdf(pdf::DOCUMENT_TITLE, combined)?,
            ExportFormat::Excel => xlsx::notes_workbook(combined)?,
        };
        let path = self.target(filename, format.extension());
        self.write(&path, &bytes)?;
        Ok(path)
    }
}

/// File stem reduced to safe characters; directories and a trailing
/// `.extension` are dropped
pub fn safe_file_stem(filename: &str, extension: &str) -> String {
    let name = Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let name = name
        .strip_suffix(&format!(".{}", extension))
        .unwrap_or(name);

    let stem: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let stem = stem.trim_matches('.');

    if stem.is_empty() {
        DEFAULT_NOTES_NAME.to_string()
    } else {
        stem.to_string()
    }
}
