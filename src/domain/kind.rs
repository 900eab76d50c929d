//! Display categories for archived files.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// How a stored file should be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Raster or vector image
    Image,

    /// Plain text (and PDF, which viewers show as a document)
    Text,

    /// Markdown source
    Markdown,

    /// Anything else
    Other,
}

impl FileKind {
    /// Categorize by content type alone
    pub fn from_content_type(content_type: &str) -> Self {
        let ct = content_type.trim().to_ascii_lowercase();
        // Strip parameters such as "; charset=utf-8"
        let ct = ct.split(';').next().unwrap_or("").trim();

        if ct.starts_with("image/") {
            FileKind::Image
        } else if ct == "text/markdown" {
            FileKind::Markdown
        } else if ct.starts_with("text/") || ct == "application/pdf" {
            FileKind::Text
        } else {
            FileKind::Other
        }
    }

    /// Categorize by file name extension first, then by content type.
    ///
    /// Only markdown is decided by extension since importers rarely label it.
    pub fn detect(file_name: &str, content_type: &str) -> Self {
        match extension(file_name).as_deref() {
            Some("md") | Some("markdown") => FileKind::Markdown,
            _ => Self::from_content_type(content_type),
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileKind::Image => write!(f, "image"),
            FileKind::Text => write!(f, "text"),
            FileKind::Markdown => write!(f, "markdown"),
            FileKind::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for FileKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "image" | "img" => Ok(FileKind::Image),
            "text" | "txt" => Ok(FileKind::Text),
            "markdown" | "md" => Ok(FileKind::Markdown),
            "other" => Ok(FileKind::Other),
            _ => anyhow::bail!("Unknown file kind: {}", s),
        }
    }
}

/// Lowercased extension of a file name, if any
fn extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Best-effort content type for a file name, used when the importer gives no hint
pub fn guess_content_type(file_name: &str) -> Option<&'static str> {
    let ct = match extension(file_name)?.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "svg" => "image/svg+xml",
        "heic" => "image/heic",
        "txt" | "log" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "xml" => "text/xml",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "mp4" => "video/mp4",
        _ => return None,
    };

    Some(ct)
}
