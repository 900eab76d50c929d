//! Errors surfaced by the archive store.

use std::path::PathBuf;

use thiserror::Error;

use super::id::ArchiveId;

/// Result alias for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that can occur while mutating the archive
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive item not found: {0}")]
    NotFound(ArchiveId),

    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    #[error("IO error on {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Metadata serialization error: {0}")]
    Metadata(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ArchiveError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
