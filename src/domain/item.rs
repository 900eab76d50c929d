//! The in-memory view of one archived file.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::FileKind;
use crate::archive::ArchiveId;

/// A stored file as presented to consumers.
///
/// Always derived from what is on disk; never persisted as a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveItem {
    /// Unique, creation-order-sortable identifier
    pub id: ArchiveId,

    /// User-facing file name
    pub display_name: String,

    /// Location of the content artifact
    pub storage_path: PathBuf,

    /// MIME-like content type
    pub content_type: String,

    /// Length of the content artifact
    pub size_bytes: u64,

    /// Modification time of the content artifact
    pub stored_at: DateTime<Utc>,

    /// Rendering category
    pub kind: FileKind,
}

impl ArchiveItem {
    /// Build an item, deriving its kind from name and content type
    pub fn new(
        id: ArchiveId,
        display_name: impl Into<String>,
        storage_path: impl Into<PathBuf>,
        content_type: impl Into<String>,
        size_bytes: u64,
        stored_at: DateTime<Utc>,
    ) -> Self {
        let display_name = display_name.into();
        let content_type = content_type.into();
        let kind = FileKind::detect(&display_name, &content_type);

        Self {
            id,
            display_name,
            storage_path: storage_path.into(),
            content_type,
            size_bytes,
            stored_at,
            kind,
        }
    }

    /// Copy of this item under a new display name
    pub fn renamed(&self, new_name: impl Into<String>) -> Self {
        let display_name = new_name.into();
        Self {
            kind: FileKind::detect(&display_name, &self.content_type),
            display_name,
            ..self.clone()
        }
    }
}
