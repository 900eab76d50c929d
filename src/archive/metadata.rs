//! Sidecar metadata for archived content.
//!
//! Each `{id}.content` artifact may have a `{id}.metadata` sidecar holding
//! a small JSON object:
//!
//! ```json
//! {
//!   "name": "report.pdf",
//!   "contentType": "application/pdf"
//! }
//! ```
//!
//! Reading never fails. A missing or unreadable sidecar yields an empty
//! record and callers fill in defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::error::{ArchiveError, ArchiveResult};

/// Display name used when the sidecar has none
pub const DEFAULT_NAME: &str = "unknown";

/// Content type used when neither the sidecar nor the importer knows better
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Contents of a metadata sidecar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Display name override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Content type of the stored bytes
    #[serde(
        default,
        rename = "contentType",
        skip_serializing_if = "Option::is_none"
    )]
    pub content_type: Option<String>,
}

impl MetadataRecord {
    /// Record written for a freshly added file
    pub fn new(name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            content_type: Some(content_type.into()),
        }
    }

    /// Serialize to pretty JSON
    pub fn encode(&self) -> ArchiveResult<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Deserialize, falling back to an empty record on malformed input
    pub fn decode(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Malformed metadata, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Display name with the default applied
    pub fn name_or_default(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_NAME)
    }

    /// Content type with the default applied
    pub fn content_type_or_default(&self) -> &str {
        self.content_type
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

/// Read a sidecar file. Missing or unreadable files produce an empty record.
pub async fn read_sidecar(path: &Path) -> MetadataRecord {
    match fs::read(path).await {
        Ok(bytes) => MetadataRecord::decode(&bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No metadata sidecar at {}", path.display());
            MetadataRecord::default()
        }
        Err(e) => {
            tracing::warn!("Failed to read metadata {}: {}", path.display(), e);
            MetadataRecord::default()
        }
    }
}

/// Write a sidecar file via a temp file and rename.
pub async fn write_sidecar(path: &Path, record: &MetadataRecord) -> ArchiveResult<()> {
    let bytes = record.encode()?;
    let temp_path = path.with_extension("metadata.tmp");

    if let Err(e) = write_synced(&temp_path, &bytes).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(ArchiveError::io(&temp_path, e));
    }

    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(ArchiveError::io(path, e));
    }

    Ok(())
}

async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_decode_known_keys() {
        let record =
            MetadataRecord::decode(br#"{"name":"a.md","contentType":"text/markdown"}"#);
        assert_eq!(record.name.as_deref(), Some("a.md"));
        assert_eq!(record.content_type.as_deref(), Some("text/markdown"));
    }

    #[test]
    fn test_decode_malformed_is_empty() {
        assert_eq!(MetadataRecord::decode(b"{not json"), MetadataRecord::default());
        assert_eq!(MetadataRecord::decode(b""), MetadataRecord::default());
        assert_eq!(
            MetadataRecord::decode(br#"{"name": 42}"#),
            MetadataRecord::default()
        );
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let record = MetadataRecord::decode(br#"{"name":"x.txt","owner":"root"}"#);
        assert_eq!(record.name.as_deref(), Some("x.txt"));
        assert!(record.content_type.is_none());

        let json = String::from_utf8(record.encode().unwrap()).unwrap();
        assert!(!json.contains("owner"));
    }

    #[test]
    fn test_defaults() {
        let empty = MetadataRecord::default();
        assert_eq!(empty.name_or_default(), DEFAULT_NAME);
        assert_eq!(empty.content_type_or_default(), DEFAULT_CONTENT_TYPE);

        let blank = MetadataRecord::new("  ", "");
        assert_eq!(blank.name_or_default(), DEFAULT_NAME);
        assert_eq!(blank.content_type_or_default(), DEFAULT_CONTENT_TYPE);
    }

    #[test]
    fn test_encode_uses_camel_case_key() {
        let json =
            String::from_utf8(MetadataRecord::new("a", "text/plain").encode().unwrap()).unwrap();
        assert!(json.contains("\"contentType\": \"text/plain\""));
    }

    #[tokio::test]
    async fn test_sidecar_write_and_read() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc.metadata");

        assert_eq!(read_sidecar(&path).await, MetadataRecord::default());

        let record = MetadataRecord::new("photo.jpg", "image/jpeg");
        write_sidecar(&path, &record).await.unwrap();
        assert_eq!(read_sidecar(&path).await, record);
        assert!(!temp.path().join("abc.metadata.tmp").exists());
    }

    #[tokio::test]
    async fn test_sidecar_rewrite_replaces_whole_record() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc.metadata");

        write_sidecar(&path, &MetadataRecord::new("a-much-longer-name.txt", "text/plain"))
            .await
            .unwrap();
        let shorter = MetadataRecord::new("b.md", "text/markdown");
        write_sidecar(&path, &shorter).await.unwrap();

        assert_eq!(read_sidecar(&path).await, shorter);
        assert_eq!(
            tokio::fs::read(&path).await.unwrap(),
            shorter.encode().unwrap()
        );
    }

    #[tokio::test]
    async fn test_failed_sidecar_write_leaves_no_temp() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc.metadata");
        tokio::fs::create_dir(&path).await.unwrap();
        tokio::fs::write(path.join("occupied"), b"x").await.unwrap();

        let result = write_sidecar(&path, &MetadataRecord::new("x", "text/plain")).await;

        assert!(matches!(result, Err(ArchiveError::Io { .. })));
        assert!(!temp.path().join("abc.metadata.tmp").exists());
    }
}
