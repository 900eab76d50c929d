//! In-memory catalog of archived files.
//!
//! The catalog is rebuilt from the content store's directory on `load` and
//! kept current by `add`, `delete` and `rename`. Its state lives in a
//! `watch` channel so readers always see the latest list without waiting on
//! mutations. Mutations are serialized by a single async gate.

use std::path::{Path, PathBuf};

use tokio::io::AsyncRead;
use tokio::sync::{watch, Mutex};

use super::content::{ArtifactRole, ContentStore, RawArtifact};
use super::error::{ArchiveError, ArchiveResult};
use super::id::ArchiveId;
use super::metadata::{MetadataRecord, DEFAULT_CONTENT_TYPE, DEFAULT_NAME};
use crate::domain::{guess_content_type, ArchiveItem, FileKind};

/// A file offered for archiving
pub struct IncomingFile<R> {
    /// User-facing name
    pub display_name: String,

    /// Content type reported by the source, if any
    pub content_type_hint: Option<String>,

    /// The bytes
    pub reader: R,

    /// Size reported by the source, if any
    pub declared_size: Option<u64>,
}

impl<R: AsyncRead + Unpin> IncomingFile<R> {
    /// Create an incoming file from a name and a byte stream
    pub fn new(display_name: impl Into<String>, reader: R) -> Self {
        Self {
            display_name: display_name.into(),
            content_type_hint: None,
            reader,
            declared_size: None,
        }
    }

    /// Set the content type hint
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type_hint = Some(content_type.into());
        self
    }

    /// Set the declared size
    pub fn with_declared_size(mut self, size: u64) -> Self {
        self.declared_size = Some(size);
        self
    }

    /// Name to store, never empty
    fn resolved_name(&self) -> String {
        let name = self.display_name.trim();
        if name.is_empty() {
            DEFAULT_NAME.to_string()
        } else {
            name.to_string()
        }
    }

    /// Content type to store: the hint, a guess from the name, or the default
    fn resolved_content_type(&self, name: &str) -> String {
        self.content_type_hint
            .as_deref()
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .or_else(|| guess_content_type(name))
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string()
    }
}

impl IncomingFile<tokio::fs::File> {
    /// Open a local file for import
    pub async fn open(path: &Path) -> ArchiveResult<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| ArchiveError::io(path, e))?;
        let size = file
            .metadata()
            .await
            .map_err(|e| ArchiveError::io(path, e))?
            .len();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self::new(name, file).with_declared_size(size))
    }
}

/// Catalog of all archived files
pub struct Catalog {
    store: ContentStore,
    state: watch::Sender<Vec<ArchiveItem>>,
    gate: Mutex<()>,
}

impl Catalog {
    /// Create an empty catalog over a content store. Call `load` to populate.
    pub fn new(store: ContentStore) -> Self {
        let (state, _) = watch::channel(Vec::new());
        Self {
            store,
            state,
            gate: Mutex::new(()),
        }
    }

    /// Create an empty catalog over the given storage directory
    pub fn open_at(dir: impl Into<PathBuf>) -> Self {
        Self::new(ContentStore::new(dir))
    }

    /// The underlying content store
    pub fn store(&self) -> &ContentStore {
        &self.store
    }

    /// Rebuild the item list from the storage directory.
    ///
    /// Creates the directory if needed. Entries that do not parse as content
    /// artifacts are skipped. Returns the number of items loaded.
    pub async fn load(&self) -> ArchiveResult<usize> {
        let _guard = self.gate.lock().await;

        tracing::debug!("Loading archive from {}", self.store.dir().display());
        self.store.ensure_dir().await?;

        let swept = self.store.sweep_partials().await;
        if swept > 0 {
            tracing::info!("Removed {} interrupted copies", swept);
        }

        let artifacts = self.store.list().await?;
        let mut items = Vec::new();

        for artifact in &artifacts {
            if let Some(item) = self.parse_artifact(artifact).await {
                items.push(item);
            }
        }

        items.sort_by(|a, b| a.id.cmp(&b.id));
        let count = items.len();
        self.state.send_replace(items);

        tracing::info!(
            "Loaded {} items ({} directory entries)",
            count,
            artifacts.len()
        );

        Ok(count)
    }

    /// Turn a directory entry into an item, if it is a readable content artifact
    async fn parse_artifact(&self, artifact: &RawArtifact) -> Option<ArchiveItem> {
        let id = match ArtifactRole::classify(&artifact.file_name) {
            ArtifactRole::Content(id) => id,
            ArtifactRole::Metadata(_) | ArtifactRole::Partial | ArtifactRole::Lock => return None,
            ArtifactRole::Foreign => {
                tracing::warn!(
                    "Skipping unrecognized entry: {} (expected <id>.content)",
                    artifact.file_name
                );
                return None;
            }
        };

        if !artifact.is_file {
            tracing::warn!("Skipping non-file: {}", artifact.file_name);
            return None;
        }

        let stat = match self.store.stat(&artifact.path).await {
            Ok(stat) => stat,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", artifact.file_name, e);
                return None;
            }
        };

        let metadata = self.store.read_metadata(&id).await;

        Some(ArchiveItem::new(
            id,
            metadata.name_or_default(),
            artifact.path.clone(),
            metadata.content_type_or_default(),
            stat.size_bytes,
            stat.modified_at,
        ))
    }

    /// Store a new file and register it.
    ///
    /// The content is persisted first, then its sidecar. If the sidecar
    /// cannot be written the content is removed again and the add fails.
    pub async fn add<R>(&self, mut incoming: IncomingFile<R>) -> ArchiveResult<ArchiveItem>
    where
        R: AsyncRead + Unpin,
    {
        let _guard = self.gate.lock().await;

        let name = incoming.resolved_name();
        let content_type = incoming.resolved_content_type(&name);

        tracing::debug!("Adding file: {} ({})", name, content_type);

        let (id, storage_path) = self.store.persist(&name, &mut incoming.reader).await?;

        let record = MetadataRecord::new(&name, &content_type);
        self.commit_metadata(&id, &storage_path, &record).await?;

        let stat = match self.store.stat(&storage_path).await {
            Ok(stat) => stat,
            Err(e) => {
                self.discard(&id, &storage_path).await;
                return Err(e);
            }
        };

        if let Some(declared) = incoming.declared_size {
            if declared != stat.size_bytes {
                tracing::warn!(
                    "Size mismatch for {}: declared {}, stored {}",
                    name,
                    declared,
                    stat.size_bytes
                );
            }
        }

        let item = ArchiveItem::new(
            id,
            name,
            storage_path,
            content_type,
            stat.size_bytes,
            stat.modified_at,
        );

        self.state.send_modify(|items| {
            if let Some(existing) = items.iter_mut().find(|i| i.id == item.id) {
                *existing = item.clone();
            } else {
                items.push(item.clone());
            }
        });

        tracing::info!("Added {} as {}", item.display_name, item.id);
        Ok(item)
    }

    /// Write the sidecar of freshly persisted content, discarding the
    /// content if that fails
    async fn commit_metadata(
        &self,
        id: &ArchiveId,
        storage_path: &Path,
        record: &MetadataRecord,
    ) -> ArchiveResult<()> {
        if let Err(e) = self.store.write_metadata(id, record).await {
            self.discard(id, storage_path).await;
            return Err(e);
        }
        Ok(())
    }

    /// Best-effort removal of a half-registered item
    async fn discard(&self, id: &ArchiveId, storage_path: &Path) {
        if let Err(e) = self.store.remove(storage_path).await {
            tracing::warn!("Failed to clean up content for {}: {}", id, e);
        }
        if let Err(e) = self.store.remove_metadata(id).await {
            tracing::warn!("Failed to clean up metadata for {}: {}", id, e);
        }
    }

    /// Delete an item's artifacts and drop it from the catalog.
    ///
    /// The in-memory entry is removed only once the content artifact is gone.
    /// A missing sidecar is not an error.
    pub async fn delete(&self, id: &ArchiveId) -> ArchiveResult<ArchiveItem> {
        let _guard = self.gate.lock().await;

        let item = self
            .find_by_id(id)
            .ok_or_else(|| ArchiveError::NotFound(id.clone()))?;

        tracing::debug!("Deleting {} ({})", item.display_name, id);

        if !self.store.remove(&item.storage_path).await? {
            tracing::warn!("Content for {} was already gone", id);
        }

        // Content is gone, so the item is gone; a stray sidecar is ignored by load
        if let Err(e) = self.store.remove_metadata(id).await {
            tracing::warn!("Left orphaned metadata for {}: {}", id, e);
        }

        self.state.send_modify(|items| items.retain(|i| &i.id != id));

        tracing::info!("Deleted {}", item.display_name);
        Ok(item)
    }

    /// Give an item a new display name.
    ///
    /// The sidecar is rewritten first; the catalog only changes once that
    /// write has succeeded.
    pub async fn rename(&self, id: &ArchiveId, new_name: &str) -> ArchiveResult<ArchiveItem> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ArchiveError::InvalidName(new_name.to_string()));
        }

        let _guard = self.gate.lock().await;

        let item = self
            .find_by_id(id)
            .ok_or_else(|| ArchiveError::NotFound(id.clone()))?;

        if !tokio::fs::try_exists(&item.storage_path)
            .await
            .unwrap_or(false)
        {
            return Err(ArchiveError::io(
                &item.storage_path,
                std::io::ErrorKind::NotFound.into(),
            ));
        }

        let record = MetadataRecord::new(new_name, &item.content_type);
        self.store.write_metadata(id, &record).await?;

        let updated = item.renamed(new_name);
        self.state.send_modify(|items| {
            if let Some(existing) = items.iter_mut().find(|i| &i.id == id) {
                *existing = updated.clone();
            }
        });

        tracing::info!("Renamed {} to {}", item.display_name, updated.display_name);
        Ok(updated)
    }

    /// Look up an item by id. Never touches storage.
    pub fn find_by_id(&self, id: &ArchiveId) -> Option<ArchiveItem> {
        self.state.borrow().iter().find(|i| &i.id == id).cloned()
    }

    /// Snapshot of all items, in load/add order
    pub fn items(&self) -> Vec<ArchiveItem> {
        self.state.borrow().clone()
    }

    /// Subscribe to the item list
    pub fn subscribe(&self) -> watch::Receiver<Vec<ArchiveItem>> {
        self.state.subscribe()
    }

    /// Search display names (case-insensitive substring match)
    pub fn search(&self, query: &str) -> Vec<ArchiveItem> {
        let query_lower = query.to_lowercase();

        self.state
            .borrow()
            .iter()
            .filter(|item| item.display_name.to_lowercase().contains(&query_lower))
            .cloned()
            .collect()
    }

    /// Items of one kind
    pub fn filter_by_kind(&self, kind: FileKind) -> Vec<ArchiveItem> {
        self.state
            .borrow()
            .iter()
            .filter(|item| item.kind == kind)
            .cloned()
            .collect()
    }

    /// Get the number of items
    pub fn len(&self) -> usize {
        self.state.borrow().len()
    }

    /// Check if the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn text_file(name: &str, body: &'static [u8]) -> IncomingFile<&'static [u8]> {
        IncomingFile::new(name, body).with_content_type("text/plain")
    }

    #[tokio::test]
    async fn test_add_and_find() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        let item = catalog.add(text_file("a.txt", b"alpha")).await.unwrap();

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.find_by_id(&item.id), Some(item.clone()));
        assert_eq!(item.size_bytes, 5);
        assert_eq!(item.kind, FileKind::Text);
        assert!(item.storage_path.exists());
        assert!(catalog.store().metadata_path(&item.id).exists());
    }

    #[tokio::test]
    async fn test_add_defaults() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        let blank = catalog
            .add(IncomingFile::new("   ", &b"?"[..]))
            .await
            .unwrap();
        assert_eq!(blank.display_name, DEFAULT_NAME);
        assert_eq!(blank.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(blank.kind, FileKind::Other);

        let guessed = catalog
            .add(IncomingFile::new("pic.png", &b"\x89PNG"[..]))
            .await
            .unwrap();
        assert_eq!(guessed.content_type, "image/png");
        assert_eq!(guessed.kind, FileKind::Image);
    }

    #[tokio::test]
    async fn test_find_missing_is_none() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        assert!(catalog.find_by_id(&ArchiveId::new()).is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_is_not_found() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        let result = catalog.delete(&ArchiveId::new()).await;
        assert!(matches!(result, Err(ArchiveError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_tolerates_missing_artifacts() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        let item = catalog.add(text_file("a.txt", b"alpha")).await.unwrap();
        tokio::fs::remove_file(&item.storage_path).await.unwrap();
        tokio::fs::remove_file(catalog.store().metadata_path(&item.id))
            .await
            .unwrap();

        catalog.delete(&item.id).await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_rename_rejects_blank_name() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        let item = catalog.add(text_file("a.txt", b"alpha")).await.unwrap();
        let result = catalog.rename(&item.id, "  ").await;

        assert!(matches!(result, Err(ArchiveError::InvalidName(_))));
        assert_eq!(catalog.find_by_id(&item.id).unwrap().display_name, "a.txt");
    }

    #[tokio::test]
    async fn test_rename_of_vanished_content_fails_cleanly() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        let item = catalog.add(text_file("a.txt", b"alpha")).await.unwrap();
        tokio::fs::remove_file(&item.storage_path).await.unwrap();

        let result = catalog.rename(&item.id, "b.txt").await;
        assert!(matches!(result, Err(ArchiveError::Io { .. })));
        assert_eq!(catalog.find_by_id(&item.id).unwrap().display_name, "a.txt");
    }

    /// Put a non-empty directory where a file is expected
    async fn block_with_dir(path: &Path) {
        let _ = tokio::fs::remove_file(path).await;
        tokio::fs::create_dir(path).await.unwrap();
        tokio::fs::write(path.join("occupied"), b"x").await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_content_delete_keeps_item() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        let item = catalog.add(text_file("a.txt", b"alpha")).await.unwrap();
        block_with_dir(&item.storage_path).await;

        let result = catalog.delete(&item.id).await;
        assert!(matches!(result, Err(ArchiveError::Io { .. })));
        assert_eq!(catalog.find_by_id(&item.id), Some(item.clone()));
        assert!(catalog.store().metadata_path(&item.id).exists());
    }

    #[tokio::test]
    async fn test_failed_sidecar_write_keeps_old_name() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        let item = catalog.add(text_file("a.txt", b"alpha")).await.unwrap();
        block_with_dir(&catalog.store().metadata_path(&item.id)).await;

        let result = catalog.rename(&item.id, "b.txt").await;
        assert!(matches!(result, Err(ArchiveError::Io { .. })));
        assert_eq!(catalog.find_by_id(&item.id).unwrap().display_name, "a.txt");
        assert!(catalog.search("b.txt").is_empty());
    }

    #[tokio::test]
    async fn test_failed_sidecar_on_add_discards_content() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        let mut reader: &[u8] = b"orphan";
        let (id, storage_path) = catalog.store().persist("x.txt", &mut reader).await.unwrap();
        block_with_dir(&catalog.store().metadata_path(&id)).await;

        let record = MetadataRecord::new("x.txt", "text/plain");
        let result = catalog.commit_metadata(&id, &storage_path, &record).await;

        assert!(matches!(result, Err(ArchiveError::Io { .. })));
        assert!(!storage_path.exists());
        assert!(catalog.is_empty());
        assert_eq!(catalog.load().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_search_and_filter() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());

        catalog.add(text_file("Rust Notes.txt", b"1")).await.unwrap();
        catalog
            .add(IncomingFile::new("todo.md", &b"- [ ] x"[..]))
            .await
            .unwrap();
        catalog
            .add(IncomingFile::new("cat.jpg", &b"jpg"[..]).with_content_type("image/jpeg"))
            .await
            .unwrap();

        assert_eq!(catalog.search("rust").len(), 1);
        assert_eq!(catalog.search("NOTES").len(), 1);
        assert_eq!(catalog.search("python").len(), 0);

        assert_eq!(catalog.filter_by_kind(FileKind::Markdown).len(), 1);
        assert_eq!(catalog.filter_by_kind(FileKind::Image).len(), 1);
        assert_eq!(catalog.filter_by_kind(FileKind::Other).len(), 0);
    }

    #[tokio::test]
    async fn test_load_missing_directory_creates_it() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("archived_files");
        let catalog = Catalog::open_at(&dir);

        assert_eq!(catalog.load().await.unwrap(), 0);
        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn test_subscribers_see_mutations() {
        let temp = TempDir::new().unwrap();
        let catalog = Catalog::open_at(temp.path());
        let mut rx = catalog.subscribe();

        catalog.add(text_file("a.txt", b"alpha")).await.unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }
}
