//! On-disk storage of archived content.
//!
//! Every stored file occupies a pair of entries in one private directory:
//!
//! ```text
//! archived_files/
//! ├── <id>.content      # The bytes, exactly as received
//! ├── <id>.metadata     # JSON sidecar: display name, content type
//! ├── .archive.lock     # Held shared by writers, exclusive by the sweep
//! └── .incoming-*.partial  # In-flight copy, never listed as an item
//! ```
//!
//! The directory listing is the only index. Content is copied into a hidden
//! temp file and renamed into place once complete, so a `<id>.content`
//! entry always holds a finished copy.
//!
//! Several processes may share the directory. Writers hold a shared lock on
//! `.archive.lock` while their temp files exist; leftover temp files are
//! only swept when the exclusive lock can be taken, so a copy still running
//! in another process is never mistaken for a crash leftover.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};

use super::error::{ArchiveError, ArchiveResult};
use super::id::ArchiveId;
use super::metadata::{self, MetadataRecord};

/// Extension of content artifacts
pub const CONTENT_EXT: &str = "content";

/// Extension of metadata sidecars
pub const METADATA_EXT: &str = "metadata";

/// Name of the writer lock file
pub const LOCK_FILE_NAME: &str = ".archive.lock";

const PARTIAL_PREFIX: &str = ".incoming-";
const PARTIAL_SUFFIX: &str = ".partial";
const METADATA_TEMP_SUFFIX: &str = ".metadata.tmp";

/// A directory entry as found on disk
#[derive(Debug, Clone)]
pub struct RawArtifact {
    /// Full path of the entry
    pub path: PathBuf,

    /// File name (lossy UTF-8)
    pub file_name: String,

    /// Whether the entry is a regular file
    pub is_file: bool,
}

/// What a directory entry is, judged by its name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactRole {
    /// `<id>.content`
    Content(ArchiveId),

    /// `<id>.metadata`
    Metadata(ArchiveId),

    /// Temp file of a write that is running or was interrupted
    Partial,

    /// The writer lock file
    Lock,

    /// Anything not written by this store
    Foreign,
}

impl ArtifactRole {
    /// Classify a file name
    pub fn classify(file_name: &str) -> Self {
        if file_name == LOCK_FILE_NAME {
            return ArtifactRole::Lock;
        }

        if (file_name.starts_with(PARTIAL_PREFIX) && file_name.ends_with(PARTIAL_SUFFIX))
            || file_name.ends_with(METADATA_TEMP_SUFFIX)
        {
            return ArtifactRole::Partial;
        }

        let Some((stem, ext)) = file_name.rsplit_once('.') else {
            return ArtifactRole::Foreign;
        };

        match (ArchiveId::parse(stem), ext) {
            (Some(id), CONTENT_EXT) => ArtifactRole::Content(id),
            (Some(id), METADATA_EXT) => ArtifactRole::Metadata(id),
            _ => ArtifactRole::Foreign,
        }
    }
}

/// Size and timestamp of a content artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactStat {
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

/// Run blocking filesystem work off the async runtime
async fn blocking<T, F>(f: F) -> ArchiveResult<T>
where
    F: FnOnce() -> ArchiveResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

fn open_lock_file(path: &Path) -> ArchiveResult<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| ArchiveError::io(path, e))
}

/// Filesystem-backed content store rooted at one private directory
#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
}

impl ContentStore {
    /// Create a store rooted at `dir`. Nothing is touched on disk yet.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the store
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the content artifact for an id
    pub fn content_path(&self, id: &ArchiveId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, CONTENT_EXT))
    }

    /// Path of the metadata sidecar for an id
    pub fn metadata_path(&self, id: &ArchiveId) -> PathBuf {
        self.dir.join(format!("{}.{}", id, METADATA_EXT))
    }

    /// Path of the writer lock file
    pub fn lock_path(&self) -> PathBuf {
        self.dir.join(LOCK_FILE_NAME)
    }

    /// Create the storage directory if it does not exist yet
    pub async fn ensure_dir(&self) -> ArchiveResult<()> {
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| ArchiveError::io(&self.dir, e))
    }

    /// Take the writer lock in shared mode.
    ///
    /// Held for as long as a temp file of ours may exist. Released when the
    /// returned file is dropped.
    async fn lock_shared(&self) -> ArchiveResult<File> {
        let lock_path = self.lock_path();
        blocking(move || {
            let lock = open_lock_file(&lock_path)?;
            FileExt::lock_shared(&lock).map_err(|e| ArchiveError::io(&lock_path, e))?;
            Ok(lock)
        })
        .await
    }

    /// Take the writer lock exclusively, or `None` if a writer holds it
    async fn try_lock_exclusive(&self) -> ArchiveResult<Option<File>> {
        let lock_path = self.lock_path();
        blocking(move || {
            let lock = open_lock_file(&lock_path)?;
            match lock.try_lock_exclusive() {
                Ok(()) => Ok(Some(lock)),
                Err(_) => Ok(None),
            }
        })
        .await
    }

    /// Copy a byte stream into the store under a fresh id.
    ///
    /// The bytes go to a hidden temp file first, are synced, and only then
    /// renamed to `<id>.content`. On any error the temp file is removed.
    pub async fn persist<R>(&self, name: &str, reader: &mut R) -> ArchiveResult<(ArchiveId, PathBuf)>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.ensure_dir().await?;
        let _lock = self.lock_shared().await?;

        let dir = self.dir.clone();
        let temp = blocking(move || {
            tempfile::Builder::new()
                .prefix(PARTIAL_PREFIX)
                .suffix(PARTIAL_SUFFIX)
                .tempfile_in(&dir)
                .map_err(|e| ArchiveError::io(&dir, e))
        })
        .await?;

        let copied = match copy_into(&temp, reader).await {
            Ok(copied) => copied,
            Err(e) => {
                blocking(move || {
                    drop(temp);
                    Ok(())
                })
                .await?;
                return Err(e);
            }
        };

        let id = ArchiveId::new();
        let storage_path = self.content_path(&id);
        let target = storage_path.clone();
        blocking(move || {
            temp.persist(&target)
                .map(drop)
                .map_err(|e| ArchiveError::io(&target, e.error))
        })
        .await?;

        tracing::debug!(
            id = %id,
            name = %name,
            bytes = copied,
            "Persisted content to {}",
            storage_path.display()
        );

        Ok((id, storage_path))
    }

    /// Delete an artifact. Returns `false` if it was already gone.
    pub async fn remove(&self, path: &Path) -> ArchiveResult<bool> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ArchiveError::io(path, e)),
        }
    }

    /// Delete the metadata sidecar for an id. Returns `false` if there was none.
    pub async fn remove_metadata(&self, id: &ArchiveId) -> ArchiveResult<bool> {
        self.remove(&self.metadata_path(id)).await
    }

    /// Read the sidecar for an id, empty if missing or malformed
    pub async fn read_metadata(&self, id: &ArchiveId) -> MetadataRecord {
        metadata::read_sidecar(&self.metadata_path(id)).await
    }

    /// Replace the sidecar for an id.
    ///
    /// Renames are recorded here; the content path never changes.
    pub async fn write_metadata(&self, id: &ArchiveId, record: &MetadataRecord) -> ArchiveResult<()> {
        self.ensure_dir().await?;
        let _lock = self.lock_shared().await?;
        metadata::write_sidecar(&self.metadata_path(id), record).await
    }

    /// Size and modification time of an artifact
    pub async fn stat(&self, path: &Path) -> ArchiveResult<ArtifactStat> {
        let meta = fs::metadata(path)
            .await
            .map_err(|e| ArchiveError::io(path, e))?;
        let modified = meta.modified().map_err(|e| ArchiveError::io(path, e))?;

        Ok(ArtifactStat {
            size_bytes: meta.len(),
            modified_at: DateTime::<Utc>::from(modified),
        })
    }

    /// Enumerate the storage directory. A missing directory lists as empty.
    pub async fn list(&self) -> ArchiveResult<Vec<RawArtifact>> {
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ArchiveError::io(&self.dir, e)),
        };

        let mut artifacts = Vec::new();

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ArchiveError::io(&self.dir, e))?
        {
            let is_file = match entry.file_type().await {
                Ok(ft) => ft.is_file(),
                Err(e) => {
                    tracing::warn!("Cannot stat {}: {}", entry.path().display(), e);
                    false
                }
            };

            artifacts.push(RawArtifact {
                path: entry.path(),
                file_name: entry.file_name().to_string_lossy().into_owned(),
                is_file,
            });
        }

        Ok(artifacts)
    }

    /// Remove temp files left behind by interrupted writes.
    ///
    /// Skipped entirely while any writer, in this process or another, holds
    /// the shared lock. Returns the number removed. Failures are logged and
    /// skipped.
    pub async fn sweep_partials(&self) -> usize {
        let _lock = match self.try_lock_exclusive().await {
            Ok(Some(lock)) => lock,
            Ok(None) => {
                tracing::debug!("Writes in progress, leaving partial files alone");
                return 0;
            }
            Err(e) => {
                tracing::warn!("Cannot lock archive for sweeping: {}", e);
                return 0;
            }
        };

        let artifacts = match self.list().await {
            Ok(artifacts) => artifacts,
            Err(e) => {
                tracing::warn!("Cannot scan for partial files: {}", e);
                return 0;
            }
        };

        let mut removed = 0;
        for artifact in artifacts {
            if !artifact.is_file || ArtifactRole::classify(&artifact.file_name) != ArtifactRole::Partial {
                continue;
            }

            match self.remove(&artifact.path).await {
                Ok(true) => {
                    tracing::debug!("Removed partial file {}", artifact.file_name);
                    removed += 1;
                }
                Ok(false) => {}
                Err(e) => tracing::warn!("Failed to remove partial file: {}", e),
            }
        }

        removed
    }
}

/// Stream into an open temp file, then flush and sync it
async fn copy_into<R>(temp: &NamedTempFile, reader: &mut R) -> ArchiveResult<u64>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let temp_path = temp.path();
    let std_file = temp
        .as_file()
        .try_clone()
        .map_err(|e| ArchiveError::io(temp_path, e))?;
    let mut file = fs::File::from_std(std_file);

    let copied = tokio::io::copy(reader, &mut file)
        .await
        .map_err(|e| ArchiveError::io(temp_path, e))?;
    file.flush()
        .await
        .map_err(|e| ArchiveError::io(temp_path, e))?;
    file.sync_all()
        .await
        .map_err(|e| ArchiveError::io(temp_path, e))?;

    Ok(copied)
}
