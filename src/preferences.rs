//! Persisted user preferences.
//!
//! Preferences live in a small JSON file next to the archive:
//!
//! ```json
//! { "sort_order": "DATE" }
//! ```
//!
//! The current sort order is published on a `watch` channel so views can
//! follow changes. Keys this module does not know are preserved on write.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::domain::SortOrder;

/// Errors that can occur while saving preferences
#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Preference writer panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// On-disk schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sort_order: Option<String>,

    #[serde(flatten)]
    other: serde_json::Map<String, serde_json::Value>,
}

/// File-backed preference store
pub struct PreferenceStore {
    path: PathBuf,
    sort_order: watch::Sender<SortOrder>,
}

impl PreferenceStore {
    /// Open the store at `path`.
    ///
    /// A missing or unreadable file yields `default_order`. Unknown sort
    /// order values fall back to `SortOrder::ByDate`.
    pub async fn open(path: impl Into<PathBuf>, default_order: SortOrder) -> Self {
        let path = path.into();
        let settings = read_settings(&path).await;

        let order = settings
            .and_then(|s| s.sort_order)
            .map(|s| SortOrder::parse_or_default(&s))
            .unwrap_or(default_order);

        tracing::debug!("Sort order preference: {}", order);

        let (sort_order, _) = watch::channel(order);
        Self { path, sort_order }
    }

    /// Path of the settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current sort order
    pub fn sort_order(&self) -> SortOrder {
        *self.sort_order.borrow()
    }

    /// Subscribe to sort order changes
    pub fn subscribe(&self) -> watch::Receiver<SortOrder> {
        self.sort_order.subscribe()
    }

    /// Persist a new sort order, then publish it.
    ///
    /// Subscribers are only notified once the write has succeeded.
    pub async fn set_sort_order(&self, order: SortOrder) -> Result<(), PreferenceError> {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_sort_order(&path, order)).await??;

        self.sort_order.send_replace(order);
        tracing::info!("Sort order set to {}", order);
        Ok(())
    }
}

async fn read_settings(path: &Path) -> Option<Settings> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Failed to read settings {}: {}", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::warn!("Ignoring malformed settings {}: {}", path.display(), e);
            None
        }
    }
}

/// Read-modify-write the settings file under an exclusive lock
fn write_sort_order(path: &Path, order: SortOrder) -> Result<(), PreferenceError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let lock_path = path.with_extension("lock");
    let lock = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)?;
    lock.lock_exclusive()?;

    let mut settings: Settings = match std::fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
        Err(_) => Settings::default(),
    };
    settings.sort_order = Some(order.as_str().to_string());

    let temp_path = path.with_extension("json.tmp");
    let result = (|| -> Result<(), PreferenceError> {
        let mut file = File::create(&temp_path)?;
        file.write_all(serde_json::to_string_pretty(&settings)?.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&temp_path, path)?;
        Ok(())
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }

    lock.unlock()?;
    result
}
