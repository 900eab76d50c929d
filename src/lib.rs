//! archiver - Personal local file archive
//!
//! Stores arbitrary files in a private directory, each with a small JSON
//! sidecar describing it, and presents the collection sorted by the user's
//! preferred order.
//!
//! # Architecture
//!
//! The storage directory is the database:
//! - Content is copied in under a time-sortable id (`<id>.content`)
//! - Display name and content type live in a sidecar (`<id>.metadata`)
//! - The in-memory catalog is rebuilt from the directory on load
//! - A sorted view re-sorts whenever the catalog or the sort preference changes
//!
//! # Modules
//!
//! - `archive`: Content store, metadata, catalog, sorted view
//! - `domain`: Data structures (ArchiveItem, FileKind, SortOrder)
//! - `preferences`: Persisted sort order
//! - `config`: Path resolution
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Archive some files
//! archiver add report.pdf photo.jpg
//!
//! # List them, newest first
//! archiver list --sort date
//!
//! # Rename or delete by id
//! archiver rename <id> report-final.pdf
//! archiver delete <id>
//! ```

pub mod archive;
pub mod cli;
pub mod config;
pub mod domain;
pub mod preferences;

// Re-export main types at crate root for convenience
pub use archive::{ArchiveError, ArchiveId, Catalog, ContentStore, IncomingFile, SortedView};
pub use domain::{ArchiveItem, FileKind, SortOrder};
pub use preferences::{PreferenceError, PreferenceStore};
