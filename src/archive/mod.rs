//! Local archive of shared files.
//!
//! Files are copied into one private directory and described by JSON
//! sidecars. There is no separate index: the directory is re-read on every
//! `load`.
//!
//! # Storage Layout
//!
//! ```text
//! ~/.archiver/
//! ├── settings.json             # Sort order preference
//! └── archived_files/
//!     ├── <id>.content          # Bytes as received
//!     └── <id>.metadata         # {"name": ..., "contentType": ...}
//! ```
//!
//! `<id>` is a UUIDv7 in 32-digit hex, so file names sort by creation time.

pub mod catalog;
pub mod content;
pub mod error;
pub mod id;
pub mod metadata;
pub mod view;

pub use catalog::{Catalog, IncomingFile};
pub use content::{ArtifactRole, ContentStore, RawArtifact};
pub use error::{ArchiveError, ArchiveResult};
pub use id::{new_id, ArchiveId};
pub use metadata::MetadataRecord;
pub use view::{sort_items, SortedView};
