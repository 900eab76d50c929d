//! Domain types for the archive.
//!
//! This module contains the core data structures:
//! - ArchiveItem: A stored file as seen by consumers
//! - FileKind: Rendering category derived from name and content type
//! - SortOrder: User preference for listing order

pub mod item;
pub mod kind;
pub mod sort;

// Re-export commonly used types
pub use item::ArchiveItem;
pub use kind::{guess_content_type, FileKind};
pub use sort::SortOrder;
