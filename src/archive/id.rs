//! Identifiers for archived items.
//!
//! Ids are UUIDv7 values rendered as 32 lowercase hex characters. The
//! leading bits carry a millisecond timestamp, so plain string comparison
//! follows creation order.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the rendered id
const ID_LEN: usize = 32;

/// Unique, creation-order-sortable identifier of an archived item
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArchiveId(String);

impl ArchiveId {
    /// Generate a fresh id
    pub fn new() -> Self {
        Self(Uuid::now_v7().simple().to_string())
    }

    /// Parse an id taken from a file name.
    ///
    /// Returns `None` for anything that is not exactly 32 lowercase hex digits.
    pub fn parse(s: &str) -> Option<Self> {
        let well_formed = s.len() == ID_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));

        well_formed.then(|| Self(s.to_string()))
    }

    /// Get the raw string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ArchiveId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ArchiveId {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        Self::parse(s).ok_or_else(|| anyhow::anyhow!("Invalid archive id: {}", s))
    }
}

/// Generate a new id
pub fn new_id() -> ArchiveId {
    ArchiveId::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_filename_safe() {
        let id = new_id();
        assert_eq!(id.as_str().len(), ID_LEN);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_ids_sort_by_creation() {
        let ids: Vec<ArchiveId> = (0..500).map(|_| new_id()).collect();

        for pair in ids.windows(2) {
            assert!(pair[0] < pair[1], "{} !< {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_parse_roundtrip() {
        let id = new_id();
        assert_eq!(ArchiveId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert!(ArchiveId::parse("").is_none());
        assert!(ArchiveId::parse("notes").is_none());
        assert!(ArchiveId::parse("0123456789ABCDEF0123456789abcdef").is_none());
        assert!(ArchiveId::parse("0123456789abcdef0123456789abcde").is_none());
        assert!(ArchiveId::parse("0123456789abcdef0123456789abcdeg").is_none());
        assert!("xyz".parse::<ArchiveId>().is_err());
    }
}
