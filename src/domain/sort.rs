//! User-selectable ordering of the archive listing.

use serde::{Deserialize, Serialize};

/// Sort order preference
///
/// Persisted as `DATE` / `FILENAME`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    /// Most recently stored first
    #[default]
    #[serde(rename = "DATE")]
    ByDate,

    /// Display name, case-insensitive ascending
    #[serde(rename = "FILENAME")]
    ByName,
}

impl SortOrder {
    /// Persisted name of this order
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::ByDate => "DATE",
            SortOrder::ByName => "FILENAME",
        }
    }

    /// Parse a persisted value, falling back to the default for unknown input
    pub fn parse_or_default(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::ByDate => write!(f, "date"),
            SortOrder::ByName => write!(f, "name"),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "date" | "by_date" => Ok(SortOrder::ByDate),
            "name" | "filename" | "by_name" => Ok(SortOrder::ByName),
            _ => anyhow::bail!("Unknown sort order: {}", s),
        }
    }
}
