//! Configuration for archiver paths.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (ARCHIVER_HOME, ARCHIVER_DIR)
//! 2. Config file (.archiver/config.yaml)
//! 3. Defaults (~/.archiver)
//!
//! Config file discovery:
//! - Searches current directory and parents for .archiver/config.yaml
//! - `paths.home` is relative to the .archiver/ directory
//! - `paths.archive` is relative to the directory containing .archiver/

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::SortOrder;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Name of the archive directory under home
const ARCHIVE_DIR_NAME: &str = "archived_files";

/// Name of the preference file under home
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub defaults: Option<DefaultsConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .archiver/)
    pub home: Option<String>,
    /// Archive directory (relative to the project root)
    pub archive: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DefaultsConfig {
    /// Sort order used until the user picks one (DATE or FILENAME)
    pub sort_order: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to archiver home (settings)
    pub home: PathBuf,
    /// Absolute path to the archive directory
    pub archive: PathBuf,
    /// Path to the preference file
    pub settings: PathBuf,
    /// Sort order used when no preference is saved
    pub default_sort_order: SortOrder,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".archiver").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    // Default home directory
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".archiver");

    let config_file = find_config_file();

    let (home, archive, default_sort_order) = if let Some(ref config_path) = config_file {
        let config = load_config_file(config_path)?;

        // .archiver/ and the project root that contains it
        let archiver_dir = config_path.parent().unwrap_or(Path::new("."));
        let base_dir = archiver_dir.parent().unwrap_or(Path::new("."));

        let home = if let Ok(env_home) = std::env::var("ARCHIVER_HOME") {
            PathBuf::from(env_home)
        } else if let Some(ref home_path) = config.paths.home {
            resolve_path(archiver_dir, home_path)
        } else {
            default_home.clone()
        };

        let archive = if let Ok(env_dir) = std::env::var("ARCHIVER_DIR") {
            PathBuf::from(env_dir)
        } else if let Some(ref archive_path) = config.paths.archive {
            resolve_path(base_dir, archive_path)
        } else {
            home.join(ARCHIVE_DIR_NAME)
        };

        let default_sort_order = config
            .defaults
            .as_ref()
            .and_then(|d| d.sort_order.as_deref())
            .map(SortOrder::parse_or_default)
            .unwrap_or_default();

        (home, archive, default_sort_order)
    } else {
        // No config file - use env vars or defaults
        let home = std::env::var("ARCHIVER_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_home.clone());

        let archive = std::env::var("ARCHIVER_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| home.join(ARCHIVE_DIR_NAME));

        (home, archive, SortOrder::default())
    };

    Ok(ResolvedConfig {
        settings: home.join(SETTINGS_FILE_NAME),
        home,
        archive,
        default_sort_order,
        config_file,
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| e.to_string()));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Force reload configuration (useful for testing)
pub fn reload_config() -> Result<ResolvedConfig> {
    load_config()
}

/// Get the archive directory.
pub fn archive_dir() -> Result<PathBuf> {
    Ok(config()?.archive.clone())
}

/// Get the preference file path.
pub fn settings_path() -> Result<PathBuf> {
    Ok(config()?.settings.clone())
}
