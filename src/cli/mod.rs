//! Command-line interface for archiver.
//!
//! Provides commands for adding files to the archive, listing and searching
//! them in the preferred order, renaming, deleting and managing the sort
//! preference.

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;

use crate::archive::{sort_items, ArchiveId, Catalog, IncomingFile, SortedView};
use crate::domain::{ArchiveItem, FileKind, SortOrder};
use crate::preferences::PreferenceStore;

/// archiver - Personal local file archive
#[derive(Parser, Debug)]
#[command(name = "archiver")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add files to the archive
    Add {
        /// Files to add
        paths: Vec<PathBuf>,

        /// Content type (guessed from the file name if not specified)
        #[arg(short, long)]
        content_type: Option<String>,

        /// Display name (single file or stdin only)
        #[arg(short, long)]
        name: Option<String>,

        /// Read the file content from stdin
        #[arg(long)]
        stdin: bool,
    },

    /// List archived files
    List {
        /// Sort order (uses the saved preference if not specified)
        #[arg(short, long, value_enum)]
        sort: Option<SortArg>,

        /// Only show files of this kind
        #[arg(short, long, value_enum)]
        kind: Option<KindArg>,

        /// Maximum number of files to show
        #[arg(short, long, default_value = "50")]
        limit: usize,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search archived files by name
    Search {
        /// Search query (case-insensitive substring)
        query: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show details of an archived file
    Show {
        /// Archive ID
        id: String,
    },

    /// Rename an archived file
    Rename {
        /// Archive ID
        id: String,

        /// New display name
        new_name: String,
    },

    /// Delete an archived file
    Delete {
        /// Archive ID
        id: String,
    },

    /// Show or set the saved sort order
    Sort {
        /// New sort order
        #[arg(value_enum)]
        order: Option<SortArg>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Sort order for CLI (maps to SortOrder)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    /// Most recent first
    Date,

    /// By name, A to Z
    Name,
}

impl From<SortArg> for SortOrder {
    fn from(s: SortArg) -> Self {
        match s {
            SortArg::Date => SortOrder::ByDate,
            SortArg::Name => SortOrder::ByName,
        }
    }
}

/// File kind for CLI (maps to FileKind)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum KindArg {
    Image,
    Text,
    Markdown,
    Other,
}

impl From<KindArg> for FileKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::Image => FileKind::Image,
            KindArg::Text => FileKind::Text,
            KindArg::Markdown => FileKind::Markdown,
            KindArg::Other => FileKind::Other,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Add {
                paths,
                content_type,
                name,
                stdin,
            } => add_files(paths, content_type, name, stdin).await,
            Commands::List {
                sort,
                kind,
                limit,
                json,
            } => list_files(sort, kind, limit, json).await,
            Commands::Search { query, json } => search_files(&query, json).await,
            Commands::Show { id } => show_file(&id).await,
            Commands::Rename { id, new_name } => rename_file(&id, &new_name).await,
            Commands::Delete { id } => delete_file(&id).await,
            Commands::Sort { order } => sort_preference(order).await,
            Commands::Config => show_config(),
        }
    }
}

/// Open and load the catalog at the configured location
async fn open_catalog() -> Result<Catalog> {
    let dir = crate::config::archive_dir()?;
    let catalog = Catalog::open_at(&dir);
    catalog
        .load()
        .await
        .with_context(|| format!("Failed to load archive: {}", dir.display()))?;
    Ok(catalog)
}

/// Open the preference store at the configured location
async fn open_preferences() -> Result<PreferenceStore> {
    let config = crate::config::config()?;
    Ok(PreferenceStore::open(&config.settings, config.default_sort_order).await)
}

fn parse_id(id: &str) -> Result<ArchiveId> {
    id.trim().parse()
}

/// Add files from paths or stdin
async fn add_files(
    paths: Vec<PathBuf>,
    content_type: Option<String>,
    name: Option<String>,
    use_stdin: bool,
) -> Result<()> {
    if use_stdin && !paths.is_empty() {
        anyhow::bail!("Use either file paths or --stdin, not both");
    }
    if !use_stdin && paths.is_empty() {
        anyhow::bail!("No input provided. Pass file paths or use --stdin");
    }
    if name.is_some() && paths.len() > 1 {
        anyhow::bail!("--name can only be used with a single file");
    }

    let catalog = open_catalog().await?;

    if use_stdin {
        let name = name.context("--name is required with --stdin")?;
        let mut incoming = IncomingFile::new(name, tokio::io::stdin());
        if let Some(ct) = content_type {
            incoming = incoming.with_content_type(ct);
        }

        let item = catalog.add(incoming).await?;
        print_added(&item);
        return Ok(());
    }

    let mut failures = 0;
    for path in &paths {
        let mut incoming = match IncomingFile::open(path).await {
            Ok(incoming) => incoming,
            Err(e) => {
                eprintln!("Failed to open {}: {}", path.display(), e);
                failures += 1;
                continue;
            }
        };
        if let Some(ref n) = name {
            incoming.display_name = n.clone();
        }
        if let Some(ref ct) = content_type {
            incoming = incoming.with_content_type(ct.clone());
        }

        match catalog.add(incoming).await {
            Ok(item) => print_added(&item),
            Err(e) => {
                eprintln!("Failed to add {}: {}", path.display(), e);
                failures += 1;
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} files could not be added", failures, paths.len());
    }

    Ok(())
}

fn print_added(item: &ArchiveItem) {
    println!(
        "Added {} ({}, {}) as {}",
        item.display_name,
        item.kind,
        format_size(item.size_bytes),
        item.id
    );
}

/// List archived files in the requested or saved order
async fn list_files(
    sort: Option<SortArg>,
    kind: Option<KindArg>,
    limit: usize,
    json: bool,
) -> Result<()> {
    let catalog = open_catalog().await?;

    // A one-off --sort does not touch the saved preference
    let order_rx = match sort {
        Some(s) => watch::channel(SortOrder::from(s)).1,
        None => open_preferences().await?.subscribe(),
    };

    let matching = match kind {
        Some(k) => sort_items(catalog.filter_by_kind(k.into()), *order_rx.borrow()),
        None => SortedView::spawn(catalog.subscribe(), order_rx).current(),
    };
    let matched = matching.len();
    let items: Vec<ArchiveItem> = matching.into_iter().take(limit).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        if catalog.is_empty() {
            println!("Archive is empty. Use 'archiver add <file>' to add files.");
        } else {
            println!("No files match.");
        }
        return Ok(());
    }

    print_table(&items);
    println!("\n{}", listing_summary(items.len(), matched, catalog.len()));

    Ok(())
}

/// Footer for a listing that may be filtered and truncated
fn listing_summary(shown: usize, matched: usize, total: usize) -> String {
    if shown == total {
        format!("Total: {} items", total)
    } else if shown == matched {
        format!("Showing {} of {} items", shown, total)
    } else {
        format!("Showing {} of {} items ({} matched)", shown, total, matched)
    }
}

/// Search archived files by display name, in the saved order
async fn search_files(query: &str, json: bool) -> Result<()> {
    let catalog = open_catalog().await?;
    let order = open_preferences().await?.sort_order();

    let results = sort_items(catalog.search(query), order);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found for: {}", query);
        return Ok(());
    }

    println!("Found {} result(s) for \"{}\":\n", results.len(), query);
    print_table(&results);

    Ok(())
}

fn print_table(items: &[ArchiveItem]) {
    println!(
        "{:<34} {:<10} {:>10} {:<20} {:<40}",
        "ID", "KIND", "SIZE", "STORED", "NAME"
    );
    println!("{}", "-".repeat(118));

    for item in items {
        println!(
            "{:<34} {:<10} {:>10} {:<20} {:<40}",
            item.id.as_str(),
            item.kind.to_string(),
            format_size(item.size_bytes),
            format_timestamp(item.stored_at),
            truncate(&item.display_name, 40)
        );
    }
}

/// Show details of one file
async fn show_file(id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let catalog = open_catalog().await?;

    let item = catalog
        .find_by_id(&id)
        .with_context(|| format!("No archived file with ID {}", id))?;

    println!("ID:           {}", item.id);
    println!("Name:         {}", item.display_name);
    println!("Kind:         {}", item.kind);
    println!("Content type: {}", item.content_type);
    println!(
        "Size:         {} ({} bytes)",
        format_size(item.size_bytes),
        item.size_bytes
    );
    println!("Stored:       {}", format_timestamp(item.stored_at));
    println!("Path:         {}", item.storage_path.display());

    Ok(())
}

/// Rename one file
async fn rename_file(id: &str, new_name: &str) -> Result<()> {
    let id = parse_id(id)?;
    let catalog = open_catalog().await?;

    let item = catalog
        .rename(&id, new_name)
        .await
        .with_context(|| format!("Failed to rename {}", id))?;

    println!("Renamed {} to {}", item.id, item.display_name);
    Ok(())
}

/// Delete one file
async fn delete_file(id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let catalog = open_catalog().await?;

    let item = catalog
        .delete(&id)
        .await
        .with_context(|| format!("Failed to delete {}", id))?;

    println!("Deleted {} ({})", item.display_name, item.id);
    Ok(())
}

/// Show or change the saved sort order
async fn sort_preference(order: Option<SortArg>) -> Result<()> {
    let prefs = open_preferences().await?;

    match order {
        Some(order) => {
            let order = SortOrder::from(order);
            prefs
                .set_sort_order(order)
                .await
                .with_context(|| format!("Failed to save {}", prefs.path().display()))?;
            println!("Sort order set to {}", order);
        }
        None => println!("Sort order: {}", prefs.sort_order()),
    }

    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let config = crate::config::config()?;

    println!("Home:         {}", config.home.display());
    println!("Archive:      {}", config.archive.display());
    println!("Settings:     {}", config.settings.display());
    println!("Default sort: {}", config.default_sort_order);
    match &config.config_file {
        Some(path) => println!("Config file:  {}", path.display()),
        None => println!("Config file:  (none)"),
    }

    Ok(())
}

/// Human-readable size, 1024-based
pub fn format_size(size_bytes: u64) -> String {
    const KB: f64 = 1024.0;
    const MB: f64 = KB * 1024.0;
    const GB: f64 = MB * 1024.0;

    let size = size_bytes as f64;
    if size < KB {
        format!("{} B", size_bytes)
    } else if size < MB {
        format!("{:.1} KB", size / KB)
    } else if size < GB {
        format!("{:.1} MB", size / MB)
    } else {
        format!("{:.1} GB", size / GB)
    }
}

/// Local time as `YYYY-MM-DD HH:MM:SS`
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

/// Shorten to `max` characters, marking the cut with "..."
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        s.to_string()
    }
}
