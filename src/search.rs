//! Search and filter composition over the flat file list.
//!
//! A single-pass filter: scope predicate (extension-set membership) AND
//! query predicate (substring over name or path). Collections here are
//! hundreds of files, not millions, so no index structure is built. The
//! `SearchEngine` seam in [`crate::engine`] is consulted first and the
//! plain filter is the silent fallback while no real engine exists.

use anyhow::{bail, Result};
use std::str::FromStr;

use crate::config::Config;
use crate::engine::{self, SearchEngine};
use crate::github::{self, GitHubClient};
use crate::models::{EntryKind, FileEntry, GitObjectKind, GitTreeItem};
use crate::tree::is_markdown;

const MEDIA_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "gif", "svg", "webp", "mp3", "mp4", "wav", "pdf",
];
const CONFIG_EXTENSIONS: &[&str] = &["json", "yaml", "yml", "toml", "xml", "ini"];

/// Filter scope over the flat file list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterScope {
    All,
    Strands,
    Media,
    Configs,
}

impl FilterScope {
    pub fn matches(&self, name: &str) -> bool {
        match self {
            FilterScope::All => true,
            FilterScope::Strands => is_markdown(name),
            FilterScope::Media => has_extension_in(name, MEDIA_EXTENSIONS),
            FilterScope::Configs => has_extension_in(name, CONFIG_EXTENSIONS),
        }
    }
}

impl FromStr for FilterScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(FilterScope::All),
            "strands" => Ok(FilterScope::Strands),
            "media" => Ok(FilterScope::Media),
            "configs" => Ok(FilterScope::Configs),
            other => bail!(
                "Unknown scope: {}. Use all, strands, media, or configs.",
                other
            ),
        }
    }
}

fn has_extension_in(name: &str, extensions: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    match lower.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => extensions.contains(&ext),
        _ => false,
    }
}

/// The composed filter: scope AND substring query.
#[derive(Debug, Clone)]
pub struct SearchFilter {
    pub query: String,
    pub case_sensitive: bool,
    pub scope: FilterScope,
}

impl SearchFilter {
    pub fn matches(&self, entry: &FileEntry) -> bool {
        if !self.scope.matches(&entry.name) {
            return false;
        }
        if self.query.is_empty() {
            return true;
        }
        if self.case_sensitive {
            entry.name.contains(&self.query) || entry.path.contains(&self.query)
        } else {
            let needle = self.query.to_lowercase();
            entry.name.to_lowercase().contains(&needle)
                || entry.path.to_lowercase().contains(&needle)
        }
    }
}

/// Single-pass filter over a flat listing.
pub fn filter_entries(entries: &[FileEntry], filter: &SearchFilter) -> Vec<FileEntry> {
    entries.iter().filter(|e| filter.matches(e)).cloned().collect()
}

/// Flatten the repository listing into file entries for searching.
pub fn file_entries_from_items(items: &[GitTreeItem]) -> Vec<FileEntry> {
    items
        .iter()
        .filter(|i| matches!(i.kind, GitObjectKind::Blob))
        .map(|i| FileEntry {
            name: i
                .path
                .rsplit('/')
                .next()
                .unwrap_or(i.path.as_str())
                .to_string(),
            path: i.path.clone(),
            kind: EntryKind::File,
            size: i.size,
            download_url: None,
        })
        .collect()
}

/// Run the search command: fetch the scoped listing, consult the
/// configured engine, fall back to the plain filter, print results.
pub async fn run_search(
    config: &Config,
    query: &str,
    scope: &str,
    case_sensitive: bool,
    limit: Option<usize>,
) -> Result<()> {
    let scope: FilterScope = scope.parse()?;
    let filter = SearchFilter {
        query: query.to_string(),
        case_sensitive,
        scope,
    };

    let client = GitHubClient::new(config)?;
    if atty::is(atty::Stream::Stderr) {
        eprintln!(
            "Searching {}/{}...",
            config.repository.owner, config.repository.repo
        );
    }
    let (_, items) = client.repository_tree(&config.branch_candidates()).await?;

    let items = github::filter_ignored(items, &config.repository.ignore);
    let items = github::apply_exclude_globs(items, &config.repository.exclude_globs)?;
    let items = github::scope_to_root(items, &config.repository.root);

    let entries = file_entries_from_items(&items);

    // The engine seam: when a real provider can do semantic search it
    // takes over; the disabled provider reports false and we fall back
    // to the plain filter without comment.
    let mut engine = engine::create_engine(config);
    engine.index(&entries);
    let mut results = if engine.can_use_semantic() {
        engine.search(query, &filter)
    } else {
        filter_entries(&entries, &filter)
    };

    if let Some(limit) = limit {
        results.truncate(limit);
    }

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for entry in &results {
        match entry.size {
            Some(size) => println!("{:<60} {:>8}", entry.path, size),
            None => println!("{}", entry.path),
        }
    }
    println!();
    println!("{} result(s)", results.len());

    Ok(())
}
