//! Search-engine provider abstraction.
//!
//! The integration point for a future real engine (full-text or
//! semantic). Engines are constructed from config and passed to callers
//! rather than living as module-level singletons, so multiple viewer
//! sessions can hold independent instances and tests stay deterministic.
//! The only provider today is `disabled`, which indexes nothing and
//! reports that semantic search is unavailable; callers degrade to the
//! plain filter in [`crate::search`].

use crate::config::Config;
use crate::models::FileEntry;
use crate::search::SearchFilter;

pub trait SearchEngine: Send + Sync {
    /// Feed the flat file list to the engine. May be called repeatedly
    /// as listings refresh; each call replaces the previous corpus.
    fn index(&mut self, entries: &[FileEntry]);

    /// Query the engine. Only meaningful when
    /// [`can_use_semantic`](SearchEngine::can_use_semantic) is true.
    fn search(&self, query: &str, filter: &SearchFilter) -> Vec<FileEntry>;

    fn can_use_semantic(&self) -> bool;
}

/// Placeholder provider: no corpus, no results, no semantic capability.
pub struct DisabledEngine;

impl SearchEngine for DisabledEngine {
    fn index(&mut self, _entries: &[FileEntry]) {}

    fn search(&self, _query: &str, _filter: &SearchFilter) -> Vec<FileEntry> {
        Vec::new()
    }

    fn can_use_semantic(&self) -> bool {
        false
    }
}

/// Construct the configured engine. `load_config` rejects unknown
/// provider strings, but an unexpected value still degrades to the
/// disabled provider rather than failing the command.
pub fn create_engine(config: &Config) -> Box<dyn SearchEngine> {
    if config.search.provider != "disabled" {
        eprintln!(
            "Warning: search provider '{}' unavailable; advanced search disabled",
            config.search.provider
        );
    }
    Box::new(DisabledEngine)
}
