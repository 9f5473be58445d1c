//! Core data models used throughout Codex.
//!
//! These types represent the raw repository listings coming back from the
//! GitHub API and the knowledge hierarchy built from them.

use serde::{Deserialize, Serialize};

/// One entry from the repository's flat recursive tree listing.
#[derive(Debug, Clone, Deserialize)]
pub struct GitTreeItem {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: GitObjectKind,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Object kind as reported by the Git Trees API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GitObjectKind {
    Blob,
    Tree,
    /// Submodule pointer; ignored by the tree builder.
    Commit,
}

/// A directory listing row from the contents API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// File-or-directory discriminator for constructed nodes and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// Semantic level of a node in the knowledge hierarchy.
///
/// Derived purely from depth and entry kind, never from stored metadata:
/// the whole collection is the fabric, top-level directories are weaves,
/// nested directories are looms, markdown files are strands at any depth,
/// and everything else falls outside the ontology as a plain folder entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeLevel {
    Fabric,
    Weave,
    Loom,
    Strand,
    Folder,
}

impl KnowledgeLevel {
    pub fn label(&self) -> &'static str {
        match self {
            KnowledgeLevel::Fabric => "fabric",
            KnowledgeLevel::Weave => "weave",
            KnowledgeLevel::Loom => "loom",
            KnowledgeLevel::Strand => "strand",
            KnowledgeLevel::Folder => "folder",
        }
    }
}

/// A node in the constructed knowledge hierarchy.
#[derive(Debug, Clone, Serialize)]
pub struct KnowledgeTreeNode {
    /// Final path segment.
    pub name: String,
    /// Full slash-separated path from the scoped root.
    pub path: String,
    pub kind: EntryKind,
    pub level: KnowledgeLevel,
    /// Markdown-file descendants, inclusive of the node itself.
    pub strand_count: u32,
    /// Always present; empty for files and childless directories.
    pub children: Vec<KnowledgeTreeNode>,
}

/// Totals reported by a strand cache backend.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct CacheStats {
    pub total_items: u64,
    pub total_bytes: u64,
}

/// A saved bookmark.
#[derive(Debug, Clone, Serialize)]
pub struct Bookmark {
    pub id: String,
    pub path: String,
    pub title: Option<String>,
    pub created_at: i64,
}

/// One view-history row.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub path: String,
    pub viewed_at: i64,
}
