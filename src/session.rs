//! In-memory viewer state with stale-fetch protection.
//!
//! A session owns the latest tree snapshot and the strand bodies fetched
//! during browsing. Fetches are keyed by a monotonically increasing
//! generation: `begin_fetch` hands out a ticket, and commits only land
//! while that ticket's generation is still current. A slow superseded
//! request that resolves after a newer one began is rejected at the
//! commit point, so it can never clobber fresher state.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::models::KnowledgeTreeNode;

/// Proof of when a fetch began. Commits carrying an outdated ticket are
/// discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
}

struct TreeState {
    branch: String,
    nodes: Vec<KnowledgeTreeNode>,
}

#[derive(Default)]
pub struct ViewerSession {
    generation: AtomicU64,
    tree: RwLock<Option<TreeState>>,
    strands: RwLock<HashMap<String, String>>,
}

impl ViewerSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new fetch, superseding every fetch begun earlier.
    pub fn begin_fetch(&self) -> FetchTicket {
        FetchTicket {
            generation: self.generation.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }

    fn is_current(&self, ticket: FetchTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    /// Commit a tree snapshot. Returns false (and changes nothing) when
    /// the ticket has been superseded.
    pub fn commit_tree(
        &self,
        ticket: FetchTicket,
        branch: String,
        nodes: Vec<KnowledgeTreeNode>,
    ) -> bool {
        let mut guard = self.tree.write().unwrap();
        if !self.is_current(ticket) {
            return false;
        }
        *guard = Some(TreeState { branch, nodes });
        true
    }

    /// Commit a strand body under the same rules as [`commit_tree`](Self::commit_tree).
    pub fn commit_strand(&self, ticket: FetchTicket, path: &str, content: String) -> bool {
        let mut guard = self.strands.write().unwrap();
        if !self.is_current(ticket) {
            return false;
        }
        guard.insert(path.to_string(), content);
        true
    }

    /// The committed tree snapshot, if any.
    pub fn tree(&self) -> Option<(String, Vec<KnowledgeTreeNode>)> {
        self.tree
            .read()
            .unwrap()
            .as_ref()
            .map(|state| (state.branch.clone(), state.nodes.clone()))
    }

    /// A committed strand body, if any.
    pub fn strand(&self, path: &str) -> Option<String> {
        self.strands.read().unwrap().get(path).cloned()
    }

    /// Drop all held state and supersede any in-flight fetches.
    pub fn invalidate(&self) {
        // Bump first so racing commits observe the new generation.
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.tree.write().unwrap().take();
        self.strands.write().unwrap().clear();
    }
}
