//! Knowledge-tree construction and classification.
//!
//! Turns the flat recursive tree listing returned by the GitHub API into
//! the fabric → weave → loom → strand hierarchy. The builder is a pure,
//! single-pass function: nodes are keyed by path, missing ancestors are
//! materialized on demand, strand counts accumulate post-order, and the
//! semantic level of every node is a function of depth and kind alone.
//! Used by `codex tree` and, through flattening, by `codex search`.

use std::collections::HashMap;

use anyhow::Result;

use crate::config::Config;
use crate::github::{self, GitHubClient};
use crate::models::{
    EntryKind, GitObjectKind, GitTreeItem, KnowledgeLevel, KnowledgeTreeNode,
};

/// Markdown strand detection: `.md` / `.mdx`, case-insensitive.
pub fn is_markdown(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".md") || lower.ends_with(".mdx")
}

/// Level assignment from (depth, kind, name); depth counts from 1 for
/// entries directly under the scoped root. Depth-1 files sit outside
/// the weave/loom/strand ontology and classify as plain folder entries
/// even when they are markdown — they belong to no weave.
fn level_for(depth: usize, kind: EntryKind, name: &str) -> KnowledgeLevel {
    match kind {
        EntryKind::Dir => {
            if depth == 1 {
                KnowledgeLevel::Weave
            } else {
                KnowledgeLevel::Loom
            }
        }
        EntryKind::File => {
            if depth > 1 && is_markdown(name) {
                KnowledgeLevel::Strand
            } else {
                KnowledgeLevel::Folder
            }
        }
    }
}

/// Intermediate node keyed by segment while inserting; converted to the
/// public shape in a finalize pass that also fixes ordering and counts.
#[derive(Default)]
struct PendingNode {
    /// Kind from an explicit listing entry. Ancestors materialized on
    /// demand stay `None` until (unless) their own entry is seen, and
    /// default to directories at finalize time.
    declared: Option<EntryKind>,
    children: HashMap<String, PendingNode>,
}

/// Build the knowledge hierarchy from a flat, order-independent listing.
///
/// Re-insertion of an already-present path overwrites rather than
/// duplicates, so malformed inputs can never double-count a strand.
/// Paths are defensively normalized: empty segments from leading,
/// trailing, or doubled slashes are dropped, and a path with no
/// remaining segments is skipped entirely.
pub fn build_knowledge_tree(items: &[GitTreeItem]) -> Vec<KnowledgeTreeNode> {
    let mut root = PendingNode::default();

    for item in items {
        let kind = match item.kind {
            GitObjectKind::Blob => EntryKind::File,
            GitObjectKind::Tree => EntryKind::Dir,
            GitObjectKind::Commit => continue,
        };

        let segments: Vec<&str> = item.path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            continue;
        }

        let mut cursor = &mut root;
        for segment in &segments[..segments.len() - 1] {
            cursor = cursor.children.entry(segment.to_string()).or_default();
        }
        let leaf = cursor
            .children
            .entry(segments[segments.len() - 1].to_string())
            .or_default();
        leaf.declared = Some(kind);
    }

    finalize_children(root.children, "", 1)
}

/// Convert pending children into public nodes: resolve kinds, assign
/// levels, accumulate strand counts bottom-up, and order directories
/// before files with case-insensitive names inside each group.
fn finalize_children(
    children: HashMap<String, PendingNode>,
    parent_path: &str,
    depth: usize,
) -> Vec<KnowledgeTreeNode> {
    let mut nodes: Vec<KnowledgeTreeNode> = children
        .into_iter()
        .map(|(name, pending)| finalize_node(name, pending, parent_path, depth))
        .collect();

    nodes.sort_by(|a, b| {
        let rank = |n: &KnowledgeTreeNode| match n.kind {
            EntryKind::Dir => 0,
            EntryKind::File => 1,
        };
        rank(a)
            .cmp(&rank(b))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
            .then_with(|| a.name.cmp(&b.name))
    });

    nodes
}

fn finalize_node(
    name: String,
    pending: PendingNode,
    parent_path: &str,
    depth: usize,
) -> KnowledgeTreeNode {
    let path = if parent_path.is_empty() {
        name.clone()
    } else {
        format!("{}/{}", parent_path, name)
    };

    // An undeclared node only exists because a descendant referenced it;
    // a declared blob that somehow gained children is treated as a
    // directory as well, since children are the stronger evidence.
    let kind = if pending.children.is_empty() {
        pending.declared.unwrap_or(EntryKind::Dir)
    } else {
        EntryKind::Dir
    };

    let children = finalize_children(pending.children, &path, depth + 1);

    let strand_count = match kind {
        EntryKind::File => {
            if is_markdown(&name) {
                1
            } else {
                0
            }
        }
        EntryKind::Dir => children.iter().map(|c| c.strand_count).sum(),
    };

    let level = level_for(depth, kind, &name);

    KnowledgeTreeNode {
        name,
        path,
        kind,
        level,
        strand_count,
        children,
    }
}

/// Total strand count across a forest.
pub fn total_strands(nodes: &[KnowledgeTreeNode]) -> u32 {
    nodes.iter().map(|n| n.strand_count).sum()
}

/// Run the tree command: fetch the repository listing, scope and build,
/// then print the hierarchy.
pub async fn run_tree(config: &Config, all: bool, json: bool) -> Result<()> {
    let client = GitHubClient::new(config)?;

    if atty::is(atty::Stream::Stderr) {
        eprintln!(
            "Fetching repository tree for {}/{}...",
            config.repository.owner, config.repository.repo
        );
    }

    let (branch, items) = client.repository_tree(&config.branch_candidates()).await?;

    let items = github::filter_ignored(items, &config.repository.ignore);
    let items = github::apply_exclude_globs(items, &config.repository.exclude_globs)?;
    let items = if all || config.repository.root.is_empty() {
        items
    } else {
        github::scope_to_root(items, &config.repository.root)
    };

    let nodes = build_knowledge_tree(&items);

    if json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    if nodes.is_empty() {
        println!("No entries found on branch '{}'.", branch);
        return Ok(());
    }

    println!(
        "{}/{} @ {} — {} strands",
        config.repository.owner,
        config.repository.repo,
        branch,
        total_strands(&nodes)
    );
    for node in &nodes {
        print_node(node, 0);
    }

    Ok(())
}

fn print_node(node: &KnowledgeTreeNode, indent: usize) {
    let pad = "  ".repeat(indent);
    match node.kind {
        EntryKind::Dir => println!(
            "{}{} [{}] ({})",
            pad,
            node.name,
            node.level.label(),
            node.strand_count
        ),
        EntryKind::File => println!("{}{} [{}]", pad, node.name, node.level.label()),
    }
    for child in &node.children {
        print_node(child, indent + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(path: &str) -> GitTreeItem {
        GitTreeItem {
            path: path.to_string(),
            kind: GitObjectKind::Blob,
            size: Some(1),
        }
    }

    fn tree(path: &str) -> GitTreeItem {
        GitTreeItem {
            path: path.to_string(),
            kind: GitObjectKind::Tree,
            size: None,
        }
    }

    fn find<'a>(nodes: &'a [KnowledgeTreeNode], name: &str) -> &'a KnowledgeTreeNode {
        nodes
            .iter()
            .find(|n| n.name == name)
            .unwrap_or_else(|| panic!("missing node {}", name))
    }

    fn count_markdown_items(items: &[GitTreeItem]) -> u32 {
        items
            .iter()
            .filter(|i| matches!(i.kind, GitObjectKind::Blob) && is_markdown(&i.path))
            .count() as u32
    }

    fn assert_count_invariant(node: &KnowledgeTreeNode) {
        match node.kind {
            EntryKind::Dir => {
                let sum: u32 = node.children.iter().map(|c| c.strand_count).sum();
                assert_eq!(
                    node.strand_count, sum,
                    "directory {} count mismatch",
                    node.path
                );
            }
            EntryKind::File => {
                let expected = if is_markdown(&node.name) { 1 } else { 0 };
                assert_eq!(node.strand_count, expected, "file {} count", node.path);
            }
        }
        for child in &node.children {
            assert_count_invariant(child);
        }
    }

    fn collect_paths(nodes: &[KnowledgeTreeNode], out: &mut Vec<String>) {
        for node in nodes {
            out.push(node.path.clone());
            collect_paths(&node.children, out);
        }
    }

    #[test]
    fn test_empty_input() {
        let nodes = build_knowledge_tree(&[]);
        assert!(nodes.is_empty());
    }

    #[test]
    fn test_spec_scenario() {
        // weaves already filtered as the scope root.
        let items = vec![
            blob("a/one.md"),
            blob("a/sub/two.md"),
            blob("b/readme.txt"),
        ];
        let nodes = build_knowledge_tree(&items);
        assert_eq!(nodes.len(), 2);

        let a = find(&nodes, "a");
        assert_eq!(a.level, KnowledgeLevel::Weave);
        assert_eq!(a.strand_count, 2);

        let sub = find(&a.children, "sub");
        assert_eq!(sub.level, KnowledgeLevel::Loom);
        assert_eq!(sub.strand_count, 1);
        assert_eq!(find(&sub.children, "two.md").level, KnowledgeLevel::Strand);

        let b = find(&nodes, "b");
        assert_eq!(b.strand_count, 0);
        assert_eq!(b.children.len(), 1);
        assert_eq!(
            find(&b.children, "readme.txt").level,
            KnowledgeLevel::Folder
        );
    }

    #[test]
    fn test_total_matches_markdown_input_count() {
        let items = vec![
            blob("x/a.md"),
            blob("x/b.MDX"),
            blob("x/deep/nested/c.md"),
            blob("y/notes.txt"),
            tree("z"),
        ];
        let nodes = build_knowledge_tree(&items);
        assert_eq!(total_strands(&nodes), count_markdown_items(&items));
    }

    #[test]
    fn test_per_node_count_invariant() {
        let items = vec![
            blob("a/one.md"),
            blob("a/sub/two.md"),
            blob("a/sub/deeper/three.md"),
            blob("a/media/logo.png"),
            blob("b/readme.txt"),
            blob("top.md"),
        ];
        for node in build_knowledge_tree(&items) {
            assert_count_invariant(&node);
        }
    }

    #[test]
    fn test_input_order_independence() {
        let forward = vec![
            tree("a"),
            tree("a/sub"),
            blob("a/one.md"),
            blob("a/sub/two.md"),
            blob("b/readme.txt"),
        ];
        let mut reversed = forward.clone();
        reversed.reverse();

        let t1 = build_knowledge_tree(&forward);
        let t2 = build_knowledge_tree(&reversed);
        assert_eq!(
            serde_json::to_string(&t1).unwrap(),
            serde_json::to_string(&t2).unwrap()
        );
    }

    #[test]
    fn test_paths_round_trip() {
        let items = vec![
            blob("a/one.md"),
            blob("a/sub/two.md"),
            blob("b/readme.txt"),
        ];
        let nodes = build_knowledge_tree(&items);
        let mut paths = Vec::new();
        collect_paths(&nodes, &mut paths);
        for item in &items {
            assert!(paths.contains(&item.path), "missing path {}", item.path);
        }
        // Child path is always parent path + '/' + name.
        fn check(nodes: &[KnowledgeTreeNode]) {
            for node in nodes {
                for child in &node.children {
                    assert_eq!(child.path, format!("{}/{}", node.path, child.name));
                }
                check(&node.children);
            }
        }
        check(&nodes);
    }

    #[test]
    fn test_directories_only_all_zero() {
        let items = vec![tree("a"), tree("a/sub"), tree("b")];
        let nodes = build_knowledge_tree(&items);
        assert_eq!(total_strands(&nodes), 0);
        for node in &nodes {
            assert_count_invariant(node);
        }
    }

    #[test]
    fn test_childless_top_level_directory_has_empty_children() {
        let nodes = build_knowledge_tree(&[tree("empty")]);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].kind, EntryKind::Dir);
        assert!(nodes[0].children.is_empty());
        assert_eq!(nodes[0].level, KnowledgeLevel::Weave);
    }

    #[test]
    fn test_root_level_file_is_folder_not_strand_of_a_weave() {
        let nodes = build_knowledge_tree(&[blob("README.md"), blob("logo.svg")]);
        // Depth-1 files belong to no weave, markdown or not; the
        // markdown one still counts as a strand in the totals.
        assert_eq!(find(&nodes, "README.md").level, KnowledgeLevel::Folder);
        assert_eq!(find(&nodes, "README.md").strand_count, 1);
        assert_eq!(find(&nodes, "logo.svg").level, KnowledgeLevel::Folder);
        assert_eq!(total_strands(&nodes), 1);
    }

    #[test]
    fn test_duplicate_insertion_is_idempotent() {
        let items = vec![blob("a/one.md"), blob("a/one.md"), blob("a/one.md")];
        let nodes = build_knowledge_tree(&items);
        let a = find(&nodes, "a");
        assert_eq!(a.children.len(), 1);
        assert_eq!(a.strand_count, 1);
    }

    #[test]
    fn test_missing_ancestors_materialized_as_directories() {
        // No tree entries at all; only a deeply nested blob.
        let nodes = build_knowledge_tree(&[blob("a/b/c/leaf.md")]);
        let a = find(&nodes, "a");
        assert_eq!(a.kind, EntryKind::Dir);
        assert_eq!(a.level, KnowledgeLevel::Weave);
        assert_eq!(a.strand_count, 1);
        let b = find(&a.children, "b");
        assert_eq!(b.level, KnowledgeLevel::Loom);
        let c = find(&b.children, "c");
        assert_eq!(c.level, KnowledgeLevel::Loom);
        assert_eq!(c.strand_count, 1);
    }

    #[test]
    fn test_path_normalization_strips_empty_segments() {
        let items = vec![
            blob("/a//one.md"),
            blob("a/two.md/"),
            GitTreeItem {
                path: "///".to_string(),
                kind: GitObjectKind::Blob,
                size: None,
            },
        ];
        let nodes = build_knowledge_tree(&items);
        assert_eq!(nodes.len(), 1);
        let a = find(&nodes, "a");
        assert_eq!(a.children.len(), 2);
        assert_eq!(a.strand_count, 2);
        // No phantom empty-named nodes anywhere.
        let mut paths = Vec::new();
        collect_paths(&nodes, &mut paths);
        assert!(paths.iter().all(|p| !p.contains("//") && !p.ends_with('/')));
    }

    #[test]
    fn test_children_ordering_dirs_first_then_case_insensitive() {
        let items = vec![
            blob("w/zeta.md"),
            blob("w/Alpha.md"),
            tree("w/beta"),
            tree("w/Delta"),
        ];
        let nodes = build_knowledge_tree(&items);
        let w = find(&nodes, "w");
        let names: Vec<&str> = w.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["beta", "Delta", "Alpha.md", "zeta.md"]);
    }

    #[test]
    fn test_submodule_entries_ignored() {
        let items = vec![
            blob("a/one.md"),
            GitTreeItem {
                path: "vendored".to_string(),
                kind: GitObjectKind::Commit,
                size: None,
            },
        ];
        let nodes = build_knowledge_tree(&items);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "a");
    }
}
