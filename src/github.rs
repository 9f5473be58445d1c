//! GitHub repository content fetcher.
//!
//! Wraps the three read paths Codex needs: directory listings (REST
//! contents API), single-file bodies (contents API, base64-decoded), and
//! the full recursive tree listing (GraphQL primary when a token is
//! available, Git Trees REST API as fallback). Every path walks an
//! ordered list of candidate branch names and stops at the first that
//! resolves; there is no retry or backoff beyond that loop.

use anyhow::{bail, Context, Result};
use base64::Engine as _;
use globset::{Glob, GlobSetBuilder};
use serde::Deserialize;
use std::time::Duration;

use crate::config::Config;
use crate::models::{EntryKind, FileEntry, GitObjectKind, GitTreeItem};

/// Nesting depth requested from the GraphQL tree query. Deeper
/// repositories fall back to the REST listing, which is complete.
const GRAPHQL_TREE_DEPTH: usize = 4;

pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    raw_base: String,
    owner: String,
    repo: String,
    token: Option<String>,
}

#[derive(Deserialize)]
struct TreeResponse {
    tree: Vec<GitTreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct ContentsFile {
    content: String,
    encoding: String,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch.timeout_secs))
            .user_agent(config.fetch.user_agent.clone())
            .build()
            .context("Failed to build HTTP client")?;

        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());

        Ok(Self {
            http,
            api_base: config.fetch.api_base.trim_end_matches('/').to_string(),
            raw_base: config.fetch.raw_base.trim_end_matches('/').to_string(),
            owner: config.repository.owner.clone(),
            repo: config.repository.repo.clone(),
            token,
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Raw-content CDN URL for a path; the image rewrite pass points
    /// relative references here.
    pub fn raw_url(&self, branch: &str, path: &str) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.raw_base,
            self.owner,
            self.repo,
            branch,
            path.trim_start_matches('/')
        )
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .get(url)
            .header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    /// Check whether a branch exists, for `codex sources`.
    pub async fn branch_exists(&self, branch: &str) -> Result<bool> {
        let url = format!(
            "{}/repos/{}/{}/branches/{}",
            self.api_base, self.owner, self.repo, branch
        );
        let response = self.request(&url).send().await?;
        Ok(response.status().is_success())
    }

    /// Directory listing via the contents API. Tries each candidate
    /// branch in order; returns the branch that resolved alongside the
    /// entries, ordered directories-first.
    pub async fn list_directory(
        &self,
        path: &str,
        candidates: &[String],
    ) -> Result<(String, Vec<FileEntry>)> {
        let mut last_err = None;
        for branch in candidates {
            match self.list_directory_on(path, branch).await {
                Ok(mut entries) => {
                    entries.sort_by(|a, b| {
                        let rank = |e: &FileEntry| match e.kind {
                            EntryKind::Dir => 0,
                            EntryKind::File => 1,
                        };
                        rank(a)
                            .cmp(&rank(b))
                            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
                    });
                    return Ok((branch.clone(), entries));
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no branch candidates configured")))
    }

    async fn list_directory_on(&self, path: &str, branch: &str) -> Result<Vec<FileEntry>> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_base,
            self.owner,
            self.repo,
            path.trim_matches('/'),
            branch
        );
        let response = check_status(self.request(&url).send().await?).await?;
        let entries: Vec<FileEntry> = response
            .json()
            .await
            .context("Failed to parse directory listing")?;
        Ok(entries)
    }

    /// Fetch a file body via the contents API, trying candidate branches
    /// in order. Returns the branch that resolved and the decoded text.
    pub async fn fetch_file(
        &self,
        path: &str,
        candidates: &[String],
    ) -> Result<(String, String)> {
        let mut last_err = None;
        for branch in candidates {
            match self.fetch_file_on(path, branch).await {
                Ok(content) => return Ok((branch.clone(), content)),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no branch candidates configured")))
    }

    async fn fetch_file_on(&self, path: &str, branch: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}?ref={}",
            self.api_base,
            self.owner,
            self.repo,
            path.trim_matches('/'),
            branch
        );
        let response = check_status(self.request(&url).send().await?).await?;
        let file: ContentsFile = response
            .json()
            .await
            .context("Failed to parse file response")?;
        if file.encoding != "base64" {
            bail!("Unexpected content encoding: {}", file.encoding);
        }
        decode_base64_content(&file.content)
    }

    /// Full recursive tree listing. Per candidate branch: GraphQL first
    /// (token only), then the Git Trees REST API. The first branch that
    /// yields a listing wins.
    pub async fn repository_tree(
        &self,
        candidates: &[String],
    ) -> Result<(String, Vec<GitTreeItem>)> {
        let mut last_err = None;
        for branch in candidates {
            if self.token.is_some() {
                match self.tree_via_graphql(branch).await {
                    Ok(items) => return Ok((branch.clone(), items)),
                    Err(e) => last_err = Some(e),
                }
            }
            match self.tree_via_rest(branch).await {
                Ok(items) => return Ok((branch.clone(), items)),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("no branch candidates configured")))
    }

    async fn tree_via_rest(&self, branch: &str) -> Result<Vec<GitTreeItem>> {
        let url = format!(
            "{}/repos/{}/{}/git/trees/{}?recursive=1",
            self.api_base, self.owner, self.repo, branch
        );
        let response = check_status(self.request(&url).send().await?).await?;
        let listing: TreeResponse = response
            .json()
            .await
            .context("Failed to parse tree listing")?;
        if listing.truncated {
            eprintln!("Warning: tree listing truncated by the API; counts may be low");
        }
        Ok(listing.tree)
    }

    async fn tree_via_graphql(&self, branch: &str) -> Result<Vec<GitTreeItem>> {
        let query = graphql_tree_query(GRAPHQL_TREE_DEPTH);
        let body = serde_json::json!({
            "query": query,
            "variables": {
                "owner": self.owner,
                "name": self.repo,
                "expr": format!("{}:", branch),
            }
        });

        let url = format!("{}/graphql", self.api_base);
        let mut builder = self.http.post(&url).json(&body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        let response = check_status(builder.send().await?).await?;
        let payload: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse GraphQL response")?;

        if let Some(errors) = payload.get("errors").and_then(|e| e.as_array()) {
            if !errors.is_empty() {
                bail!("GraphQL query failed: {}", errors[0]);
            }
        }

        let object = payload
            .pointer("/data/repository/object")
            .filter(|v| !v.is_null())
            .with_context(|| format!("branch '{}' not found via GraphQL", branch))?;

        let mut items = Vec::new();
        flatten_graphql_tree(object, &mut items)?;
        Ok(items)
    }
}

/// Build the nested GraphQL tree query for the given depth.
fn graphql_tree_query(depth: usize) -> String {
    let mut inner = String::from("path type");
    for _ in 0..depth {
        inner = format!(
            "path type object {{ ... on Tree {{ entries {{ {} }} }} }}",
            inner
        );
    }
    format!(
        "query($owner:String!,$name:String!,$expr:String!){{repository(owner:$owner,name:$name){{object(expression:$expr){{... on Tree{{entries{{{}}}}}}}}}}}",
        inner
    )
}

/// Flatten the nested GraphQL tree object into flat items. Errors when a
/// tree entry at the depth limit still carries unexpanded children, so
/// the caller can fall back to the complete REST listing.
fn flatten_graphql_tree(object: &serde_json::Value, out: &mut Vec<GitTreeItem>) -> Result<()> {
    let entries = match object.get("entries").and_then(|e| e.as_array()) {
        Some(entries) => entries,
        None => return Ok(()),
    };

    for entry in entries {
        let path = entry
            .get("path")
            .and_then(|p| p.as_str())
            .unwrap_or_default();
        if path.is_empty() {
            continue;
        }
        let kind = match entry.get("type").and_then(|t| t.as_str()) {
            Some("blob") => GitObjectKind::Blob,
            Some("tree") => GitObjectKind::Tree,
            _ => continue,
        };
        out.push(GitTreeItem {
            path: path.to_string(),
            kind,
            size: None,
        });

        if matches!(kind, GitObjectKind::Tree) {
            match entry.get("object") {
                Some(child) if child.get("entries").is_some() => {
                    flatten_graphql_tree(child, out)?;
                }
                _ => bail!(
                    "GraphQL listing incomplete below '{}'; falling back to REST",
                    path
                ),
            }
        }
    }
    Ok(())
}

/// Map an HTTP error status to a user-facing message.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        bail!("not found (404) — missing branch, path, or private repository");
    }
    if status == reqwest::StatusCode::FORBIDDEN {
        let exhausted = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false);
        if exhausted {
            bail!("API rate limit exceeded; set GITHUB_TOKEN to raise the limit");
        }
        bail!("forbidden (403)");
    }

    let body = response.text().await.unwrap_or_default();
    let mut detail = body.trim().to_string();
    detail.truncate(200);
    bail!("request failed with status {}: {}", status, detail)
}

/// Decode a contents-API base64 payload (newline-wrapped by the API).
pub fn decode_base64_content(content: &str) -> Result<String> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact)
        .context("Failed to decode base64 content")?;
    String::from_utf8(bytes).context("File content is not valid UTF-8")
}

/// Drop items whose first path segment is on the ignore list.
pub fn filter_ignored(items: Vec<GitTreeItem>, ignore: &[String]) -> Vec<GitTreeItem> {
    items
        .into_iter()
        .filter(|item| {
            let first = item.path.split('/').find(|s| !s.is_empty()).unwrap_or("");
            !ignore.iter().any(|i| i == first)
        })
        .collect()
}

/// Drop items matching any of the configured exclude globs.
pub fn apply_exclude_globs(items: Vec<GitTreeItem>, patterns: &[String]) -> Result<Vec<GitTreeItem>> {
    if patterns.is_empty() {
        return Ok(items);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern).with_context(|| format!("bad glob '{}'", pattern))?);
    }
    let set = builder.build()?;
    Ok(items
        .into_iter()
        .filter(|item| !set.is_match(&item.path))
        .collect())
}

/// Keep strict descendants of `root` and strip the prefix, so weaves
/// land at depth 1 for the builder.
pub fn scope_to_root(items: Vec<GitTreeItem>, root: &str) -> Vec<GitTreeItem> {
    let root = root.trim_matches('/');
    if root.is_empty() {
        return items;
    }
    let prefix = format!("{}/", root);
    items
        .into_iter()
        .filter_map(|mut item| {
            let stripped = item.path.strip_prefix(&prefix)?.to_string();
            if stripped.is_empty() {
                return None;
            }
            item.path = stripped;
            Some(item)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(path: &str, kind: GitObjectKind) -> GitTreeItem {
        GitTreeItem {
            path: path.to_string(),
            kind,
            size: None,
        }
    }

    #[test]
    fn test_filter_ignored_first_segment() {
        let items = vec![
            item(".git/config", GitObjectKind::Blob),
            item("weaves/a.md", GitObjectKind::Blob),
            item("node_modules/x/y.js", GitObjectKind::Blob),
        ];
        let kept = filter_ignored(items, &[".git".to_string(), "node_modules".to_string()]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "weaves/a.md");
    }

    #[test]
    fn test_scope_to_root_strips_prefix() {
        let items = vec![
            item("weaves", GitObjectKind::Tree),
            item("weaves/a", GitObjectKind::Tree),
            item("weaves/a/one.md", GitObjectKind::Blob),
            item("README.md", GitObjectKind::Blob),
        ];
        let scoped = scope_to_root(items, "weaves");
        let paths: Vec<&str> = scoped.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "a/one.md"]);
    }

    #[test]
    fn test_scope_to_root_empty_passes_through() {
        let items = vec![item("a/one.md", GitObjectKind::Blob)];
        let scoped = scope_to_root(items, "");
        assert_eq!(scoped.len(), 1);
    }

    #[test]
    fn test_apply_exclude_globs() {
        let items = vec![
            item("weaves/a/draft.md", GitObjectKind::Blob),
            item("weaves/a/one.md", GitObjectKind::Blob),
        ];
        let kept = apply_exclude_globs(items, &["**/draft.md".to_string()]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "weaves/a/one.md");
    }

    #[test]
    fn test_decode_base64_content_with_newlines() {
        // "hello\nworld" encoded, wrapped the way the contents API wraps it.
        let encoded = "aGVsbG8K\nd29ybGQ=\n";
        assert_eq!(decode_base64_content(encoded).unwrap(), "hello\nworld");
    }

    #[test]
    fn test_graphql_query_depth() {
        let q = graphql_tree_query(2);
        assert_eq!(q.matches("... on Tree").count(), 3);
        assert!(q.contains("object(expression:$expr)"));
    }

    #[test]
    fn test_flatten_graphql_tree() {
        let value = serde_json::json!({
            "entries": [
                { "path": "a", "type": "tree", "object": { "entries": [
                    { "path": "a/one.md", "type": "blob" }
                ]}},
                { "path": "top.md", "type": "blob" }
            ]
        });
        let mut out = Vec::new();
        flatten_graphql_tree(&value, &mut out).unwrap();
        let paths: Vec<&str> = out.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(paths, vec!["a", "a/one.md", "top.md"]);
    }

    #[test]
    fn test_flatten_graphql_tree_incomplete_errors() {
        // Tree entry at the depth limit with no expanded object.
        let value = serde_json::json!({
            "entries": [
                { "path": "deep", "type": "tree", "object": {} }
            ]
        });
        let mut out = Vec::new();
        assert!(flatten_graphql_tree(&value, &mut out).is_err());
    }
}
