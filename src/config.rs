use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub repository: RepositoryConfig,
    pub db: DbConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RepositoryConfig {
    pub owner: String,
    pub repo: String,
    /// Pinned branch. When absent, `branch_candidates` are tried in order.
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_branch_candidates")]
    pub branch_candidates: Vec<String>,
    /// Subtree that holds the weaves; `codex tree` and `codex search`
    /// scope to it unless asked for the full fabric.
    #[serde(default = "default_root")]
    pub root: String,
    /// Top-level directories excluded before tree construction.
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
    /// Globset patterns over full paths, excluded before tree construction.
    #[serde(default)]
    pub exclude_globs: Vec<String>,
}

fn default_branch_candidates() -> Vec<String> {
    vec!["master".to_string(), "main".to_string()]
}

fn default_root() -> String {
    "weaves".to_string()
}

fn default_ignore() -> Vec<String> {
    vec![
        ".git".to_string(),
        ".github".to_string(),
        ".obsidian".to_string(),
        "node_modules".to_string(),
    ]
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Override for the API base; useful for GitHub Enterprise.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Override for the raw-content CDN base.
    #[serde(default = "default_raw_base")]
    pub raw_base: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            api_base: default_api_base(),
            raw_base: default_raw_base(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "codex".to_string()
}
fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_raw_base() -> String {
    "https://raw.githubusercontent.com".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_cache_backend")]
    pub backend: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
        }
    }
}

fn default_cache_backend() -> String {
    "sqlite".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_search_provider")]
    pub provider: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: default_search_provider(),
        }
    }
}

fn default_search_provider() -> String {
    "disabled".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_strip_flags")]
    pub strip_flags: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            strip_flags: default_strip_flags(),
        }
    }
}

fn default_strip_flags() -> bool {
    true
}

impl Config {
    /// Minimal config for commands that can run without a config file.
    pub fn minimal() -> Self {
        Self {
            repository: RepositoryConfig {
                owner: String::new(),
                repo: String::new(),
                branch: None,
                branch_candidates: default_branch_candidates(),
                root: default_root(),
                ignore: default_ignore(),
                exclude_globs: Vec::new(),
            },
            db: DbConfig {
                path: PathBuf::from("./data/codex.sqlite"),
            },
            fetch: FetchConfig::default(),
            cache: CacheConfig::default(),
            search: SearchConfig::default(),
            render: RenderConfig::default(),
        }
    }

    /// Ordered branch names to try: the pinned branch when set,
    /// otherwise the configured candidates.
    pub fn branch_candidates(&self) -> Vec<String> {
        match &self.repository.branch {
            Some(branch) => vec![branch.clone()],
            None => self.repository.branch_candidates.clone(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.repository.owner.trim().is_empty() {
        anyhow::bail!("repository.owner must not be empty");
    }
    if config.repository.repo.trim().is_empty() {
        anyhow::bail!("repository.repo must not be empty");
    }
    if config.repository.branch.is_none() && config.repository.branch_candidates.is_empty() {
        anyhow::bail!("repository.branch_candidates must not be empty when no branch is pinned");
    }
    if config.fetch.timeout_secs == 0 {
        anyhow::bail!("fetch.timeout_secs must be > 0");
    }

    match config.cache.backend.as_str() {
        "sqlite" | "memory" => {}
        other => anyhow::bail!(
            "Unknown cache backend: '{}'. Must be sqlite or memory.",
            other
        ),
    }

    match config.search.provider.as_str() {
        "disabled" => {}
        other => anyhow::bail!(
            "Unknown search provider: '{}'. Only disabled is currently supported.",
            other
        ),
    }

    Ok(config)
}
