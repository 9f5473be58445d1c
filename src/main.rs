//! # Codex CLI (`codex`)
//!
//! The `codex` binary is the primary interface for Codex. It browses a
//! GitHub-hosted markdown knowledge base — the fabric of weaves, looms,
//! and strands — with local caching, bookmarks, history, and
//! preferences.
//!
//! ## Usage
//!
//! ```bash
//! codex --config ./config/codex.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `codex init` | Create the SQLite database and run schema migrations |
//! | `codex tree` | Fetch the repository listing and print the knowledge tree |
//! | `codex ls <path>` | List one directory via the contents API |
//! | `codex get <path>` | Fetch a strand (cache-first) and print it transformed |
//! | `codex search "<query>"` | Filter the flat file list by scope and substring |
//! | `codex bookmark ...` | Manage bookmarks |
//! | `codex history ...` | Manage view history |
//! | `codex prefs ...` | Manage viewer preferences |
//! | `codex cache ...` | Inspect or clear the strand cache |
//! | `codex clear-data` | Wipe preferences, bookmarks, and history |
//! | `codex sources` | Repository, token, branch, and database health |
//! | `codex completions <shell>` | Emit shell completion scripts |

mod cache;
mod config;
mod db;
mod engine;
mod get;
mod github;
mod ls;
mod migrate;
mod models;
mod render;
mod search;
#[allow(dead_code)]
mod session;
mod sources;
mod stats;
mod store;
mod tree;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Codex — a client for GitHub-hosted markdown knowledge bases.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/codex.example.toml` for a full
/// example.
#[derive(Parser)]
#[command(
    name = "codex",
    about = "Codex — browse a GitHub-hosted markdown knowledge base",
    version,
    long_about = "Codex fetches a GitHub repository's tree, organizes it into the \
    fabric → weave → loom → strand hierarchy, and layers on local browsing \
    conveniences: a strand cache, bookmarks, view history, and preferences."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/codex.toml`. Repository coordinates,
    /// database path, fetch, cache, and render settings are read from
    /// this file.
    #[arg(long, global = true, default_value = "./config/codex.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the local database.
    ///
    /// Creates the SQLite file and all required tables (cached_strands,
    /// preferences, bookmarks, history). This command is idempotent —
    /// running it multiple times is safe.
    Init,

    /// Fetch the repository listing and print the knowledge tree.
    ///
    /// Tries GraphQL first (when GITHUB_TOKEN is set) and falls back to
    /// the Git Trees REST API, walking the configured branch candidates
    /// until one resolves. Directories print with their strand counts.
    Tree {
        /// Print the full fabric instead of scoping to repository.root.
        #[arg(long)]
        all: bool,

        /// Emit the tree as JSON instead of indented text.
        #[arg(long)]
        json: bool,
    },

    /// List a single directory via the contents API.
    Ls {
        /// Directory path within the repository ("" for the root).
        #[arg(default_value = "")]
        path: String,
    },

    /// Fetch a strand and print it.
    ///
    /// Consults the strand cache first, falls through to the contents
    /// API, records the view in history, and applies the markdown
    /// transform passes unless --raw is given.
    Get {
        /// Strand path within the repository.
        path: String,

        /// Print the body exactly as fetched, skipping transforms.
        #[arg(long)]
        raw: bool,

        /// Bypass the cache for this fetch.
        #[arg(long)]
        no_cache: bool,
    },

    /// Search the flat file list.
    ///
    /// A single-pass filter: scope predicate AND substring match over
    /// name and path.
    Search {
        /// The search query string.
        query: String,

        /// Filter scope: `all`, `strands`, `media`, or `configs`.
        #[arg(long, default_value = "all")]
        scope: String,

        /// Match case-sensitively.
        #[arg(long)]
        case_sensitive: bool,

        /// Maximum number of results to print.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Manage bookmarks.
    Bookmark {
        #[command(subcommand)]
        action: BookmarkAction,
    },

    /// Manage view history.
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Manage viewer preferences (theme, font_size, sidebar_width).
    Prefs {
        #[command(subcommand)]
        action: PrefsAction,
    },

    /// Inspect or clear the strand cache.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Wipe preferences, bookmarks, and history.
    ClearData,

    /// Show repository, token, branch-candidate, and database health.
    Sources,

    /// Emit a shell completion script to stdout.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

/// Bookmark subcommands.
#[derive(Subcommand)]
enum BookmarkAction {
    /// Bookmark a strand path (re-adding updates the title).
    Add {
        path: String,
        /// Optional display title.
        #[arg(long)]
        title: Option<String>,
    },
    /// Remove the bookmark for a path.
    Remove { path: String },
    /// List bookmarks, newest first.
    List,
}

/// History subcommands.
#[derive(Subcommand)]
enum HistoryAction {
    /// List recent views, newest first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
    /// Delete all history rows.
    Clear,
}

/// Preference subcommands.
#[derive(Subcommand)]
enum PrefsAction {
    /// Set a preference value.
    Set { key: String, value: String },
    /// Print a preference value.
    Get { key: String },
    /// List all set preferences.
    List,
}

/// Cache subcommands.
#[derive(Subcommand)]
enum CacheAction {
    /// Show cache totals and local database counts.
    Stats,
    /// Delete all cached strand bodies.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Completions don't require config
    if let Commands::Completions { shell } = &cli.command {
        let mut command = Cli::command();
        let name = command.get_name().to_string();
        clap_complete::generate(*shell, &mut command, name, &mut std::io::stdout());
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Tree { all, json } => {
            tree::run_tree(&cfg, all, json).await?;
        }
        Commands::Ls { path } => {
            ls::run_ls(&cfg, &path).await?;
        }
        Commands::Get {
            path,
            raw,
            no_cache,
        } => {
            get::run_get(&cfg, &path, raw, no_cache).await?;
        }
        Commands::Search {
            query,
            scope,
            case_sensitive,
            limit,
        } => {
            search::run_search(&cfg, &query, &scope, case_sensitive, limit).await?;
        }
        Commands::Bookmark { action } => match action {
            BookmarkAction::Add { path, title } => {
                store::run_bookmark_add(&cfg, &path, title).await?;
            }
            BookmarkAction::Remove { path } => {
                store::run_bookmark_remove(&cfg, &path).await?;
            }
            BookmarkAction::List => {
                store::run_bookmark_list(&cfg).await?;
            }
        },
        Commands::History { action } => match action {
            HistoryAction::List { limit } => {
                store::run_history_list(&cfg, limit).await?;
            }
            HistoryAction::Clear => {
                store::run_history_clear(&cfg).await?;
            }
        },
        Commands::Prefs { action } => match action {
            PrefsAction::Set { key, value } => {
                store::run_prefs_set(&cfg, &key, &value).await?;
            }
            PrefsAction::Get { key } => {
                store::run_prefs_get(&cfg, &key).await?;
            }
            PrefsAction::List => {
                store::run_prefs_list(&cfg).await?;
            }
        },
        Commands::Cache { action } => match action {
            CacheAction::Stats => {
                stats::run_stats(&cfg).await?;
            }
            CacheAction::Clear => {
                stats::run_cache_clear(&cfg).await?;
            }
        },
        Commands::ClearData => {
            store::run_clear_data(&cfg).await?;
        }
        Commands::Sources => {
            sources::run_sources(&cfg).await?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
