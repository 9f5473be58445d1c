//! Strand retrieval: cache first, network second, transforms last.
//!
//! Cache and history failures are deliberately non-fatal — they warn on
//! stderr and the command proceeds on the network path, matching the
//! viewer's degrade-never-crash posture.

use anyhow::Result;

use crate::cache::{self, StrandCache};
use crate::config::Config;
use crate::db;
use crate::github::GitHubClient;
use crate::render::{MarkdownPipeline, RenderContext};
use crate::store;

/// Fetched strand body plus where it came from.
pub struct StrandContent {
    pub branch: String,
    pub content: String,
    pub from_cache: bool,
}

/// Core retrieval used by the CLI: consult the cache, fall through to
/// the contents API, then backfill the cache.
pub async fn fetch_strand(
    config: &Config,
    client: &GitHubClient,
    path: &str,
    use_cache: bool,
) -> Result<StrandContent> {
    let cache = if use_cache {
        match cache::open_cache(config).await {
            Ok(cache) => Some(cache),
            Err(e) => {
                eprintln!("Warning: cache unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    if let Some(cache) = &cache {
        match cache.get_cached_strand(path).await {
            Ok(Some(content)) => {
                let branch = config
                    .branch_candidates()
                    .first()
                    .cloned()
                    .unwrap_or_else(|| "main".to_string());
                return Ok(StrandContent {
                    branch,
                    content,
                    from_cache: true,
                });
            }
            Ok(None) => {}
            Err(e) => eprintln!("Warning: cache read failed: {}", e),
        }
    }

    let (branch, content) = client.fetch_file(path, &config.branch_candidates()).await?;

    if let Some(cache) = &cache {
        if let Err(e) = cache.set_cached_strand(path, &content).await {
            eprintln!("Warning: cache write failed: {}", e);
        }
    }

    Ok(StrandContent {
        branch,
        content,
        from_cache: false,
    })
}

/// CLI entry point: fetch, record the view, transform, print.
pub async fn run_get(config: &Config, path: &str, raw: bool, no_cache: bool) -> Result<()> {
    let client = GitHubClient::new(config)?;
    let strand = match fetch_strand(config, &client, path, !no_cache).await {
        Ok(strand) => strand,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match db::connect(config).await {
        Ok(pool) => {
            if let Err(e) = store::record_view(&pool, path).await {
                eprintln!("Warning: could not record history: {}", e);
            }
            pool.close().await;
        }
        Err(e) => eprintln!("Warning: could not record history: {}", e),
    }

    if raw {
        println!("{}", strand.content);
        return Ok(());
    }

    let current_dir = match path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    };
    let ctx = RenderContext {
        raw_base: client.raw_url(&strand.branch, "").trim_end_matches('/').to_string(),
        current_dir,
    };
    let pipeline = MarkdownPipeline::new(config.render.strip_flags);
    println!("{}", pipeline.apply(&strand.content, &ctx));

    if strand.from_cache && atty::is(atty::Stream::Stderr) {
        eprintln!("(served from cache)");
    }

    Ok(())
}
