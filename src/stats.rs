//! Local database statistics.
//!
//! A quick summary of what Codex holds on disk: cached strand totals,
//! bookmark / history / preference counts, and the database file size.
//! Used by `codex cache stats` to confirm caching is doing its job.

use anyhow::Result;

use crate::cache::{self, StrandCache};
use crate::config::Config;
use crate::db;

pub async fn run_stats(config: &Config) -> Result<()> {
    let cache = cache::open_cache(config).await?;
    let cache_stats = cache.stats().await?;

    let pool = db::connect(config).await?;
    let bookmarks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookmarks")
        .fetch_one(&pool)
        .await?;
    let history: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM history")
        .fetch_one(&pool)
        .await?;
    let preferences: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM preferences")
        .fetch_one(&pool)
        .await?;
    pool.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Codex — Local Data");
    println!("==================");
    println!();
    println!("  Database:      {}", config.db.path.display());
    println!("  Size:          {}", format_bytes(db_size));
    println!();
    println!(
        "  Cached strands: {} ({})",
        cache_stats.total_items,
        format_bytes(cache_stats.total_bytes)
    );
    println!("  Bookmarks:      {}", bookmarks);
    println!("  History rows:   {}", history);
    println!("  Preferences:    {}", preferences);

    Ok(())
}

pub async fn run_cache_clear(config: &Config) -> Result<()> {
    let cache = cache::open_cache(config).await?;
    cache.clear().await?;
    println!("Cache cleared.");
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
