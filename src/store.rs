//! Preferences, bookmarks, and view history.
//!
//! Local-only persisted viewer state over SQLite, with an explicit
//! clear-all. Preference keys are a closed set — the viewer knows what
//! it renders — and history is bounded so the table cannot grow without
//! limit.

use anyhow::{bail, Result};
use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::config::Config;
use crate::db;
use crate::models::{Bookmark, HistoryEntry};

/// Preference keys the viewer understands.
pub const PREFERENCE_KEYS: &[&str] = &["theme", "font_size", "sidebar_width"];

/// Most-recent history rows kept after each insert.
const HISTORY_CAP: i64 = 100;

fn validate_key(key: &str) -> Result<()> {
    if !PREFERENCE_KEYS.contains(&key) {
        bail!(
            "Unknown preference key: {}. Valid keys: {}",
            key,
            PREFERENCE_KEYS.join(", ")
        );
    }
    Ok(())
}

pub async fn set_preference(pool: &SqlitePool, key: &str, value: &str) -> Result<()> {
    validate_key(key)?;
    sqlx::query(
        r#"
        INSERT INTO preferences (key, value, updated_at) VALUES (?, ?, ?)
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
        "#,
    )
    .bind(key)
    .bind(value)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_preference(pool: &SqlitePool, key: &str) -> Result<Option<String>> {
    validate_key(key)?;
    let row = sqlx::query("SELECT value FROM preferences WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|r| r.get("value")))
}

pub async fn list_preferences(pool: &SqlitePool) -> Result<Vec<(String, String)>> {
    let rows = sqlx::query("SELECT key, value FROM preferences ORDER BY key")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|r| (r.get("key"), r.get("value")))
        .collect())
}

/// Add (or retitle) a bookmark; one bookmark per path.
pub async fn add_bookmark(pool: &SqlitePool, path: &str, title: Option<&str>) -> Result<String> {
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"
        INSERT INTO bookmarks (id, path, title, created_at) VALUES (?, ?, ?, ?)
        ON CONFLICT(path) DO UPDATE SET title = excluded.title
        "#,
    )
    .bind(&id)
    .bind(path)
    .bind(title)
    .bind(Utc::now().timestamp())
    .execute(pool)
    .await?;
    Ok(id)
}

/// Remove a bookmark by path. Returns whether one existed.
pub async fn remove_bookmark(pool: &SqlitePool, path: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM bookmarks WHERE path = ?")
        .bind(path)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_bookmarks(pool: &SqlitePool) -> Result<Vec<Bookmark>> {
    let rows = sqlx::query("SELECT id, path, title, created_at FROM bookmarks ORDER BY created_at DESC, path")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|r| Bookmark {
            id: r.get("id"),
            path: r.get("path"),
            title: r.get("title"),
            created_at: r.get("created_at"),
        })
        .collect())
}

/// Append a history row and prune past the cap.
pub async fn record_view(pool: &SqlitePool, path: &str) -> Result<()> {
    sqlx::query("INSERT INTO history (path, viewed_at) VALUES (?, ?)")
        .bind(path)
        .bind(Utc::now().timestamp())
        .execute(pool)
        .await?;
    sqlx::query(
        "DELETE FROM history WHERE id NOT IN (SELECT id FROM history ORDER BY id DESC LIMIT ?)",
    )
    .bind(HISTORY_CAP)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list_history(pool: &SqlitePool, limit: i64) -> Result<Vec<HistoryEntry>> {
    let rows = sqlx::query("SELECT path, viewed_at FROM history ORDER BY id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .map(|r| HistoryEntry {
            path: r.get("path"),
            viewed_at: r.get("viewed_at"),
        })
        .collect())
}

pub async fn clear_history(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM history").execute(pool).await?;
    Ok(())
}

/// The explicit clear-all: preferences, bookmarks, and history.
pub async fn clear_all(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM preferences").execute(pool).await?;
    sqlx::query("DELETE FROM bookmarks").execute(pool).await?;
    sqlx::query("DELETE FROM history").execute(pool).await?;
    Ok(())
}

// ── CLI entry points ────────────────────────────────────────────────

pub async fn run_prefs_set(config: &Config, key: &str, value: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    set_preference(&pool, key, value).await?;
    pool.close().await;
    println!("{} = {}", key, value);
    Ok(())
}

pub async fn run_prefs_get(config: &Config, key: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let value = get_preference(&pool, key).await?;
    pool.close().await;
    match value {
        Some(v) => println!("{}", v),
        None => println!("(unset)"),
    }
    Ok(())
}

pub async fn run_prefs_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let prefs = list_preferences(&pool).await?;
    pool.close().await;
    if prefs.is_empty() {
        println!("No preferences set.");
        return Ok(());
    }
    for (key, value) in prefs {
        println!("{:<16} {}", key, value);
    }
    Ok(())
}

pub async fn run_bookmark_add(config: &Config, path: &str, title: Option<String>) -> Result<()> {
    let pool = db::connect(config).await?;
    add_bookmark(&pool, path, title.as_deref()).await?;
    pool.close().await;
    println!("Bookmarked {}", path);
    Ok(())
}

pub async fn run_bookmark_remove(config: &Config, path: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    let removed = remove_bookmark(&pool, path).await?;
    pool.close().await;
    if removed {
        println!("Removed bookmark for {}", path);
    } else {
        println!("No bookmark for {}", path);
    }
    Ok(())
}

pub async fn run_bookmark_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let bookmarks = list_bookmarks(&pool).await?;
    pool.close().await;
    if bookmarks.is_empty() {
        println!("No bookmarks.");
        return Ok(());
    }
    for bookmark in bookmarks {
        match bookmark.title {
            Some(title) => println!("{:<48} {}", bookmark.path, title),
            None => println!("{}", bookmark.path),
        }
    }
    Ok(())
}

pub async fn run_history_list(config: &Config, limit: i64) -> Result<()> {
    let pool = db::connect(config).await?;
    let entries = list_history(&pool, limit).await?;
    pool.close().await;
    if entries.is_empty() {
        println!("No history.");
        return Ok(());
    }
    for entry in entries {
        let when = chrono::DateTime::from_timestamp(entry.viewed_at, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| entry.viewed_at.to_string());
        println!("{}  {}", when, entry.path);
    }
    Ok(())
}

pub async fn run_history_clear(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    clear_history(&pool).await?;
    pool.close().await;
    println!("History cleared.");
    Ok(())
}

pub async fn run_clear_data(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    clear_all(&pool).await?;
    pool.close().await;
    println!("Preferences, bookmarks, and history cleared.");
    Ok(())
}
