//! Strand content cache.
//!
//! The [`StrandCache`] trait matches the viewer's cache contract:
//! get/set by path, totals for the stats panel, and clear. Backends are
//! pluggable without touching callers — the in-memory map serves tests
//! and one-shot runs, the SQLite backend persists across sessions.
//! Cache trouble is never fatal: callers warn and fall through to the
//! network.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::models::CacheStats;

#[async_trait]
pub trait StrandCache: Send + Sync {
    /// Cached body for a path, or None on a miss.
    async fn get_cached_strand(&self, path: &str) -> Result<Option<String>>;

    /// Store (or replace) the body for a path.
    async fn set_cached_strand(&self, path: &str, content: &str) -> Result<()>;

    async fn stats(&self) -> Result<CacheStats>;

    async fn clear(&self) -> Result<()>;
}

/// Open the backend named in config. The memory backend is only useful
/// within a single process; sqlite is the default.
pub async fn open_cache(config: &Config) -> Result<Box<dyn StrandCache>> {
    match config.cache.backend.as_str() {
        "memory" => Ok(Box::new(MemoryCache::new())),
        _ => {
            let pool = db::connect(config).await?;
            Ok(Box::new(SqliteCache::new(pool)))
        }
    }
}

/// In-memory cache: a map behind a lock.
pub struct MemoryCache {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StrandCache for MemoryCache {
    async fn get_cached_strand(&self, path: &str) -> Result<Option<String>> {
        Ok(self.entries.read().unwrap().get(path).cloned())
    }

    async fn set_cached_strand(&self, path: &str, content: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert(path.to_string(), content.to_string());
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let entries = self.entries.read().unwrap();
        Ok(CacheStats {
            total_items: entries.len() as u64,
            total_bytes: entries.values().map(|v| v.len() as u64).sum(),
        })
    }

    async fn clear(&self) -> Result<()> {
        self.entries.write().unwrap().clear();
        Ok(())
    }
}

/// Persistent cache over the `cached_strands` table.
pub struct SqliteCache {
    pool: SqlitePool,
}

impl SqliteCache {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl StrandCache for SqliteCache {
    async fn get_cached_strand(&self, path: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT content FROM cached_strands WHERE path = ?")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("content")))
    }

    async fn set_cached_strand(&self, path: &str, content: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO cached_strands (path, content, content_hash, bytes, fetched_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(path) DO UPDATE SET
                content = excluded.content,
                content_hash = excluded.content_hash,
                bytes = excluded.bytes,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(path)
        .bind(content)
        .bind(content_hash(content))
        .bind(content.len() as i64)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS items, COALESCE(SUM(bytes), 0) AS bytes FROM cached_strands",
        )
        .fetch_one(&self.pool)
        .await?;
        let items: i64 = row.get("items");
        let bytes: i64 = row.get("bytes");
        Ok(CacheStats {
            total_items: items as u64,
            total_bytes: bytes as u64,
        })
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM cached_strands")
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        assert!(cache.get_cached_strand("a/one.md").await.unwrap().is_none());

        cache.set_cached_strand("a/one.md", "# One").await.unwrap();
        assert_eq!(
            cache.get_cached_strand("a/one.md").await.unwrap().unwrap(),
            "# One"
        );
    }

    #[tokio::test]
    async fn test_memory_cache_overwrite_not_duplicate() {
        let cache = MemoryCache::new();
        cache.set_cached_strand("a/one.md", "v1").await.unwrap();
        cache.set_cached_strand("a/one.md", "v2").await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_items, 1);
        assert_eq!(stats.total_bytes, 2);
        assert_eq!(
            cache.get_cached_strand("a/one.md").await.unwrap().unwrap(),
            "v2"
        );
    }

    #[tokio::test]
    async fn test_memory_cache_stats_and_clear() {
        let cache = MemoryCache::new();
        cache.set_cached_strand("a", "12345").await.unwrap();
        cache.set_cached_strand("b", "123").await.unwrap();

        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_items, 2);
        assert_eq!(stats.total_bytes, 8);

        cache.clear().await.unwrap();
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.total_items, 0);
        assert_eq!(stats.total_bytes, 0);
    }

    #[test]
    fn test_content_hash_stable() {
        assert_eq!(content_hash("abc"), content_hash("abc"));
        assert_ne!(content_hash("abc"), content_hash("abd"));
    }
}
