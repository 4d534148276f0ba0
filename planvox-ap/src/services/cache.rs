//! SQLite-backed audio cache
//!
//! Durable key/value store for synthesized audio, keyed by `voice::text`.
//! The schema is created on open; lookups that find nothing return `None`
//! rather than an error.

use crate::error::Result;
use crate::services::AudioCache;
use async_trait::async_trait;
use sqlx::{Pool, Sqlite};
use tracing::{debug, info};

/// Audio cache over a SQLite pool
pub struct SqliteAudioCache {
    pool: Pool<Sqlite>,
}

impl SqliteAudioCache {
    /// Open the cache, creating the schema if needed
    pub async fn new(pool: Pool<Sqlite>) -> Result<Self> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS audio_cache (
                key TEXT PRIMARY KEY,
                bytes BLOB NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            )
            "#,
        )
        .execute(&pool)
        .await?;

        info!("Audio cache ready");
        Ok(Self { pool })
    }

    /// Number of cached entries (used by status reporting)
    pub async fn len(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audio_cache")
            .fetch_one(&self.pool)
            .await?;
        Ok(count as u64)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

#[async_trait]
impl AudioCache for SqliteAudioCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let row: Option<(Vec<u8>,)> =
            sqlx::query_as("SELECT bytes FROM audio_cache WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        if row.is_some() {
            debug!("Audio cache hit for key ({} chars)", key.len());
        }
        Ok(row.map(|(bytes,)| bytes))
    }

    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        sqlx::query(
            "INSERT INTO audio_cache (key, bytes) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET bytes = excluded.bytes",
        )
        .bind(key)
        .bind(bytes)
        .execute(&self.pool)
        .await?;

        debug!("Cached {} audio bytes", bytes.len());
        Ok(())
    }
}
