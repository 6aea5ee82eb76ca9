//! # Durable Store Module
//!
//! Local SQLite database backing the offline-first story core. Mirrors
//! server entities, holds the pending-write outbox, and caches binary
//! assets, all inside one versioned database file.
//!
//! ## Collections
//!
//! - **`stories`** - mirrored server entities keyed by story id
//! - **`outbox`** - pending mutations keyed by an auto-assigned sequence
//! - **`asset_cache`** - embedded copies of remote photos keyed by URL
//!
//! ## Key Components
//!
//! - `StoryStore`: connection pool, schema management, atomic transactions
//! - `stories.rs`: mirrored-entity operations
//! - `outbox.rs`: pending-write queue operations
//! - `assets.rs`: binary-asset cache operations
//!
//! Schema upgrades are additive only: migrations may create new tables but
//! never drop existing collections or change their keys.

pub mod assets;
pub mod outbox;
pub mod stories;

use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use tracing::{debug, info};

/// Current database schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Local database connection manager
///
/// Manages the SQLite connection pool and provides the atomic transaction
/// primitive every multi-collection mutation goes through.
#[derive(Debug, Clone)]
pub struct StoryStore {
    pool: SqlitePool,
}

impl StoryStore {
    /// Open or create the store at the given path
    ///
    /// Creates the database file if it does not exist and applies any
    /// pending migrations. Uses WAL mode for better concurrency.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| crate::error::CeritaError::storage(e.to_string()))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;
        sqlx::query("PRAGMA foreign_keys=ON").execute(&pool).await?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!(path = %path.display(), "story store opened");
        Ok(store)
    }

    /// Open an in-memory store, used by tests
    pub async fn open_in_memory() -> Result<Self> {
        // A single connection keeps every caller on the same memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Apply pending migrations
    ///
    /// Migrations are strictly additive: each version may create tables but
    /// existing collections are never dropped and their keys never change.
    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        let (current_version,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(&self.pool)
                .await?;

        if current_version < 1 {
            self.apply_migration_1().await?;
        }
        if current_version < 2 {
            self.apply_migration_2().await?;
        }

        if current_version < CURRENT_SCHEMA_VERSION {
            debug!(
                from = current_version,
                to = CURRENT_SCHEMA_VERSION,
                "schema migrated"
            );
        }
        Ok(())
    }

    /// Migration 1: mirrored stories and the pending-write outbox
    async fn apply_migration_1(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS stories (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                photo_url TEXT NOT NULL,
                lat REAL,
                lon REAL,
                created_at TEXT NOT NULL,
                is_offline INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS outbox (
                key INTEGER PRIMARY KEY AUTOINCREMENT,
                description TEXT NOT NULL,
                photo TEXT NOT NULL,
                lat REAL,
                lon REAL,
                queued_at TEXT NOT NULL,
                temp_id TEXT NOT NULL
            )",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (1, ?)")
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Migration 2: binary-asset cache
    async fn apply_migration_2(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS asset_cache (
                url TEXT PRIMARY KEY,
                data TEXT NOT NULL,
                cached_at TEXT NOT NULL
            )",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (2, ?)")
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wipe mirrored stories and the outbox in one transaction
    pub async fn clear_all(&self) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM stories").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM outbox").execute(&mut *tx).await?;
        tx.commit().await?;
        info!("cleared all stories and queued entries");
        Ok(())
    }

    /// Basic per-collection counts for the debug surface
    pub async fn stats(&self) -> Result<StoreStats> {
        let (story_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM stories")
            .fetch_one(&self.pool)
            .await?;
        let (offline_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM stories WHERE is_offline = 1")
                .fetch_one(&self.pool)
                .await?;
        let (queued_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM outbox")
            .fetch_one(&self.pool)
            .await?;
        let (asset_count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM asset_cache")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStats {
            story_count: story_count as u64,
            offline_story_count: offline_count as u64,
            queued_count: queued_count as u64,
            cached_asset_count: asset_count as u64,
        })
    }
}

/// Store statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Total mirrored stories
    pub story_count: u64,
    /// Stories not yet acknowledged by the server
    pub offline_story_count: u64,
    /// Pending outbox entries
    pub queued_count: u64,
    /// Cached binary assets
    pub cached_asset_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_store_creation() {
        let store = StoryStore::open_in_memory().await;
        assert!(store.is_ok());
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let store = StoryStore::open_in_memory().await.unwrap();
        // Re-running against an up-to-date schema is a no-op.
        store.run_migrations().await.unwrap();

        let (version,): (i32,) =
            sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn test_empty_stats() {
        let store = StoryStore::open_in_memory().await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.story_count, 0);
        assert_eq!(stats.offline_story_count, 0);
        assert_eq!(stats.queued_count, 0);
        assert_eq!(stats.cached_asset_count, 0);
    }
}
