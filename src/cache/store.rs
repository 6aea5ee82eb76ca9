//! # Partitioned Response Cache
//!
//! SQLite-backed storage for intercepted responses, isolated by named
//! partition. Each partition carries its own eviction policy: the image
//! and API partitions are age- and count-bounded, the tile partition holds
//! tens of thousands of entries for about ninety days, and the static
//! partition is unbounded and replaced wholesale on a version bump.
//!
//! Lives in its own database file, separate from the durable story store.

use crate::cache::{FetchedResponse, EXPECTED_CACHES, API_CACHE, IMAGE_CACHE, TILE_CACHE};
use crate::error::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

/// Per-partition eviction bounds
#[derive(Debug, Clone, Copy)]
pub struct PartitionPolicy {
    /// Maximum entries, oldest evicted first; `None` means unbounded
    pub max_entries: Option<i64>,
    /// Maximum age in days; `None` means no age limit
    pub max_age_days: Option<i64>,
}

/// Eviction policy for a partition name
pub fn policy_for(partition: &str) -> PartitionPolicy {
    match partition {
        p if p == IMAGE_CACHE => PartitionPolicy {
            max_entries: Some(200),
            max_age_days: Some(30),
        },
        p if p == API_CACHE => PartitionPolicy {
            max_entries: Some(100),
            max_age_days: Some(7),
        },
        p if p == TILE_CACHE => PartitionPolicy {
            max_entries: Some(20_000),
            max_age_days: Some(90),
        },
        _ => PartitionPolicy {
            max_entries: None,
            max_age_days: None,
        },
    }
}

/// A response read back from a partition
#[derive(Debug, Clone)]
pub struct StoredResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub cached_at: String,
}

/// Partition-isolated response storage
#[derive(Debug, Clone)]
pub struct CacheStore {
    pool: SqlitePool,
}

impl CacheStore {
    /// Open or create the cache database at the given path
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

        let store = Self { pool };
        store.init_schema().await?;
        info!(path = %path.display(), "response cache opened");
        Ok(store)
    }

    /// Open an in-memory cache, used by tests
    pub async fn open_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS responses (
                partition TEXT NOT NULL,
                url TEXT NOT NULL,
                status INTEGER NOT NULL,
                content_type TEXT NOT NULL,
                body BLOB NOT NULL,
                cached_at TEXT NOT NULL,
                PRIMARY KEY (partition, url)
            )",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Write a response into a partition and enforce its eviction bounds
    pub async fn put_response(
        &self,
        partition: &str,
        url: &str,
        response: &FetchedResponse,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO responses
                (partition, url, status, content_type, body, cached_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(partition)
        .bind(url)
        .bind(response.status as i64)
        .bind(&response.content_type)
        .bind(&response.body)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        self.trim(partition).await?;
        Ok(())
    }

    /// Read a response from one partition only
    ///
    /// Entries past their partition's age bound count as misses and are
    /// removed on the way out.
    pub async fn get_response(&self, partition: &str, url: &str) -> Result<Option<StoredResponse>> {
        let row = sqlx::query(
            "SELECT status, content_type, body, cached_at
             FROM responses WHERE partition = ? AND url = ?",
        )
        .bind(partition)
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let cached_at: String = row.try_get("cached_at")?;
        if let Some(max_age_days) = policy_for(partition).max_age_days {
            let cutoff = chrono::Utc::now() - chrono::Duration::days(max_age_days);
            if cached_at < cutoff.to_rfc3339() {
                debug!(partition, url, "stale entry dropped");
                sqlx::query("DELETE FROM responses WHERE partition = ? AND url = ?")
                    .bind(partition)
                    .bind(url)
                    .execute(&self.pool)
                    .await?;
                return Ok(None);
            }
        }

        Ok(Some(StoredResponse {
            status: row.try_get::<i64, _>("status")? as u16,
            content_type: row.try_get("content_type")?,
            body: row.try_get("body")?,
            cached_at,
        }))
    }

    /// Enforce the partition's age and count bounds, oldest first
    async fn trim(&self, partition: &str) -> Result<()> {
        let policy = policy_for(partition);

        if let Some(max_age_days) = policy.max_age_days {
            let cutoff = chrono::Utc::now() - chrono::Duration::days(max_age_days);
            sqlx::query("DELETE FROM responses WHERE partition = ? AND cached_at < ?")
                .bind(partition)
                .bind(cutoff.to_rfc3339())
                .execute(&self.pool)
                .await?;
        }

        if let Some(max_entries) = policy.max_entries {
            sqlx::query(
                "DELETE FROM responses WHERE partition = ?1 AND url IN (
                    SELECT url FROM responses WHERE partition = ?1
                    ORDER BY cached_at DESC, url
                    LIMIT -1 OFFSET ?2
                )",
            )
            .bind(partition)
            .bind(max_entries)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Version-based garbage collection: drop partitions the current
    /// version does not expect
    pub async fn remove_unknown_partitions(&self) -> Result<u64> {
        let placeholders = EXPECTED_CACHES
            .iter()
            .map(|_| "?")
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "DELETE FROM responses WHERE partition NOT IN ({})",
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for name in EXPECTED_CACHES {
            query = query.bind(*name);
        }
        let result = query.execute(&self.pool).await?;

        if result.rows_affected() > 0 {
            info!(removed = result.rows_affected(), "stale cache partitions removed");
        }
        Ok(result.rows_affected())
    }

    /// Distinct partition names currently present
    pub async fn partitions(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT partition FROM responses ORDER BY partition")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| Ok(row.try_get::<String, _>("partition")?))
            .collect()
    }

    /// Number of entries in one partition
    pub async fn partition_len(&self, partition: &str) -> Result<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM responses WHERE partition = ?")
                .bind(partition)
                .fetch_one(&self.pool)
                .await?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::STATIC_CACHE;

    fn response(body: &[u8]) -> FetchedResponse {
        FetchedResponse {
            status: 200,
            content_type: "image/png".to_string(),
            body: body.to_vec(),
        }
    }

    async fn backdate(store: &CacheStore, partition: &str, url: &str, days: i64) {
        let stamp = (chrono::Utc::now() - chrono::Duration::days(days)).to_rfc3339();
        sqlx::query("UPDATE responses SET cached_at = ? WHERE partition = ? AND url = ?")
            .bind(stamp)
            .bind(partition)
            .bind(url)
            .execute(&store.pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = CacheStore::open_in_memory().await.unwrap();
        store
            .put_response(IMAGE_CACHE, "https://x.test/a.png", &response(b"img"))
            .await
            .unwrap();

        let hit = store
            .get_response(IMAGE_CACHE, "https://x.test/a.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.body, b"img");
    }

    #[tokio::test]
    async fn test_partition_isolation() {
        let store = CacheStore::open_in_memory().await.unwrap();
        store
            .put_response(IMAGE_CACHE, "https://x.test/a.png", &response(b"img"))
            .await
            .unwrap();

        // Same URL, different partition: a miss.
        assert!(store
            .get_response(API_CACHE, "https://x.test/a.png")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_count_bound_evicts_oldest() {
        let store = CacheStore::open_in_memory().await.unwrap();

        // The API partition caps at 100 entries.
        for i in 0..105 {
            // Distinct timestamps matter for eviction order; the RFC-3339
            // strings here differ at millisecond precision often enough,
            // and ties break deterministically on URL.
            store
                .put_response(API_CACHE, &format!("https://x.test/{i:04}"), &response(b"r"))
                .await
                .unwrap();
        }

        assert_eq!(store.partition_len(API_CACHE).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn test_age_bound_turns_stale_read_into_miss() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let url = "https://x.test/v1/stories";
        store.put_response(API_CACHE, url, &response(b"r")).await.unwrap();

        // The API partition keeps entries for seven days.
        backdate(&store, API_CACHE, url, 8).await;

        assert!(store.get_response(API_CACHE, url).await.unwrap().is_none());
        // The stale row was deleted, not just hidden.
        assert_eq!(store.partition_len(API_CACHE).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_age_bound_trims_on_write() {
        let store = CacheStore::open_in_memory().await.unwrap();
        store
            .put_response(IMAGE_CACHE, "https://x.test/old.png", &response(b"a"))
            .await
            .unwrap();

        // The image partition keeps entries for thirty days.
        backdate(&store, IMAGE_CACHE, "https://x.test/old.png", 31).await;

        store
            .put_response(IMAGE_CACHE, "https://x.test/new.png", &response(b"b"))
            .await
            .unwrap();

        assert_eq!(store.partition_len(IMAGE_CACHE).await.unwrap(), 1);
        assert!(store
            .get_response(IMAGE_CACHE, "https://x.test/new.png")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_tile_age_bound() {
        let store = CacheStore::open_in_memory().await.unwrap();
        let url = "https://a.tile.openstreetmap.org/3/4/2.png";
        store.put_response(TILE_CACHE, url, &response(b"t")).await.unwrap();

        // Well within the ninety-day tile retention.
        backdate(&store, TILE_CACHE, url, 89).await;
        assert!(store.get_response(TILE_CACHE, url).await.unwrap().is_some());

        backdate(&store, TILE_CACHE, url, 91).await;
        assert!(store.get_response(TILE_CACHE, url).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_static_partition_unbounded() {
        let policy = policy_for(STATIC_CACHE);
        assert!(policy.max_entries.is_none());
        assert!(policy.max_age_days.is_none());
    }

    #[tokio::test]
    async fn test_remove_unknown_partitions() {
        let store = CacheStore::open_in_memory().await.unwrap();
        store
            .put_response(STATIC_CACHE, "https://x.test/app.js", &response(b"js"))
            .await
            .unwrap();
        store
            .put_response("static-cache-v0", "https://x.test/old.js", &response(b"js"))
            .await
            .unwrap();

        let removed = store.remove_unknown_partitions().await.unwrap();
        assert_eq!(removed, 1);

        let partitions = store.partitions().await.unwrap();
        assert_eq!(partitions, vec![STATIC_CACHE.to_string()]);
    }
}
