//! # Outbox Queue Operations
//!
//! The pending-write queue: every mutation made while disconnected lands
//! here with a store-assigned monotonic sequence key, independent of entity
//! identity. Entries leave the queue only through successful reconciliation
//! (`dequeue`) or a cascade delete of their entity.

use crate::error::Result;
use crate::model::{OutboxDraft, OutboxEntry};
use crate::store::StoryStore;
use sqlx::Row;
use tracing::debug;

impl StoryStore {
    /// Append a pending write, returning the assigned sequence key
    pub async fn enqueue(&self, draft: &OutboxDraft) -> Result<i64> {
        draft.validate()?;

        let result = sqlx::query(
            "INSERT INTO outbox (description, photo, lat, lon, queued_at, temp_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&draft.description)
        .bind(&draft.photo)
        .bind(draft.lat)
        .bind(draft.lon)
        .bind(chrono::Utc::now().to_rfc3339())
        .bind(&draft.temp_id)
        .execute(self.pool())
        .await?;

        let key = result.last_insert_rowid();
        debug!(key, temp_id = %draft.temp_id, "entry queued");
        Ok(key)
    }

    /// List pending entries in enqueue order
    pub async fn list_queue(&self) -> Result<Vec<OutboxEntry>> {
        let rows = sqlx::query(
            "SELECT key, description, photo, lat, lon, queued_at, temp_id
             FROM outbox ORDER BY key ASC",
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter()
            .map(|row| {
                Ok(OutboxEntry {
                    key: row.try_get("key")?,
                    description: row.try_get("description")?,
                    photo: row.try_get("photo")?,
                    lat: row.try_get("lat")?,
                    lon: row.try_get("lon")?,
                    queued_at: row.try_get("queued_at")?,
                    temp_id: row.try_get("temp_id")?,
                })
            })
            .collect()
    }

    /// Remove one entry by sequence key
    pub async fn dequeue(&self, key: i64) -> Result<()> {
        sqlx::query("DELETE FROM outbox WHERE key = ?")
            .bind(key)
            .execute(self.pool())
            .await?;
        debug!(key, "entry dequeued");
        Ok(())
    }

    /// Number of pending entries
    pub async fn queue_len(&self) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM outbox")
            .fetch_one(self.pool())
            .await?;
        Ok(count as u64)
    }
}
