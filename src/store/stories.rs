//! # Mirrored Story Operations
//!
//! CRUD over the mirrored-entity collection, plus the two multi-collection
//! mutations the offline flow depends on: `save_and_queue` (optimistic
//! entity + outbox entry in one transaction) and `complete_sync` (the
//! atomic temporary-to-permanent identity swap).
//!
//! Every multi-collection mutation runs inside a single SQLite transaction
//! so readers never observe a half-applied state.

use crate::error::Result;
use crate::model::{OutboxDraft, Story};
use crate::store::StoryStore;
use sqlx::Row;
use tracing::debug;

impl StoryStore {
    /// Insert or replace one mirrored story
    pub async fn put(&self, story: &Story) -> Result<()> {
        story.validate()?;
        sqlx::query(
            "INSERT OR REPLACE INTO stories
                (id, name, description, photo_url, lat, lon, created_at, is_offline)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&story.id)
        .bind(&story.name)
        .bind(&story.description)
        .bind(&story.photo_url)
        .bind(story.lat)
        .bind(story.lon)
        .bind(&story.created_at)
        .bind(story.is_offline)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Get one mirrored story by id
    pub async fn get(&self, id: &str) -> Result<Option<Story>> {
        let row = sqlx::query(
            "SELECT id, name, description, photo_url, lat, lon, created_at, is_offline
             FROM stories WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        match row {
            Some(row) => Ok(Some(row_to_story(&row)?)),
            None => Ok(None),
        }
    }

    /// Get all mirrored stories, newest first
    pub async fn get_all(&self) -> Result<Vec<Story>> {
        let rows = sqlx::query(
            "SELECT id, name, description, photo_url, lat, lon, created_at, is_offline
             FROM stories ORDER BY created_at DESC",
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_story).collect()
    }

    /// Get only stories not yet acknowledged by the server
    pub async fn offline_only(&self) -> Result<Vec<Story>> {
        let rows = sqlx::query(
            "SELECT id, name, description, photo_url, lat, lon, created_at, is_offline
             FROM stories WHERE is_offline = 1 ORDER BY created_at DESC",
        )
        .fetch_all(self.pool())
        .await?;

        rows.iter().map(row_to_story).collect()
    }

    /// Delete a story and cascade to any outbox entries referencing it
    ///
    /// Runs as one transaction so a reconciliation run can never observe the
    /// entity gone while its queue entries remain.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM stories WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM outbox WHERE temp_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(
            id,
            cascaded = result.rows_affected(),
            "story deleted with outbox cascade"
        );
        Ok(())
    }

    /// Persist an offline write: optimistic entity plus its outbox entry
    ///
    /// Either both records become visible or neither does. Returns the
    /// store-assigned outbox sequence key.
    pub async fn save_and_queue(&self, story: &Story, draft: &OutboxDraft) -> Result<i64> {
        story.validate()?;
        draft.validate()?;

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO stories
                (id, name, description, photo_url, lat, lon, created_at, is_offline)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&story.id)
        .bind(&story.name)
        .bind(&story.description)
        .bind(&story.photo_url)
        .bind(story.lat)
        .bind(story.lon)
        .bind(&story.created_at)
        .bind(story.is_offline)
        .execute(&mut *tx)
        .await?;

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
        .execute(&mut *tx)
        .await?;

        let key = result.last_insert_rowid();
        tx.commit().await?;
        debug!(temp_id = %draft.temp_id, key, "story saved and queued");
        Ok(key)
    }

    /// Finish a successful reconciliation of one entry
    ///
    /// Writes the canonical server entity, removes the outbox entry, and
    /// removes the temporary entity, all in one transaction. Readers observe
    /// either the temporary record or the permanent one, never both or
    /// neither.
    pub async fn complete_sync(&self, canonical: &Story, key: i64, temp_id: &str) -> Result<()> {
        canonical.validate()?;

        let mut tx = self.pool().begin().await?;

        sqlx::query(
            "INSERT OR REPLACE INTO stories
                (id, name, description, photo_url, lat, lon, created_at, is_offline)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0)",
        )
        .bind(&canonical.id)
        .bind(&canonical.name)
        .bind(&canonical.description)
        .bind(&canonical.photo_url)
        .bind(canonical.lat)
        .bind(canonical.lon)
        .bind(&canonical.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM outbox WHERE key = ?")
            .bind(key)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM stories WHERE id = ?")
            .bind(temp_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(temp_id, canonical_id = %canonical.id, key, "identity swap committed");
        Ok(())
    }
}

/// Convert a database row to a Story
fn row_to_story(row: &sqlx::sqlite::SqliteRow) -> Result<Story> {
    Ok(Story {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        photo_url: row.try_get("photo_url")?,
        lat: row.try_get("lat")?,
        lon: row.try_get("lon")?,
        created_at: row.try_get("created_at")?,
        is_offline: row.try_get("is_offline")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CeritaError;
    use crate::model::{encode_data_url, generate_temp_id, NewStory};

    fn sample_story(id: &str) -> Story {
        Story {
            id: id.to_string(),
            name: "Dina".to_string(),
            description: "sunset at the harbor".to_string(),
            photo_url: "https://example.test/photos/1.jpg".to_string(),
            lat: Some(-6.2),
            lon: Some(106.8),
            created_at: chrono::Utc::now().to_rfc3339(),
            is_offline: false,
        }
    }

    fn sample_offline(temp_id: &str) -> (Story, OutboxDraft) {
        let submission = NewStory {
            description: "written offline".to_string(),
            photo: vec![0xff, 0xd8, 0xff],
            photo_content_type: "image/jpeg".to_string(),
            lat: None,
            lon: None,
        };
        let story = Story::new_offline(temp_id, &submission);
        let draft = OutboxDraft {
            description: submission.description.clone(),
            photo: encode_data_url("image/jpeg", &submission.photo),
            lat: None,
            lon: None,
            temp_id: temp_id.to_string(),
        };
        (story, draft)
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let store = StoryStore::open_in_memory().await.unwrap();
        let story = sample_story("abc123");

        store.put(&story).await.unwrap();
        let loaded = store.get("abc123").await.unwrap().unwrap();
        assert_eq!(loaded, story);

        store.delete("abc123").await.unwrap();
        assert!(store.get("abc123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_rejects_half_coordinates() {
        let store = StoryStore::open_in_memory().await.unwrap();
        let mut story = sample_story("abc123");
        story.lon = None;
        assert!(matches!(
            store.put(&story).await,
            Err(CeritaError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_put_is_upsert() {
        let store = StoryStore::open_in_memory().await.unwrap();
        let mut story = sample_story("abc123");
        store.put(&story).await.unwrap();

        story.description = "updated".to_string();
        store.put(&story).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "updated");
    }

    #[tokio::test]
    async fn test_save_and_queue_visible_together() {
        let store = StoryStore::open_in_memory().await.unwrap();
        let temp_id = generate_temp_id();
        let (story, draft) = sample_offline(&temp_id);

        let key = store.save_and_queue(&story, &draft).await.unwrap();
        assert!(key > 0);

        assert!(store.get(&temp_id).await.unwrap().is_some());
        let queue = store.list_queue().await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].key, key);
        assert_eq!(queue[0].temp_id, temp_id);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_outbox() {
        let store = StoryStore::open_in_memory().await.unwrap();
        let temp_id = generate_temp_id();
        let (story, draft) = sample_offline(&temp_id);
        store.save_and_queue(&story, &draft).await.unwrap();

        store.delete(&temp_id).await.unwrap();

        assert!(store.get(&temp_id).await.unwrap().is_none());
        assert!(store.list_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_sync_swaps_identity() {
        let store = StoryStore::open_in_memory().await.unwrap();
        let temp_id = generate_temp_id();
        let (story, draft) = sample_offline(&temp_id);
        let key = store.save_and_queue(&story, &draft).await.unwrap();

        let mut canonical = sample_story("abc123");
        canonical.description = story.description.clone();
        store.complete_sync(&canonical, key, &temp_id).await.unwrap();

        assert!(store.get(&temp_id).await.unwrap().is_none());
        let synced = store.get("abc123").await.unwrap().unwrap();
        assert!(!synced.is_offline);
        assert!(store.list_queue().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_offline_only_filter() {
        let store = StoryStore::open_in_memory().await.unwrap();
        store.put(&sample_story("abc123")).await.unwrap();

        let temp_id = generate_temp_id();
        let (story, draft) = sample_offline(&temp_id);
        store.save_and_queue(&story, &draft).await.unwrap();

        let offline = store.offline_only().await.unwrap();
        assert_eq!(offline.len(), 1);
        assert_eq!(offline[0].id, temp_id);
    }

    #[tokio::test]
    async fn test_clear_all() {
        let store = StoryStore::open_in_memory().await.unwrap();
        store.put(&sample_story("abc123")).await.unwrap();
        let temp_id = generate_temp_id();
        let (story, draft) = sample_offline(&temp_id);
        store.save_and_queue(&story, &draft).await.unwrap();

        store.clear_all().await.unwrap();

        assert!(store.get_all().await.unwrap().is_empty());
        assert!(store.list_queue().await.unwrap().is_empty());
    }
}
