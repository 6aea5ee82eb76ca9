//! # Binary Asset Cache
//!
//! Lazily populated copies of remote photos, keyed by source URL. Only
//! remote assets are cached here; offline-authored photos are already
//! embedded in their story record and never enter this collection.

use crate::error::Result;
use crate::model::CachedAsset;
use crate::store::StoryStore;
use sqlx::Row;

impl StoryStore {
    /// Store or refresh an embedded copy of a remote asset
    pub async fn cache_asset(&self, url: &str, data: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO asset_cache (url, data, cached_at) VALUES (?, ?, ?)",
        )
        .bind(url)
        .bind(data)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Look up a cached asset by its source URL
    pub async fn get_asset(&self, url: &str) -> Result<Option<CachedAsset>> {
        let row = sqlx::query("SELECT url, data, cached_at FROM asset_cache WHERE url = ?")
            .bind(url)
            .fetch_optional(self.pool())
            .await?;

        match row {
            Some(row) => Ok(Some(CachedAsset {
                url: row.try_get("url")?,
                data: row.try_get("data")?,
                cached_at: row.try_get("cached_at")?,
            })),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_and_get_asset() {
        let store = StoryStore::open_in_memory().await.unwrap();
        let url = "https://example.test/photos/1.jpg";
        let data = "data:image/jpeg;base64,AAAA";

        store.cache_asset(url, data).await.unwrap();
        let asset = store.get_asset(url).await.unwrap().unwrap();
        assert_eq!(asset.url, url);
        assert_eq!(asset.data, data);
    }

    #[tokio::test]
    async fn test_missing_asset() {
        let store = StoryStore::open_in_memory().await.unwrap();
        assert!(store
            .get_asset("https://example.test/none.jpg")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cache_asset_replaces() {
        let store = StoryStore::open_in_memory().await.unwrap();
        let url = "https://example.test/photos/1.jpg";
        store.cache_asset(url, "data:image/jpeg;base64,AAAA").await.unwrap();
        store.cache_asset(url, "data:image/jpeg;base64,BBBB").await.unwrap();

        let asset = store.get_asset(url).await.unwrap().unwrap();
        assert_eq!(asset.data, "data:image/jpeg;base64,BBBB");
    }
}
