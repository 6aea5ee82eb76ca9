//! Story Service
//!
//! High-level facade the UI layer calls for every story read and write.
//! Reads prefer the network and mirror results into the durable store;
//! when the network is unreachable they degrade to the local mirror.
//! Writes made while disconnected persist an optimistic entity and a
//! self-contained outbox entry in one atomic transaction.

use crate::api::{StoryApi, DEFAULT_LIST_SIZE};
use crate::error::{CeritaError, Result};
use crate::model::{
    encode_data_url, generate_temp_id, is_temp_id, NewStory, OutboxDraft, Story,
};
use crate::store::StoryStore;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// The handle an offline write returns: the optimistic identity plus the
/// outbox sequence key backing it
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedWrite {
    /// Client-generated temporary story id
    pub temp_id: String,
    /// Outbox sequence key
    pub queue_key: i64,
}

/// Story reads and writes over the durable store and the remote API
#[derive(Debug, Clone)]
pub struct StoryService {
    store: Arc<StoryStore>,
    api: StoryApi,
}

impl StoryService {
    pub fn new(store: Arc<StoryStore>, api: StoryApi) -> Self {
        Self { store, api }
    }

    /// Fetch all stories from the network, mirroring each into the store;
    /// on network failure fall back to the local mirror
    ///
    /// Never fails on an unreachable network or a broken store: the worst
    /// outcome of a read is an empty list.
    pub async fn fetch_all_stories(&self) -> Result<Vec<Story>> {
        match self.api.get_stories(DEFAULT_LIST_SIZE).await {
            Ok(stories) => {
                for story in &stories {
                    if let Err(e) = self.store.put(story).await {
                        warn!(id = %story.id, error = %e, "failed to mirror story");
                    }
                }
                info!(count = stories.len(), "stories fetched from network");
                Ok(stories)
            }
            Err(e) if e.is_degradable() => {
                warn!(error = %e, "network fetch failed, serving local mirror");
                match self.store.get_all().await {
                    Ok(stories) => Ok(stories),
                    Err(storage_err) => {
                        error!(error = %storage_err, "local mirror unavailable");
                        Ok(Vec::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Fetch one story, preferring the network, falling back to the mirror
    ///
    /// `NotFound` propagates only when the story is absent from both.
    pub async fn fetch_story_detail(&self, id: &str) -> Result<Story> {
        // Temporary identities are never known to the server; resolve them
        // from the mirror without touching the network.
        if is_temp_id(id) {
            return match self.store.get(id).await? {
                Some(story) => Ok(story),
                None => Err(CeritaError::not_found(id)),
            };
        }

        match self.api.get_story_detail(id).await {
            Ok(story) => {
                if let Err(e) = self.store.put(&story).await {
                    warn!(id, error = %e, "failed to mirror story detail");
                }
                self.prefetch_photo(&story).await;
                Ok(story)
            }
            Err(e) if e.is_degradable() || matches!(e, CeritaError::NotFound { .. }) => {
                warn!(id, error = %e, "detail fetch failed, trying local mirror");
                match self.store.get(id).await {
                    Ok(Some(story)) => Ok(story),
                    _ => Err(CeritaError::not_found(id)),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// All locally mirrored stories, without touching the network
    pub async fn local_stories(&self) -> Result<Vec<Story>> {
        self.store.get_all().await
    }

    /// Stories written offline and not yet acknowledged by the server
    pub async fn offline_stories(&self) -> Result<Vec<Story>> {
        self.store.offline_only().await
    }

    /// Persist a story written while disconnected
    ///
    /// Validates the submission, assigns a temporary identity, and commits
    /// the optimistic entity together with its outbox entry. A storage
    /// failure propagates so the caller can tell the user the write was
    /// not recorded.
    pub async fn save_story_offline(&self, submission: NewStory) -> Result<QueuedWrite> {
        submission.validate()?;

        let temp_id = generate_temp_id();
        let story = Story::new_offline(&temp_id, &submission);
        let draft = OutboxDraft {
            description: submission.description.clone(),
            photo: encode_data_url(&submission.photo_content_type, &submission.photo),
            lat: submission.lat,
            lon: submission.lon,
            temp_id: temp_id.clone(),
        };

        let queue_key = self.store.save_and_queue(&story, &draft).await?;
        info!(%temp_id, queue_key, "story queued for sync");
        Ok(QueuedWrite { temp_id, queue_key })
    }

    /// Best-effort embedded copy of a remote photo
    ///
    /// Only remote URLs are cached; offline-authored photos are already
    /// embedded in their story record. Failures are logged and swallowed,
    /// never surfaced to the caller.
    async fn prefetch_photo(&self, story: &Story) {
        if story.photo_url.starts_with("data:") {
            return;
        }
        match self.store.get_asset(&story.photo_url).await {
            Ok(Some(_)) => return,
            Ok(None) => {}
            Err(e) => {
                debug!(url = %story.photo_url, error = %e, "asset lookup failed");
                return;
            }
        }

        match self.api.fetch_photo(&story.photo_url).await {
            Ok((content_type, bytes)) => {
                let data = encode_data_url(&content_type, &bytes);
                if let Err(e) = self.store.cache_asset(&story.photo_url, &data).await {
                    debug!(url = %story.photo_url, error = %e, "asset cache write failed");
                }
            }
            Err(e) => {
                debug!(url = %story.photo_url, error = %e, "photo prefetch failed");
            }
        }
    }

    /// Embedded copy of a previously prefetched photo, if any
    pub async fn cached_photo(&self, url: &str) -> Result<Option<crate::model::CachedAsset>> {
        self.store.get_asset(url).await
    }

    /// Delete a story, cascading to any outbox entries that reference it
    pub async fn delete_story(&self, id: &str) -> Result<()> {
        self.store.delete(id).await
    }

    /// Wipe every mirrored story and the whole outbox
    pub async fn clear_all_stories(&self) -> Result<()> {
        self.store.clear_all().await
    }
}
