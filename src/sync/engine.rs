//! # Reconciliation Engine
//!
//! Drains the outbox against the remote API in FIFO order. Replay is
//! at-least-once per entry until the server acknowledges it, and
//! exactly-once from the user's perspective: the entity-existence check
//! discards entries whose optimistic record a prior run already swapped
//! out or the user deleted.
//!
//! A failure mid-run aborts the whole run and leaves the remaining entries
//! queued for the next connectivity trigger; no entry is ever marked
//! synced without the server's canonical record in hand.

use crate::api::StoryApi;
use crate::error::Result;
use crate::store::StoryStore;
use crate::sync::ConnectivitySignal;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Replays queued writes against the remote API
#[derive(Debug, Clone)]
pub struct SyncEngine {
    store: Arc<StoryStore>,
    api: StoryApi,
    connectivity: ConnectivitySignal,
}

impl SyncEngine {
    pub fn new(store: Arc<StoryStore>, api: StoryApi, connectivity: ConnectivitySignal) -> Self {
        Self {
            store,
            api,
            connectivity,
        }
    }

    /// Replay every queued entry, in enqueue order
    ///
    /// Returns `Ok(true)` if at least one entry was synced, `Ok(false)` if
    /// there was nothing to do (offline, or an empty queue). The first
    /// network or storage failure aborts the run with `Err`; everything
    /// already synced stays synced and the rest stays queued.
    pub async fn reconcile(&self) -> Result<bool> {
        if !self.connectivity.is_online() {
            debug!("offline, skipping reconciliation");
            return Ok(false);
        }

        let entries = self.store.list_queue().await?;
        if entries.is_empty() {
            debug!("outbox empty, nothing to reconcile");
            return Ok(false);
        }

        info!(pending = entries.len(), "reconciliation started");
        let mut processed: HashSet<i64> = HashSet::new();
        let mut synced_any = false;

        for entry in entries {
            // Defensive de-duplication against a double-listed key.
            if !processed.insert(entry.key) {
                debug!(key = entry.key, "entry already processed this run");
                continue;
            }

            // Entity deleted locally after enqueue: orphaned entry, no
            // network call.
            if self.store.get(&entry.temp_id).await?.is_none() {
                debug!(key = entry.key, temp_id = %entry.temp_id, "orphaned entry discarded");
                self.store.dequeue(entry.key).await?;
                continue;
            }

            let submission = entry.to_submission()?;
            let canonical = self.api.add_story(&submission).await?;

            self.store
                .complete_sync(&canonical, entry.key, &entry.temp_id)
                .await?;
            info!(key = entry.key, temp_id = %entry.temp_id, id = %canonical.id, "entry synced");
            synced_any = true;
        }

        info!("reconciliation finished");
        Ok(synced_any)
    }
}
