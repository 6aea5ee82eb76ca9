//! Cerita - Offline-First Story Synchronization Core
//!
//! The synchronization core of a browser-style story-sharing application:
//! a durable local mirror of server data, a write-ahead outbox for
//! mutations made while disconnected, a reconciliation engine that replays
//! the outbox once connectivity returns, and a network cache layer that
//! serves intercepted requests with per-resource-class strategies.
//!
//! # Module Structure
//!
//! - **`store`** - the versioned SQLite store: mirrored stories, the
//!   outbox queue, and the binary-asset cache
//! - **`api`** - reqwest client for the remote story REST API
//! - **`stories`** - the high-level read/write facade the UI layer calls
//! - **`sync`** - the reconciliation engine and the connectivity-driven
//!   scheduler with its in-flight guard
//! - **`cache`** - request classification, the four caching strategies,
//!   and the partitioned response cache with eviction
//! - **`model`** - record types, temporary identifiers, data-URL photos
//! - **`error`** - the shared error taxonomy
//! - **`config`** - API endpoint, auth token, and storage paths
//!
//! # Usage
//!
//! ```rust,no_run
//! use cerita::config::Config;
//! use cerita::api::StoryApi;
//! use cerita::store::StoryStore;
//! use cerita::stories::StoryService;
//! use cerita::sync::{ConnectivitySignal, SyncEngine};
//! use std::sync::Arc;
//!
//! # async fn example() -> cerita::error::Result<()> {
//! let config = Config::builder().auth_token("token").build()?;
//! let store = Arc::new(StoryStore::open(config.data_dir.join("local.db")).await?);
//! let api = StoryApi::new(config.clone());
//!
//! let service = StoryService::new(Arc::clone(&store), api.clone());
//! let connectivity = ConnectivitySignal::new(true);
//! let engine = SyncEngine::new(store, api, connectivity.clone());
//! let (_scheduler, _task) = cerita::sync::scheduler::start(engine, &connectivity);
//!
//! let stories = service.fetch_all_stories().await?;
//! # let _ = stories;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod store;
pub mod stories;
pub mod sync;

pub use config::Config;
pub use error::{CeritaError, Result};
pub use model::{NewStory, OutboxEntry, Story};
pub use store::StoryStore;
pub use stories::StoryService;
