//! # Synchronization Module
//!
//! Replays the pending-write outbox against the remote API once
//! connectivity returns.
//!
//! ## Key Components
//!
//! - `engine.rs` - `SyncEngine`: the ordered, idempotent replay algorithm
//! - `scheduler.rs` - `ConnectivitySignal` and `SyncScheduler`: decide when
//!   a run starts and guarantee at most one run is in flight

pub mod engine;
pub mod scheduler;

pub use engine::SyncEngine;
pub use scheduler::{ConnectivitySignal, SyncScheduler};
