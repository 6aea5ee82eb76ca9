//! # Connectivity Signal and Sync Scheduler
//!
//! `ConnectivitySignal` is a process-wide online/offline flag built on a
//! tokio watch channel. `SyncScheduler` observes it and triggers
//! reconciliation on each offline-to-online transition, plus once at
//! startup when the process begins online.
//!
//! An atomic in-flight guard keeps runs from overlapping: a trigger that
//! arrives while a run is executing is dropped, not queued, and the next
//! genuine online transition picks up whatever work remains. There is no
//! retry timer beyond the next transition.

use crate::sync::SyncEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Shared online/offline flag observed by the scheduler and the engine
#[derive(Debug, Clone)]
pub struct ConnectivitySignal {
    sender: Arc<watch::Sender<bool>>,
}

impl ConnectivitySignal {
    /// Create a signal with the given initial state
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Report a connectivity change
    pub fn set_online(&self, online: bool) {
        // send_replace never fails; the sender holds its own receiver slot.
        self.sender.send_replace(online);
    }

    /// Current state
    pub fn is_online(&self) -> bool {
        *self.sender.borrow()
    }

    /// Subscribe to transitions
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

impl Default for ConnectivitySignal {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Triggers reconciliation at most once concurrently
#[derive(Debug)]
pub struct SyncScheduler {
    engine: SyncEngine,
    in_flight: AtomicBool,
}

impl SyncScheduler {
    pub fn new(engine: SyncEngine) -> Self {
        Self {
            engine,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Attempt a reconciliation run
    ///
    /// Returns `false` without side effects when another run is already in
    /// flight. Engine failures are logged, never propagated: the queue
    /// stays durable and the next connectivity transition retries.
    pub async fn trigger(&self) -> bool {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sync already in progress, trigger dropped");
            return false;
        }

        let outcome = self.engine.reconcile().await;
        self.in_flight.store(false, Ordering::SeqCst);

        match outcome {
            Ok(true) => {
                info!("queued stories synced");
                true
            }
            Ok(false) => {
                debug!("nothing to sync");
                true
            }
            Err(e) => {
                error!(error = %e, "sync run aborted, entries remain queued");
                true
            }
        }
    }

    /// Watch the connectivity signal and trigger on each transition online
    ///
    /// Also fires once immediately when the process starts online, matching
    /// the initial-load-while-online behavior.
    pub fn spawn(self: Arc<Self>, signal: &ConnectivitySignal) -> JoinHandle<()> {
        let mut receiver = signal.subscribe();
        tokio::spawn(async move {
            let mut was_online = *receiver.borrow();
            if was_online {
                debug!("online at startup, triggering sync");
                self.trigger().await;
            }

            while receiver.changed().await.is_ok() {
                let online = *receiver.borrow_and_update();
                if online && !was_online {
                    debug!("transitioned online, triggering sync");
                    self.trigger().await;
                }
                was_online = online;
            }
        })
    }
}

/// Wire up the signal, engine, and scheduler in one call
///
/// Returns the scheduler handle (for manual triggers) and the background
/// watcher task.
pub fn start(engine: SyncEngine, signal: &ConnectivitySignal) -> (Arc<SyncScheduler>, JoinHandle<()>) {
    let scheduler = Arc::new(SyncScheduler::new(engine));
    let task = Arc::clone(&scheduler).spawn(signal);
    (scheduler, task)
}
