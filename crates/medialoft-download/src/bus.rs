//! Event bus scoped to one manager instance.
//!
//! # Delivery guarantees
//!
//! - Every published event is applied to the `StateTracker` before any
//!   observer sees it, so a subscriber reacting to `StateChanged` reads the
//!   new state from the manager.
//! - Each subscriber owns an unbounded channel: the scheduler never waits on
//!   a slow observer, and nothing is dropped while the subscription lives.
//! - Events arrive in publish order. All publishing happens on the scheduler
//!   task, so that order is the order of transitions.
//! - The external emitter port is fed from its own subscription on the
//!   blocking pool. A slow `emit` delays only later emitter deliveries.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use medialoft_core::{AssetEvent, AssetEventEmitterPort, AssetId};
use tokio::task::JoinHandle;

use crate::tracker::StateTracker;

/// Receiving end of a bus subscription.
pub struct EventSubscription {
    rx: mpsc::UnboundedReceiver<AssetEvent>,
}

impl EventSubscription {
    /// Wait for the next event. Returns `None` once the manager is gone.
    pub async fn recv(&mut self) -> Option<AssetEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already buffered.
    pub fn try_recv(&mut self) -> Option<AssetEvent> {
        self.rx.try_recv().ok()
    }

    /// Take every buffered event.
    pub fn drain(&mut self) -> Vec<AssetEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

/// Typed publish/subscribe hub feeding the tracker and observers.
pub struct EventBus {
    tracker: Arc<StateTracker>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<AssetEvent>>>,
}

impl EventBus {
    pub fn new(tracker: Arc<StateTracker>) -> Self {
        Self {
            tracker,
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn tracker(&self) -> &Arc<StateTracker> {
        &self.tracker
    }

    /// Register a new observer. It sees events published from now on.
    pub fn subscribe(&self) -> EventSubscription {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        EventSubscription { rx }
    }

    /// Hand every event published from now on to an external emitter.
    ///
    /// The emitter runs on the blocking pool. The returned task ends once the
    /// bus is dropped and the backlog is delivered.
    pub fn forward_to(&self, emitter: Arc<dyn AssetEventEmitterPort>) -> JoinHandle<()> {
        let mut subscription = self.subscribe();
        tokio::task::spawn_blocking(move || {
            while let Some(event) = subscription.rx.blocking_recv() {
                emitter.emit(event);
            }
        })
    }

    /// Apply an event to the tracker, then deliver it.
    pub fn publish(&self, event: AssetEvent) {
        self.tracker.apply(&event);

        {
            let mut subscribers = self
                .subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        }
    }

    /// Record a progress sample that is not relayed to observers.
    pub fn record_progress(&self, id: &AssetId, fraction: f64) {
        self.tracker.set_progress(id, fraction);
    }
}
