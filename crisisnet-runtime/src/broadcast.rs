//! Fan-out of live updates to subscribers
//!
//! Delivery is best-effort: a subscriber that has disconnected or cannot
//! keep up is dropped so that ingestion never blocks on a slow consumer.

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;
use uuid::Uuid;

use crisisnet_core::{LiveEvent, LiveSummary};

/// Per-subscriber channel depth
const SUBSCRIBER_BUFFER: usize = 32;

/// One pushed update: the event that just arrived plus the window summary
#[derive(Debug, Clone, Serialize)]
pub struct LiveUpdate {
    pub event: LiveEvent,
    pub summary: LiveSummary,
}

struct Subscriber {
    id: Uuid,
    tx: mpsc::Sender<LiveUpdate>,
}

/// Registry of live-update subscribers
#[derive(Default)]
pub struct Broadcaster {
    subscribers: Mutex<Vec<Subscriber>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber and return its id plus the receiving end
    pub fn subscribe(&self) -> (Uuid, mpsc::Receiver<LiveUpdate>) {
        self.subscribe_with_capacity(SUBSCRIBER_BUFFER)
    }

    pub fn subscribe_with_capacity(&self, capacity: usize) -> (Uuid, mpsc::Receiver<LiveUpdate>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = Uuid::new_v4();
        self.subscribers.lock().push(Subscriber { id, tx });
        debug!("subscriber {id} registered");
        (id, rx)
    }

    /// Remove a subscriber; returns whether it was present
    pub fn unsubscribe(&self, id: Uuid) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() < before
    }

    /// Push an update to every subscriber, dropping any that cannot take it.
    ///
    /// Returns the number of successful deliveries.
    pub fn publish(&self, update: &LiveUpdate) -> usize {
        let mut subscribers = self.subscribers.lock();
        let mut delivered = 0;
        subscribers.retain(|s| match s.tx.try_send(update.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(_) => {
                debug!("dropping subscriber {}", s.id);
                false
            }
        });
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
