//! Topic-keyed in-process message bus.
//!
//! Adapters publish unified messages under their venue topic; consumers
//! subscribe with a bounded queue of their own choosing. Publishing never
//! blocks: a full subscriber queue drops the message for that subscriber
//! only, other subscribers are unaffected. Per topic per subscriber,
//! delivery order of non-dropped messages is FIFO.
//!
//! Create one instance in the control plane and share it by `Arc`.

use marketd_core::UnifiedMessage;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, warn};

struct Slot {
    id: u64,
    tx: mpsc::Sender<UnifiedMessage>,
}

/// Consumer end of a bus subscription.
///
/// Dropping the receiver without calling [`MessageBus::unsubscribe`] leaves
/// a dead sender in the topic table until the next publish notices the
/// closed channel; prefer explicit unsubscribe on shutdown.
pub struct BusSubscription {
    pub topic: String,
    id: u64,
    rx: mpsc::Receiver<UnifiedMessage>,
}

impl BusSubscription {
    /// Receive the next message, or `None` once unsubscribed.
    pub async fn recv(&mut self) -> Option<UnifiedMessage> {
        self.rx.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<UnifiedMessage> {
        self.rx.try_recv().ok()
    }
}

/// In-process pub/sub bus.
pub struct MessageBus {
    topics: RwLock<HashMap<String, Vec<Slot>>>,
    next_id: AtomicU64,
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new FIFO queue of `capacity` for `topic`.
    pub fn subscribe(&self, topic: &str, capacity: usize) -> BusSubscription {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut topics = self.topics.write();
        let slots = topics.entry(topic.to_string()).or_default();
        slots.push(Slot { id, tx });
        debug!(topic, subscribers = slots.len(), "bus subscribe");

        BusSubscription {
            topic: topic.to_string(),
            id,
            rx,
        }
    }

    /// Deliver `msg` to every subscriber of `topic`, dropping per-subscriber
    /// on full queues.
    pub fn publish(&self, topic: &str, msg: UnifiedMessage) {
        let topics = self.topics.read();
        let Some(slots) = topics.get(topic) else {
            debug!(topic, "bus publish with no subscribers");
            return;
        };

        for slot in slots {
            match slot.tx.try_send(msg.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(topic, subscriber = slot.id, "subscriber queue full, dropping message");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(topic, subscriber = slot.id, "subscriber gone");
                }
            }
        }
    }

    /// Remove a subscription and close its queue.
    pub fn unsubscribe(&self, sub: &BusSubscription) {
        let mut topics = self.topics.write();
        if let Some(slots) = topics.get_mut(&sub.topic) {
            slots.retain(|s| s.id != sub.id);
            debug!(topic = %sub.topic, remaining = slots.len(), "bus unsubscribe");
            if slots.is_empty() {
                topics.remove(&sub.topic);
            }
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.read().get(topic).map_or(0, Vec::len)
    }

    pub fn total_subscribers(&self) -> usize {
        self.topics.read().values().map(Vec::len).sum()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}
