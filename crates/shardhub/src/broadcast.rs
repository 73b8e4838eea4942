//! Presence-event fan-out.
//!
//! Every subscriber gets its own bounded queue. Publishing never waits:
//! an event that doesn't fit in a subscriber's queue is dropped for that
//! subscriber only, and subscribers whose receiving end is gone are pruned
//! on the next publish.

use std::collections::HashMap;
use std::fmt;

use shardhub_protocol::PresenceEvent;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Identifies one subscriber for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// The receiving end of a subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<PresenceEvent>,
}

impl Subscription {
    /// This subscriber's id.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next event. `None` once the broadcaster is gone.
    pub async fn recv(&mut self) -> Option<PresenceEvent> {
        self.receiver.recv().await
    }

    /// Takes the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<PresenceEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Fans presence events out to every live subscriber.
#[derive(Debug)]
pub struct Broadcaster {
    subscribers: HashMap<SubscriberId, mpsc::Sender<PresenceEvent>>,
    next_id: u64,
    queue_size: usize,
}

impl Broadcaster {
    /// Creates a broadcaster whose subscribers each buffer up to
    /// `queue_size` events.
    pub fn new(queue_size: usize) -> Self {
        Self {
            subscribers: HashMap::new(),
            next_id: 1,
            queue_size: queue_size.max(1),
        }
    }

    /// Adds a subscriber. It sees every event published from now on.
    pub fn subscribe(&mut self) -> Subscription {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;

        let (sender, receiver) = mpsc::channel(self.queue_size);
        self.subscribers.insert(id, sender);
        tracing::debug!(subscriber = %id, "subscriber added");

        Subscription { id, receiver }
    }

    /// Delivers `event` to every subscriber. Returns how many received it.
    pub fn publish(&mut self, event: PresenceEvent) -> usize {
        let mut delivered = 0;
        self.subscribers.retain(|id, sender| {
            match sender.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscriber = %id,
                        "subscriber queue full, event dropped"
                    );
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber = %id, "subscriber removed");
                    false
                }
            }
        });
        delivered
    }

    /// Number of subscribers still registered.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
