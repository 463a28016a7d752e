//! Real-time product list fan-out.
//!
//! The notifier owns the registry of connected subscribers. Each subscriber
//! gets an unbounded channel; a broadcast clones the snapshot into every
//! channel and forgets about it. There is no acknowledgment and no replay: a
//! subscriber only sees events sent while it is registered.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::product::Product;

/// Wire name of the product list event.
pub const PRODUCTS_EVENT: &str = "productos";
/// Wire name of the client-initiated product creation event.
pub const ADD_PRODUCT_EVENT: &str = "agregarProducto";
/// Wire name of the client-initiated product removal event.
pub const REMOVE_PRODUCT_EVENT: &str = "eliminarProducto";
/// Wire name of the per-subscriber error event.
pub const ERROR_EVENT: &str = "error";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum NotifierEvent {
    #[serde(rename = "productos")]
    Products(Vec<Product>),
    #[serde(rename = "error")]
    Error { error: String },
}

/// Handle returned to a newly registered subscriber.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    pub receiver: mpsc::UnboundedReceiver<NotifierEvent>,
}

type Registry = HashMap<SubscriberId, mpsc::UnboundedSender<NotifierEvent>>;

#[derive(Default)]
pub struct Notifier {
    next_id: AtomicU64,
    subscribers: Mutex<Registry>,
}

impl fmt::Debug for Notifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notifier").field("subscribers", &self.subscriber_count()).finish()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.registry().insert(id, sender);
        debug!(
            event_name = "notifier.subscriber.added",
            subscriber_id = %id,
            "subscriber registered"
        );
        Subscription { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.registry().remove(&id).is_some();
        if removed {
            debug!(
                event_name = "notifier.subscriber.removed",
                subscriber_id = %id,
                "subscriber unregistered"
            );
        }
        removed
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }

    /// Pushes `products` to every registered subscriber and returns how many
    /// received it. Subscribers whose receiving side is gone are pruned.
    pub fn broadcast(&self, products: Vec<Product>) -> usize {
        let event = NotifierEvent::Products(products);
        let mut registry = self.registry();
        let mut closed = Vec::new();
        let mut delivered = 0;

        for (id, sender) in registry.iter() {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }
        for id in closed {
            registry.remove(&id);
        }

        debug!(event_name = "notifier.broadcast", delivered, "product list broadcast");
        delivered
    }

    /// Sends an event to a single subscriber. Returns `false` when the
    /// subscriber is unknown or disconnected.
    pub fn send_to(&self, id: SubscriberId, event: NotifierEvent) -> bool {
        let mut registry = self.registry();
        let Some(sender) = registry.get(&id) else {
            return false;
        };
        if sender.send(event).is_ok() {
            true
        } else {
            registry.remove(&id);
            false
        }
    }

    /// Queues the initial product list for a new subscriber, but only while
    /// nothing else is queued for it. Returns `false` when a broadcast got
    /// there first; the caller should drain it and read a fresher list.
    pub fn send_initial(&self, subscription: &Subscription, products: Vec<Product>) -> bool {
        let registry = self.registry();
        if !subscription.receiver.is_empty() {
            return false;
        }
        if let Some(sender) = registry.get(&subscription.id) {
            let _ = sender.send(NotifierEvent::Products(products));
        }
        true
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
