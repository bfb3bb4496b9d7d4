//! Subscription manager for broadcasting committed changes.

use crate::types::Todo;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use super::types::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};

/// Events a subscriber may fall behind by before it is dropped.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Internal subscription state.
struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<StoreEvent>,
}

impl Subscription {
    /// Try to send an event. Returns false if buffer is full (subscriber will be dropped).
    fn try_send(&self, event: StoreEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Manages subscriptions and broadcasts events.
pub struct SubscriptionManager {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
    /// Buffer size for subscriptions that don't pick their own.
    default_buffer: usize,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self::with_buffer_size(DEFAULT_BUFFER_SIZE)
    }

    /// Manager whose subscriptions buffer `default_buffer` events unless told otherwise.
    pub fn with_buffer_size(default_buffer: usize) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            default_buffer,
        }
    }

    /// Create a new subscription. Only changes committed afterwards are delivered.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let capacity = config.buffer_size.unwrap_or(self.default_buffer).max(1);
        let (sender, receiver) = bounded(capacity);

        self.subscriptions
            .write()
            .insert(id, Subscription { config, sender });

        SubscriptionHandle { id, receiver }
    }

    /// Unsubscribe and clean up.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subs = self.subscriptions.write();
        if let Some(sub) = subs.remove(&id) {
            let _ = sub.sender.try_send(StoreEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    // --- Broadcasting ---

    pub fn broadcast_created(&self, todo: &Todo) {
        self.broadcast(StoreEvent::Created { todo: todo.clone() });
    }

    pub fn broadcast_updated(&self, todo: &Todo) {
        self.broadcast(StoreEvent::Updated { todo: todo.clone() });
    }

    pub fn broadcast_deleted(&self, todo: &Todo) {
        self.broadcast(StoreEvent::Deleted { todo: todo.clone() });
    }

    /// Deliver to matching subscriptions. Drops subscribers that fail to receive.
    fn broadcast(&self, event: StoreEvent) {
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if sub.config.filter.matches(&event) && !sub.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if let Some(sub) = subs.remove(&id) {
                    warn!(subscription = id.0, "Dropping slow subscriber");
                    let _ = sub.sender.try_send(StoreEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}
