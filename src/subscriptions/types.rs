//! Subscription types for committed todo changes.

use crate::types::Todo;
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before dropping subscriber.
    /// `None` uses the manager's default buffer.
    pub buffer_size: Option<usize>,

    /// Filter criteria.
    pub filter: SubscriptionFilter,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: None,
            filter: SubscriptionFilter::all(),
        }
    }
}

/// Filter criteria for subscriptions.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionFilter {
    /// Only todos owned by one of these (None = any owner).
    pub owners: Option<Vec<String>>,

    pub include_created: bool,

    pub include_updated: bool,

    pub include_deleted: bool,
}

impl SubscriptionFilter {
    /// Every change to every todo.
    pub fn all() -> Self {
        Self {
            owners: None,
            include_created: true,
            include_updated: true,
            include_deleted: true,
        }
    }

    /// Every change to todos owned by `owners`.
    pub fn owners(owners: Vec<String>) -> Self {
        Self {
            owners: Some(owners),
            ..Self::all()
        }
    }

    /// Creations only.
    pub fn created() -> Self {
        Self {
            include_created: true,
            ..Default::default()
        }
    }

    pub(crate) fn matches(&self, event: &StoreEvent) -> bool {
        let (wanted, todo) = match event {
            StoreEvent::Created { todo } => (self.include_created, todo),
            StoreEvent::Updated { todo } => (self.include_updated, todo),
            StoreEvent::Deleted { todo } => (self.include_deleted, todo),
            StoreEvent::Dropped { .. } => return true,
        };

        wanted
            && self
                .owners
                .as_ref()
                .map_or(true, |owners| owners.iter().any(|o| *o == todo.owner))
    }
}

/// Events emitted to subscribers, in commit order.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreEvent {
    /// A todo was created.
    Created { todo: Todo },

    /// A todo's fields were replaced.
    Updated { todo: Todo },

    /// A todo was removed; carries the last stored value.
    Deleted { todo: Todo },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to manage a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    /// Channel to receive events.
    pub receiver: crossbeam_channel::Receiver<StoreEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<StoreEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<StoreEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<StoreEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
