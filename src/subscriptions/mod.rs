//! Subscription system for committed todo changes.
//!
//! Subscribers receive `Created`, `Updated` and `Deleted` events in the
//! order the writes were persisted. Buffers are bounded; a subscriber that
//! falls behind is dropped rather than stalling writers.
//!
//! # Example
//!
//! ```ignore
//! let handle = store.subscribe(SubscriptionConfig {
//!     filter: SubscriptionFilter::owners(vec!["amy".to_string()]),
//!     ..Default::default()
//! });
//!
//! loop {
//!     match handle.recv() {
//!         Ok(StoreEvent::Created { todo }) => println!("new: {}", todo.title),
//!         Ok(StoreEvent::Dropped { .. }) | Err(_) => break,
//!         Ok(_) => {}
//!     }
//! }
//! ```

mod manager;
mod types;

pub use manager::{SubscriptionManager, DEFAULT_BUFFER_SIZE};
pub use types::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId,
};
