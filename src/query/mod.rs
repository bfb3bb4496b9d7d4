//! Derived views over an immutable snapshot of the collection.
//!
//! Every function here is pure: no I/O, no hidden state, and the same input
//! always yields the same output.

mod views;

pub use views::{
    count_by_owner, open_sorted, overdue, top_priority, urgency_order, DEFAULT_TOP_COUNT,
};
