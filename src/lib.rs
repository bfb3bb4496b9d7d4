//! # Todo Vault
//!
//! A file-backed todo store with serialized mutations and derived-view queries.
//!
//! ## Core Concepts
//!
//! - **Todos**: Records with store-assigned, monotonically increasing ids
//! - **Repository**: Whole-collection load and atomic replace of one JSON file
//! - **Queries**: Pure views (open, top-N, per-owner counts, overdue) over a snapshot
//! - **Mutations**: Create, update and delete serialized through one write lock
//!
//! ## Example
//!
//! ```ignore
//! use todo_vault::{StoreConfig, TodoInput, TodoStore};
//!
//! let store = TodoStore::open(StoreConfig {
//!     path: "./Data/todos.json".into(),
//!     ..Default::default()
//! })?;
//!
//! let todo = store.create(TodoInput::new("Write report", 4, "amy", "work"))?;
//! assert_eq!(todo.location(), format!("/api/todos/{}", todo.id));
//!
//! for todo in store.open_sorted()? {
//!     println!("[{}] {}", todo.priority, todo.title);
//! }
//! ```

pub mod cancel;
pub mod error;
pub mod query;
pub mod records;
pub mod store;
pub mod subscriptions;
pub mod types;
pub mod validation;

// Re-exports
pub use cancel::CancelToken;
pub use error::{ErrorKind, Result, StoreError};
pub use query::DEFAULT_TOP_COUNT;
pub use records::{InMemoryRepository, JsonFileRepository, Repository};
pub use store::{StoreConfig, TodoStore};
pub use subscriptions::{
    DropReason, StoreEvent, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle,
    SubscriptionId, SubscriptionManager,
};
pub use types::*;
