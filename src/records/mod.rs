//! Whole-collection persistence.
//!
//! A repository loads and replaces the full todo collection as one value.
//! There is no per-record access at this layer.

mod file;
mod memory;

pub use file::{decode, encode, JsonFileRepository};
pub use memory::InMemoryRepository;

use crate::error::Result;
use crate::types::Todo;

/// Storage backend for the todo collection.
pub trait Repository: Send + Sync {
    /// Read the full collection.
    fn load_all(&self) -> Result<Vec<Todo>>;

    /// Replace the full collection. A failed save leaves the previous
    /// collection authoritative.
    fn save_all(&self, todos: &[Todo]) -> Result<()>;
}
