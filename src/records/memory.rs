//! In-memory repository.

use super::Repository;
use crate::error::Result;
use crate::types::Todo;
use parking_lot::RwLock;

/// Repository holding the collection in memory. Useful for tests and embedding.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    todos: RwLock<Vec<Todo>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing collection.
    pub fn with_todos(todos: Vec<Todo>) -> Self {
        Self {
            todos: RwLock::new(todos),
        }
    }
}

impl Repository for InMemoryRepository {
    fn load_all(&self) -> Result<Vec<Todo>> {
        Ok(self.todos.read().clone())
    }

    fn save_all(&self, todos: &[Todo]) -> Result<()> {
        *self.todos.write() = todos.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TodoId, TodoInput};

    #[test]
    fn test_save_replaces_collection() {
        let repo = InMemoryRepository::with_todos(vec![
            TodoInput::new("A", 1, "bob", "x").into_todo(TodoId(1)),
        ]);
        assert_eq!(repo.load_all().unwrap().len(), 1);

        repo.save_all(&[]).unwrap();
        assert!(repo.load_all().unwrap().is_empty());
    }
}
