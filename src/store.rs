//! Main store tying persistence, queries and serialized mutations together.

use crate::cancel::CancelToken;
use crate::error::{Result, StoreError};
use crate::query;
use crate::records::{JsonFileRepository, Repository};
use crate::subscriptions::{
    SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager,
    DEFAULT_BUFFER_SIZE,
};
use crate::types::{Todo, TodoId, TodoInput, TodoUpdate};
use crate::validation;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Store configuration.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Path of the JSON document holding the collection.
    pub path: PathBuf,

    /// Whether to provision the file (and its directory) if it doesn't exist.
    pub create_if_missing: bool,

    /// How often a cancellable writer re-checks its token while waiting.
    pub lock_poll_interval: Duration,

    /// Events a subscriber may fall behind by when its own config leaves the
    /// buffer size unset.
    /// Default: 1000
    pub subscription_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("Data").join("sample-todos.json"),
            create_if_missing: true,
            lock_poll_interval: Duration::from_millis(10),
            subscription_buffer: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// The todo store.
///
/// Reads load a fresh snapshot and never block. Mutations run
/// validate, lock, load, mutate, save, unlock; at most one is in flight.
pub struct TodoStore<R: Repository = JsonFileRepository> {
    /// Store configuration.
    config: StoreConfig,

    /// Backing collection.
    repo: R,

    /// Serializes the load-mutate-save sequence of every mutation.
    write_lock: Mutex<()>,

    /// Change feed.
    subscriptions: SubscriptionManager,
}

impl TodoStore<JsonFileRepository> {
    /// Open the file-backed store described by `config`.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let repo = JsonFileRepository::open(&config.path, config.create_if_missing)?;
        Ok(Self::with_repository(repo, config))
    }

    /// Location of the backing JSON document.
    pub fn path(&self) -> &Path {
        self.repo.path()
    }
}

impl<R: Repository> TodoStore<R> {
    /// Build a store over any repository.
    pub fn with_repository(repo: R, config: StoreConfig) -> Self {
        let subscriptions = SubscriptionManager::with_buffer_size(config.subscription_buffer);
        Self {
            config,
            repo,
            write_lock: Mutex::new(()),
            subscriptions,
        }
    }

    /// The backing repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    // --- Reads ---

    /// Every todo, in stored order.
    pub fn get_all(&self) -> Result<Vec<Todo>> {
        self.repo.load_all()
    }

    /// Get a todo by ID.
    pub fn get_by_id(&self, id: TodoId) -> Result<Todo> {
        validation::check_id(id)?;
        self.repo
            .load_all()?
            .into_iter()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))
    }

    /// Open todos, most urgent first. See [`query::open_sorted`].
    pub fn open_sorted(&self) -> Result<Vec<Todo>> {
        Ok(query::open_sorted(&self.repo.load_all()?))
    }

    /// The `n` most urgent todos, done or not; empty when `n <= 0`.
    pub fn top_priority(&self, n: i64) -> Result<Vec<Todo>> {
        Ok(query::top_priority(&self.repo.load_all()?, n))
    }

    /// Number of todos per owner, done or not.
    pub fn count_by_owner(&self) -> Result<HashMap<String, usize>> {
        Ok(query::count_by_owner(&self.repo.load_all()?))
    }

    /// Open todos due strictly before `now`, earliest deadline first.
    pub fn overdue(&self, now: DateTime<Utc>) -> Result<Vec<Todo>> {
        Ok(query::overdue(&self.repo.load_all()?, now))
    }

    /// Overdue todos as of the current time.
    pub fn overdue_now(&self) -> Result<Vec<Todo>> {
        self.overdue(Utc::now())
    }

    // --- Mutations ---

    /// Create a todo; the store assigns the next id.
    pub fn create(&self, input: TodoInput) -> Result<Todo> {
        self.create_internal(input, None)
    }

    /// Like [`create`](Self::create), abandoning the wait if `cancel` fires first.
    pub fn create_cancellable(&self, input: TodoInput, cancel: &CancelToken) -> Result<Todo> {
        self.create_internal(input, Some(cancel))
    }

    /// Replace every field of the todo with `id` except the id itself.
    pub fn update(&self, id: TodoId, update: TodoUpdate) -> Result<Todo> {
        self.update_internal(id, update, None)
    }

    /// Like [`update`](Self::update), abandoning the wait if `cancel` fires first.
    pub fn update_cancellable(
        &self,
        id: TodoId,
        update: TodoUpdate,
        cancel: &CancelToken,
    ) -> Result<Todo> {
        self.update_internal(id, update, Some(cancel))
    }

    /// Remove the todo with `id`, returning its last stored value.
    pub fn delete(&self, id: TodoId) -> Result<Todo> {
        self.delete_internal(id, None)
    }

    /// Like [`delete`](Self::delete), abandoning the wait if `cancel` fires first.
    pub fn delete_cancellable(&self, id: TodoId, cancel: &CancelToken) -> Result<Todo> {
        self.delete_internal(id, Some(cancel))
    }

    fn create_internal(&self, input: TodoInput, cancel: Option<&CancelToken>) -> Result<Todo> {
        validation::validate_input(&input)?;

        let _lock = self.lock_writes(cancel)?;

        let mut todos = self.repo.load_all()?;
        let todo = input.into_todo(next_id(&todos)?);
        todos.push(todo.clone());
        self.repo.save_all(&todos)?;

        debug!(id = %todo.id, "Created todo");
        self.subscriptions.broadcast_created(&todo);
        Ok(todo)
    }

    fn update_internal(
        &self,
        id: TodoId,
        update: TodoUpdate,
        cancel: Option<&CancelToken>,
    ) -> Result<Todo> {
        validation::validate_update(id, &update)?;

        let _lock = self.lock_writes(cancel)?;

        let mut todos = self.repo.load_all()?;
        let todo = todos
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        todo.replace_fields(update);
        let updated = todo.clone();
        self.repo.save_all(&todos)?;

        debug!(id = %id, "Updated todo");
        self.subscriptions.broadcast_updated(&updated);
        Ok(updated)
    }

    fn delete_internal(&self, id: TodoId, cancel: Option<&CancelToken>) -> Result<Todo> {
        validation::check_id(id)?;

        let _lock = self.lock_writes(cancel)?;

        let mut todos = self.repo.load_all()?;
        let position = todos
            .iter()
            .position(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        let removed = todos.remove(position);
        self.repo.save_all(&todos)?;

        debug!(id = %id, "Deleted todo");
        self.subscriptions.broadcast_deleted(&removed);
        Ok(removed)
    }

    /// Enter the write section. The guard releases it on every exit path.
    fn lock_writes(&self, cancel: Option<&CancelToken>) -> Result<MutexGuard<'_, ()>> {
        let Some(token) = cancel else {
            return Ok(self.write_lock.lock());
        };

        loop {
            if token.is_cancelled() {
                warn!("Writer cancelled while waiting for the write lock");
                return Err(StoreError::Cancelled);
            }
            if let Some(guard) = self.write_lock.try_lock_for(self.config.lock_poll_interval) {
                return Ok(guard);
            }
        }
    }

    // --- Subscriptions ---

    /// Receive changes committed from now on.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.subscriptions.subscribe(config)
    }

    /// Stop delivering to `id`; its handle receives a final `Dropped` event.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id)
    }
}

/// One past the highest id present, or 1 for an empty collection.
fn next_id(todos: &[Todo]) -> Result<TodoId> {
    match todos.iter().map(|t| t.id).max() {
        None => Ok(TodoId::FIRST),
        Some(max) => max.next().ok_or(StoreError::IdsExhausted(max)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::InMemoryRepository;
    use crate::subscriptions::StoreEvent;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> StoreConfig {
        StoreConfig {
            path: dir.path().join("Data").join("todos.json"),
            ..Default::default()
        }
    }

    fn memory_store() -> TodoStore<InMemoryRepository> {
        TodoStore::with_repository(InMemoryRepository::new(), StoreConfig::default())
    }

    fn edit(todo: &Todo) -> TodoUpdate {
        TodoUpdate::from(todo)
    }

    #[test]
    fn test_next_id() {
        assert_eq!(next_id(&[]).unwrap(), TodoId(1));

        let todos = vec![
            TodoInput::new("A", 1, "bob", "x").into_todo(TodoId(4)),
            TodoInput::new("B", 1, "bob", "x").into_todo(TodoId(2)),
        ];
        assert_eq!(next_id(&todos).unwrap(), TodoId(5));
    }

    #[test]
    fn test_create_after_max_id_fails_without_writing() {
        let top = TodoInput::new("A", 1, "bob", "x").into_todo(TodoId(i64::MAX));
        let store = TodoStore::with_repository(
            InMemoryRepository::with_todos(vec![top.clone()]),
            StoreConfig::default(),
        );
        let handle = store.subscribe(SubscriptionConfig::default());

        let result = store.create(TodoInput::new("B", 3, "bob", "x"));
        assert!(matches!(
            result,
            Err(StoreError::IdsExhausted(TodoId(i64::MAX)))
        ));
        assert_eq!(store.get_all().unwrap(), vec![top]);
        assert!(handle.try_recv().is_err());

        // The write section was released.
        store.delete(TodoId(i64::MAX)).unwrap();
        assert_eq!(
            store.create(TodoInput::new("C", 3, "bob", "x")).unwrap().id,
            TodoId(1)
        );
    }

    #[test]
    fn test_open_creates_file() {
        let dir = TempDir::new().unwrap();
        let store = TodoStore::open(test_config(&dir)).unwrap();

        assert!(store.path().exists());
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let store = memory_store();

        let a = store.create(TodoInput::new("A", 3, "bob", "x")).unwrap();
        let b = store.create(TodoInput::new("B", 5, "amy", "y")).unwrap();

        assert_eq!(a.id, TodoId(1));
        assert!(!a.is_done);
        assert_eq!(b.id, TodoId(2));
        assert_eq!(store.get_all().unwrap(), vec![a, b]);
    }

    #[test]
    fn test_ids_not_reused_below_max() {
        let store = memory_store();
        for title in ["A", "B", "C"] {
            store.create(TodoInput::new(title, 1, "bob", "x")).unwrap();
        }
        store.delete(TodoId(2)).unwrap();

        let d = store.create(TodoInput::new("D", 1, "bob", "x")).unwrap();
        assert_eq!(d.id, TodoId(4));
    }

    #[test]
    fn test_get_by_id() {
        let store = memory_store();
        let a = store.create(TodoInput::new("A", 3, "bob", "x")).unwrap();

        assert_eq!(store.get_by_id(a.id).unwrap(), a);
        assert!(matches!(
            store.get_by_id(TodoId(99)),
            Err(StoreError::NotFound(TodoId(99)))
        ));
        assert!(matches!(
            store.get_by_id(TodoId(-1)),
            Err(StoreError::Validation(_))
        ));
    }

    #[test]
    fn test_update_replaces_fields() {
        let store = memory_store();
        let a = store
            .create(TodoInput::new("A", 3, "bob", "x").with_notes("old"))
            .unwrap();

        let mut change = edit(&a);
        change.title = " A2 ".into();
        change.is_done = true;
        change.notes = Some("  ".into());
        let updated = store.update(a.id, change).unwrap();

        assert_eq!(updated.id, a.id);
        assert_eq!(updated.title, "A2");
        assert!(updated.is_done);
        assert_eq!(updated.notes, None);
        assert_eq!(store.get_by_id(a.id).unwrap(), updated);
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = memory_store();
        let a = store.create(TodoInput::new("A", 3, "bob", "x")).unwrap();

        let result = store.update(TodoId(7), edit(&a));
        assert!(matches!(result, Err(StoreError::NotFound(TodoId(7)))));
    }

    #[test]
    fn test_delete() {
        let store = memory_store();
        let a = store.create(TodoInput::new("A", 3, "bob", "x")).unwrap();
        let b = store.create(TodoInput::new("B", 3, "bob", "x")).unwrap();

        let removed = store.delete(a.id).unwrap();
        assert_eq!(removed, a);
        assert_eq!(store.get_all().unwrap(), vec![b]);
    }

    #[test]
    fn test_validation_runs_before_lock() {
        let store = memory_store();
        let _held = store.write_lock.lock();

        // Would block forever if validation took the lock first.
        let result = store.create(TodoInput::new("", 3, "bob", "x"));
        assert!(matches!(result, Err(StoreError::Validation(_))));
        let result = store.delete(TodoId(-2));
        assert!(matches!(result, Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_cancelled_waiter_gives_up() {
        let store = memory_store();
        let token = CancelToken::new();
        token.cancel();

        let held = store.write_lock.lock();
        let result = store.create_cancellable(TodoInput::new("A", 3, "bob", "x"), &token);
        drop(held);

        assert!(matches!(result, Err(StoreError::Cancelled)));
        assert!(store.get_all().unwrap().is_empty());
    }

    #[test]
    fn test_uncancelled_token_proceeds() {
        let store = memory_store();
        let token = CancelToken::new();

        let a = store
            .create_cancellable(TodoInput::new("A", 3, "bob", "x"), &token)
            .unwrap();
        let removed = store.delete_cancellable(a.id, &token).unwrap();
        assert_eq!(removed.id, a.id);
    }

    #[test]
    fn test_events_follow_commits() {
        let store = memory_store();
        let handle = store.subscribe(SubscriptionConfig::default());

        let a = store.create(TodoInput::new("A", 3, "bob", "x")).unwrap();
        store.update(a.id, edit(&a)).unwrap();
        store.delete(a.id).unwrap();
        let _ = store.delete(a.id);

        assert!(matches!(handle.try_recv(), Ok(StoreEvent::Created { .. })));
        assert!(matches!(handle.try_recv(), Ok(StoreEvent::Updated { .. })));
        assert!(matches!(handle.try_recv(), Ok(StoreEvent::Deleted { .. })));
        assert!(handle.try_recv().is_err());
    }

    #[test]
    fn test_configured_subscription_buffer() {
        let store = TodoStore::with_repository(
            InMemoryRepository::new(),
            StoreConfig {
                subscription_buffer: 2,
                ..Default::default()
            },
        );
        let slow = store.subscribe(SubscriptionConfig::default());
        assert_eq!(slow.receiver.capacity(), Some(2));

        for title in ["A", "B", "C"] {
            store.create(TodoInput::new(title, 3, "bob", "x")).unwrap();
        }

        assert!(matches!(slow.try_recv(), Ok(StoreEvent::Created { .. })));
        assert!(matches!(slow.try_recv(), Ok(StoreEvent::Created { .. })));
        assert!(slow.try_recv().is_err());
        assert_eq!(StoreConfig::default().subscription_buffer, 1000);
    }

    #[test]
    fn test_query_wrappers() {
        let store = memory_store();
        store.create(TodoInput::new("A", 3, "bob", "x")).unwrap();
        store.create(TodoInput::new("B", 5, "amy", "y")).unwrap();

        let titles: Vec<String> = store
            .open_sorted()
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["B", "A"]);
        assert_eq!(store.top_priority(1).unwrap()[0].title, "B");
        assert_eq!(store.count_by_owner().unwrap()["bob"], 1);
        assert!(store.overdue_now().unwrap().is_empty());
    }
}
