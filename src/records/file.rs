//! JSON file repository.
//!
//! The whole collection lives in one pretty-printed JSON array. Every save
//! rewrites a sibling temp file, syncs it and renames it over the target, so
//! readers only ever see the old or the new collection.

use super::Repository;
use crate::error::{Result, StoreError};
use crate::types::Todo;
use fs2::FileExt;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Persisted field names, in write order.
const FIELD_NAMES: [&str; 8] = [
    "id", "title", "isDone", "priority", "owner", "category", "dueDate", "notes",
];

/// Suffix for temp files; a counter keeps concurrent provisioners apart.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Repository backed by a single JSON file.
pub struct JsonFileRepository {
    /// Path to the JSON document.
    path: PathBuf,

    /// Whether a missing document may be provisioned as `[]`.
    create_if_missing: bool,

    /// Held for the repository's lifetime; no other opener may write this file.
    _lock_file: File,
}

impl JsonFileRepository {
    /// Open the repository, provisioning the directory and file when allowed.
    pub fn open(path: impl AsRef<Path>, create_if_missing: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                if !create_if_missing {
                    return Err(StoreError::NotInitialized);
                }
                fs::create_dir_all(parent)?;
            }
        }

        if !create_if_missing && !path.exists() {
            return Err(StoreError::NotInitialized);
        }

        let lock_file = Self::acquire_lock(&path)?;
        let repo = Self {
            path,
            create_if_missing,
            _lock_file: lock_file,
        };

        if !repo.path.exists() {
            repo.provision()?;
        }

        info!(path = ?repo.path, "Opened todo file");
        Ok(repo)
    }

    /// Path of the JSON document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write an empty collection unless something already exists at the path.
    ///
    /// Uses a hard link so a concurrent save is never clobbered.
    fn provision(&self) -> Result<()> {
        let tmp = temp_path(&self.path);
        write_synced(&tmp, &encode(&[])?)?;

        let linked = fs::hard_link(&tmp, &self.path);
        let _ = fs::remove_file(&tmp);
        match linked {
            Ok(()) => {
                info!(path = ?self.path, "Provisioned empty todo file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_path = sibling(path, "lock");
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;

        Ok(lock_file)
    }
}

impl Repository for JsonFileRepository {
    fn load_all(&self) -> Result<Vec<Todo>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if !self.create_if_missing {
                    return Err(StoreError::NotInitialized);
                }
                self.provision()?;
                fs::read(&self.path)?
            }
            Err(e) => return Err(e.into()),
        };

        let todos = decode(&bytes)?;
        debug!(path = ?self.path, count = todos.len(), "Loaded todos");
        Ok(todos)
    }

    fn save_all(&self, todos: &[Todo]) -> Result<()> {
        let encoded = encode(todos)?;
        let tmp = temp_path(&self.path);

        if let Err(e) = write_synced(&tmp, &encoded).and_then(|()| fs::rename(&tmp, &self.path)) {
            warn!(path = ?self.path, error = %e, "Failed to save todos");
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        debug!(path = ?self.path, count = todos.len(), "Saved todos");
        Ok(())
    }
}

/// Serialize the collection as pretty JSON with a trailing newline.
pub fn encode(todos: &[Todo]) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(todos)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse a persisted collection.
///
/// Object keys match field names case-insensitively; an object spelling the
/// same field twice is rejected. A `null` document is an empty collection.
/// Ids must be positive and unique.
pub fn decode(bytes: &[u8]) -> Result<Vec<Todo>> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| StoreError::InvalidFormat(format!("malformed JSON: {}", e)))?;

    let items = match document {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => {
            return Err(StoreError::InvalidFormat(format!(
                "expected an array of todos, found {}",
                json_kind(&other)
            )))
        }
    };

    let mut seen = HashSet::with_capacity(items.len());
    let mut todos = Vec::with_capacity(items.len());

    for (index, item) in items.into_iter().enumerate() {
        let todo: Todo = canonicalize_keys(item)
            .and_then(|item| serde_json::from_value(item).map_err(|e| e.to_string()))
            .map_err(|e| StoreError::InvalidFormat(format!("todo at index {}: {}", index, e)))?;

        if todo.id.0 <= 0 {
            return Err(StoreError::InvalidFormat(format!(
                "todo at index {} has non-positive id {}",
                index, todo.id
            )));
        }
        if !seen.insert(todo.id) {
            return Err(StoreError::InvalidFormat(format!(
                "duplicate id {} at index {}",
                todo.id, index
            )));
        }

        todos.push(todo);
    }

    Ok(todos)
}

/// Rewrite object keys to their canonical spelling.
fn canonicalize_keys(item: Value) -> std::result::Result<Value, String> {
    match item {
        Value::Object(fields) => {
            let mut canonical = Map::with_capacity(fields.len());
            for (key, value) in fields {
                let name = FIELD_NAMES
                    .iter()
                    .find(|name| name.eq_ignore_ascii_case(&key))
                    .map(|name| name.to_string())
                    .unwrap_or(key);
                if canonical.contains_key(&name) {
                    return Err(format!("field {:?} appears more than once", name));
                }
                canonical.insert(name, value);
            }
            Ok(Value::Object(canonical))
        }
        other => Ok(other),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// `<file>.<suffix>` next to `path`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn temp_path(path: &Path) -> PathBuf {
    let n = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    sibling(path, &format!("{}.{}.tmp", std::process::id(), n))
}
