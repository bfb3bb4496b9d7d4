//! Core types for the todo store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path prefix the boundary layer exposes todos under.
pub const RESOURCE_PREFIX: &str = "/api/todos";

/// Unique identifier for a todo (assigned by the store).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TodoId(pub i64);

impl TodoId {
    /// First id handed out by an empty store.
    pub const FIRST: TodoId = TodoId(1);

    /// The id after this one, or `None` once the id space is used up.
    pub fn next(self) -> Option<Self> {
        self.0.checked_add(1).map(TodoId)
    }
}

impl fmt::Debug for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TodoId({})", self.0)
    }
}

impl fmt::Display for TodoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TodoId {
    fn from(value: i64) -> Self {
        TodoId(value)
    }
}

/// A single todo in the store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// Unique identifier (assigned by store).
    pub id: TodoId,

    pub title: String,

    #[serde(default)]
    pub is_done: bool,

    /// Urgency in `1..=5`, higher first.
    pub priority: i32,

    pub owner: String,

    pub category: String,

    /// Deadline; `None` means no deadline.
    #[serde(default, with = "due_date")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub notes: Option<String>,
}

impl Todo {
    /// Resource reference a boundary layer returns for a freshly created todo.
    pub fn location(&self) -> String {
        format!("{}/{}", RESOURCE_PREFIX, self.id)
    }

    /// Replace every field except `id` with the (already validated) update.
    pub(crate) fn replace_fields(&mut self, update: TodoUpdate) {
        self.title = update.title.trim().to_string();
        self.is_done = update.is_done;
        self.priority = update.priority;
        self.owner = update.owner.trim().to_string();
        self.category = update.category.trim().to_string();
        self.due_date = update.due_date;
        self.notes = normalize_notes(update.notes);
    }
}

/// Input for creating a new todo (before id is assigned).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoInput {
    pub title: String,
    pub priority: i32,
    pub owner: String,
    pub category: String,
    #[serde(default, with = "due_date")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TodoInput {
    pub fn new(
        title: impl Into<String>,
        priority: i32,
        owner: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            priority,
            owner: owner.into(),
            category: category.into(),
            due_date: None,
            notes: None,
        }
    }

    /// Set a deadline.
    pub fn with_due_date(mut self, due: DateTime<Utc>) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Attach free-form notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Build the stored todo. New todos always start open.
    pub(crate) fn into_todo(self, id: TodoId) -> Todo {
        Todo {
            id,
            title: self.title.trim().to_string(),
            is_done: false,
            priority: self.priority,
            owner: self.owner.trim().to_string(),
            category: self.category.trim().to_string(),
            due_date: self.due_date,
            notes: normalize_notes(self.notes),
        }
    }
}

/// Full replacement of a todo's fields (everything except `id`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoUpdate {
    pub title: String,
    #[serde(default)]
    pub is_done: bool,
    pub priority: i32,
    pub owner: String,
    pub category: String,
    #[serde(default, with = "due_date")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<&Todo> for TodoUpdate {
    fn from(todo: &Todo) -> Self {
        Self {
            title: todo.title.clone(),
            is_done: todo.is_done,
            priority: todo.priority,
            owner: todo.owner.clone(),
            category: todo.category.clone(),
            due_date: todo.due_date,
            notes: todo.notes.clone(),
        }
    }
}

/// Trim notes; blank notes are stored as absent.
pub(crate) fn normalize_notes(notes: Option<String>) -> Option<String> {
    notes
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
}

/// Serde adapter for optional due dates.
///
/// Reads RFC 3339, offset-less `YYYY-MM-DDTHH:MM:SS[.f]` (taken as UTC) and
/// bare `YYYY-MM-DD` (midnight UTC). Writes RFC 3339 with a `Z` suffix.
pub mod due_date {
    use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(ts) => {
                serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) => parse(&raw).map(Some).map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }

    /// Parse a single due date string.
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        let raw = raw.trim();

        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Ok(naive.and_utc());
        }
        if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(midnight.and_utc());
            }
        }

        Err(format!("unrecognized due date: {:?}", raw))
    }
}
