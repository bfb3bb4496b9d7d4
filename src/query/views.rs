//! Filtering, ordering, grouping and truncation of todo snapshots.

use crate::types::Todo;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Number of todos `top_priority` returns when the caller gives no count.
pub const DEFAULT_TOP_COUNT: i64 = 5;

/// Priority descending, then due date ascending with no deadline last.
pub fn urgency_order(a: &Todo, b: &Todo) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| due_order(a.due_date, b.due_date))
}

fn due_order(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Open todos in urgency order.
pub fn open_sorted(items: &[Todo]) -> Vec<Todo> {
    let mut open: Vec<Todo> = items.iter().filter(|t| !t.is_done).cloned().collect();
    open.sort_by(urgency_order);
    open
}

/// The `n` most urgent todos, done or not. `n <= 0` yields nothing.
pub fn top_priority(items: &[Todo], n: i64) -> Vec<Todo> {
    let take = usize::try_from(n).unwrap_or(0);
    if take == 0 {
        return Vec::new();
    }

    let mut ordered = items.to_vec();
    ordered.sort_by(urgency_order);
    ordered.truncate(take);
    ordered
}

/// Number of todos per owner.
pub fn count_by_owner(items: &[Todo]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for todo in items {
        *counts.entry(todo.owner.clone()).or_insert(0) += 1;
    }
    counts
}

/// Open todos whose deadline is strictly before `now`, earliest first.
pub fn overdue(items: &[Todo], now: DateTime<Utc>) -> Vec<Todo> {
    let mut late: Vec<Todo> = items
        .iter()
        .filter(|t| !t.is_done && t.due_date.is_some_and(|due| due < now))
        .cloned()
        .collect();
    late.sort_by_key(|t| t.due_date);
    late
}
