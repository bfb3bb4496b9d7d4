//! Field-level acceptance rules, checked before any mutation touches storage.

use crate::error::{Result, StoreError};
use crate::types::{TodoId, TodoInput, TodoUpdate};
use std::ops::RangeInclusive;

/// Accepted priority values.
pub const PRIORITY_RANGE: RangeInclusive<i32> = 1..=5;

/// Reject empty or whitespace-only text.
pub fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StoreError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

pub fn check_priority(priority: i32) -> Result<()> {
    if !PRIORITY_RANGE.contains(&priority) {
        return Err(StoreError::Validation(format!(
            "priority must be between {} and {} (got {})",
            PRIORITY_RANGE.start(),
            PRIORITY_RANGE.end(),
            priority
        )));
    }
    Ok(())
}

/// Ids used for addressing must not be negative.
pub fn check_id(id: TodoId) -> Result<()> {
    if id.0 < 0 {
        return Err(StoreError::Validation(format!(
            "id must not be negative (got {})",
            id
        )));
    }
    Ok(())
}

fn check_fields(title: &str, priority: i32, owner: &str, category: &str) -> Result<()> {
    require_text("title", title)?;
    check_priority(priority)?;
    require_text("owner", owner)?;
    require_text("category", category)
}

pub fn validate_input(input: &TodoInput) -> Result<()> {
    check_fields(&input.title, input.priority, &input.owner, &input.category)
}

pub fn validate_update(id: TodoId, update: &TodoUpdate) -> Result<()> {
    check_id(id)?;
    check_fields(&update.title, update.priority, &update.owner, &update.category)
}
