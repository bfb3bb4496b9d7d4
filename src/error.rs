//! Error types for the todo store.

use crate::types::TodoId;
use thiserror::Error;

/// Main error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Todo not found: {0}")]
    NotFound(TodoId),

    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Store is locked by another process")]
    Locked,

    #[error("Store not initialized")]
    NotInitialized,

    #[error("No id left after {0}")]
    IdsExhausted(TodoId),

    #[error("Operation cancelled before acquiring the write lock")]
    Cancelled,
}

/// Coarse classification used by a boundary layer to pick a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller-supplied data broke a field rule.
    Validation,
    /// The addressed todo does not exist.
    NotFound,
    /// The caller withdrew the request while it was waiting.
    Cancelled,
    /// Storage is unreadable, unwritable or corrupt.
    Internal,
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::NotFound(_) => ErrorKind::NotFound,
            StoreError::Cancelled => ErrorKind::Cancelled,
            StoreError::Io(_)
            | StoreError::InvalidFormat(_)
            | StoreError::Serialization(_)
            | StoreError::Locked
            | StoreError::NotInitialized
            | StoreError::IdsExhausted(_) => ErrorKind::Internal,
        }
    }

    /// True when resubmitting the same request cannot succeed.
    pub fn is_caller_fault(&self) -> bool {
        matches!(self.kind(), ErrorKind::Validation | ErrorKind::NotFound)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            StoreError::Validation("title".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(StoreError::NotFound(TodoId(9)).kind(), ErrorKind::NotFound);
        assert_eq!(StoreError::Cancelled.kind(), ErrorKind::Cancelled);
        assert_eq!(
            StoreError::InvalidFormat("bad".into()).kind(),
            ErrorKind::Internal
        );
        assert_eq!(StoreError::Locked.kind(), ErrorKind::Internal);
        assert_eq!(
            StoreError::IdsExhausted(TodoId(i64::MAX)).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_caller_fault() {
        assert!(StoreError::NotFound(TodoId(1)).is_caller_fault());
        assert!(!StoreError::Io(std::io::Error::other("disk")).is_caller_fault());
    }

    #[test]
    fn test_not_found_message_names_id() {
        let err = StoreError::NotFound(TodoId(42));
        assert_eq!(err.to_string(), "Todo not found: 42");
    }
}
