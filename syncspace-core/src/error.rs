use thiserror::Error;

/// Errors raised by the core sync primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    #[error("Empty message")]
    EmptyMessage,
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(e: serde_json::Error) -> Self {
        SyncError::Serialization(e.to_string())
    }
}
