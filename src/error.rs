use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskError {
    /// A task field violates a record invariant.
    #[error("invalid task: {0}")]
    Validation(String),

    #[error("no task at index {index} (list has {len})")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("unknown sort key {0:?} (expected priority, due_date or creation_date)")]
    UnknownSortKey(String),

    #[error("task file {}: {message}", .path.display())]
    Storage { path: PathBuf, message: String },
}
