use std::fmt;
use std::str::FromStr;

use time::Date;

use crate::domain::task::{Task, TaskPatch};
use crate::error::TaskError;

pub mod file;
pub mod memory;

/// The store's public operation surface. All indices are 0-based positions
/// in the current order; a delete shifts later positions down, so callers
/// must not cache indices across one.
pub trait TaskStore {
    fn list(&self) -> &[Task];
    fn add(&mut self, task: Task) -> Result<(), TaskError>;
    fn update(&mut self, index: usize, patch: TaskPatch) -> Result<Task, TaskError>;
    fn delete(&mut self, index: usize) -> Result<Task, TaskError>;
    fn mark_complete(&mut self, index: usize) -> Result<Task, TaskError>;
    fn sort(&mut self, by: SortKey) -> Result<(), TaskError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Priority,
    DueDate,
    CreationDate,
}

impl FromStr for SortKey {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "priority" => Ok(Self::Priority),
            "due_date" => Ok(Self::DueDate),
            "creation_date" => Ok(Self::CreationDate),
            other => Err(TaskError::UnknownSortKey(other.to_string())),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Priority => "priority",
            Self::DueDate => "due_date",
            Self::CreationDate => "creation_date",
        })
    }
}

// sort_by_key is stable, so ties keep their existing relative order.
pub(crate) fn sort_tasks(tasks: &mut [Task], by: SortKey) {
    match by {
        SortKey::Priority => tasks.sort_by_key(|t| t.priority),
        // Tasks without a due date sort after every dated task.
        SortKey::DueDate => tasks.sort_by_key(|t| t.due.unwrap_or(Date::MAX)),
        SortKey::CreationDate => tasks.sort_by_key(|t| t.created_at),
    }
}

pub(crate) fn check_index(index: usize, len: usize) -> Result<(), TaskError> {
    if index >= len {
        return Err(TaskError::IndexOutOfBounds { index, len });
    }
    Ok(())
}
