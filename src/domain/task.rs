use std::fmt;

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::TaskError;

/// Highest priority a task can carry; 0 is the lowest.
pub const MAX_PRIORITY: u8 = 5;

const DUE_DATE_FORMAT: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");

time::serde::format_description!(due_date_serde, Date, "[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: u8,
    #[serde(default, with = "due_date_serde::option", skip_serializing_if = "Option::is_none")]
    pub due: Option<Date>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub done: bool,
}

impl Task {
    pub fn new(
        title: impl Into<String>,
        description: Option<String>,
        priority: u8,
        due: Option<Date>,
    ) -> Result<Self, TaskError> {
        let title = title.into();
        validate_title(&title)?;
        validate_priority(priority)?;
        Ok(Self {
            title,
            description,
            priority,
            due,
            created_at: OffsetDateTime::now_utc(),
            done: false,
        })
    }

    /// Idempotent: completing an already complete task is a no-op.
    pub fn mark_complete(&mut self) {
        self.done = true;
    }

    pub fn status(&self) -> &'static str {
        if self.done { "Complete" } else { "Incomplete" }
    }

    /// Applies a partial update. All of the patch is validated before any
    /// field is written, so a rejected patch leaves the task untouched.
    pub fn apply(&mut self, patch: TaskPatch) -> Result<(), TaskError> {
        if let Some(title) = patch.title.as_deref() {
            validate_title(title)?;
        }
        if let Some(priority) = patch.priority {
            validate_priority(priority)?;
        }
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due) = patch.due {
            self.due = Some(due);
        }
        Ok(())
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.title, self.status())?;
        if let Some(description) = &self.description {
            writeln!(f, "    {description}")?;
        }
        writeln!(f, "    Priority: {}", self.priority)?;
        if let Some(due) = self.due {
            writeln!(f, "    Due: {due}")?;
        }
        write!(f, "    Created: {}", self.created_at.date())
    }
}

/// Partial update for a task; `None` leaves the field untouched.
/// A patch can never touch `created_at` or `done`.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<u8>,
    pub due: Option<Date>,
}

/// The one canonical due-date parser: `YYYY-MM-DD`.
pub fn parse_due_date(s: &str) -> Result<Date, TaskError> {
    Date::parse(s.trim(), DUE_DATE_FORMAT)
        .map_err(|_| TaskError::Validation(format!("invalid due date {s:?}, expected YYYY-MM-DD")))
}

fn validate_title(title: &str) -> Result<(), TaskError> {
    if title.trim().is_empty() {
        return Err(TaskError::Validation("title must not be empty".into()));
    }
    Ok(())
}

fn validate_priority(priority: u8) -> Result<(), TaskError> {
    if priority > MAX_PRIORITY {
        return Err(TaskError::Validation(format!(
            "priority {priority} is out of range (0-{MAX_PRIORITY})"
        )));
    }
    Ok(())
}
