//! Task domain model.
//!
//! # Responsibility
//! - Define the task record and its editable field set.
//! - Derive board-bound status slugs.
//!
//! # Invariants
//! - `status` equals `status_slug(title of containing board)`.
//! - `id` is preserved when a task moves between boards.

use crate::model::id::EntityId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Task urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Stable wire/database string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Editable task fields, as submitted by the task form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TaskFields {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// Epoch milliseconds.
    pub due_date: Option<i64>,
    pub assignee: Option<String>,
}

impl TaskFields {
    /// Shorthand for a titled task with default priority and no extras.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }
}

/// One unit of planned work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// Derived from the containing board title; never edited directly.
    pub status: String,
    /// Epoch milliseconds.
    pub due_date: Option<i64>,
    pub assignee: Option<String>,
    /// Epoch milliseconds.
    pub created_at: i64,
}

impl Task {
    /// Builds a task with a fresh temporary id for the given board status.
    pub fn new_local(fields: TaskFields, status: String) -> Self {
        Self {
            id: EntityId::temporary(),
            title: fields.title,
            description: fields.description,
            priority: fields.priority,
            status,
            due_date: fields.due_date,
            assignee: normalize_assignee(fields.assignee),
            created_at: now_epoch_ms(),
        }
    }

    /// Replaces editable fields in place. Identity, status and creation
    /// time are untouched.
    pub fn apply_fields(&mut self, fields: TaskFields) {
        self.title = fields.title;
        self.description = fields.description;
        self.priority = fields.priority;
        self.due_date = fields.due_date;
        self.assignee = normalize_assignee(fields.assignee);
    }
}

/// Derives the task status for a board title.
///
/// Lower-cases the title and replaces whitespace runs with `-`:
/// `"To Do"` becomes `"to-do"`.
pub fn status_slug(board_title: &str) -> String {
    WHITESPACE_RE
        .replace_all(board_title.trim(), "-")
        .to_lowercase()
}

fn normalize_assignee(value: Option<String>) -> Option<String> {
    value
        .map(|raw| raw.trim().to_string())
        .filter(|trimmed| !trimmed.is_empty())
}

pub(crate) fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{status_slug, Priority, Task, TaskFields};

    #[test]
    fn status_slug_lowercases_and_hyphenates() {
        assert_eq!(status_slug("To Do"), "to-do");
        assert_eq!(status_slug("Done"), "done");
        assert_eq!(status_slug("  In   Review "), "in-review");
    }

    #[test]
    fn priority_parse_is_case_insensitive() {
        assert_eq!(Priority::parse("HIGH"), Some(Priority::High));
        assert_eq!(Priority::parse(" low "), Some(Priority::Low));
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn apply_fields_keeps_identity_and_status() {
        let mut task = Task::new_local(TaskFields::titled("Draft"), "to-do".to_string());
        let id = task.id.clone();
        let created_at = task.created_at;

        task.apply_fields(TaskFields {
            title: "Final".to_string(),
            priority: Priority::High,
            assignee: Some("  ".to_string()),
            ..TaskFields::default()
        });

        assert_eq!(task.id, id);
        assert_eq!(task.status, "to-do");
        assert_eq!(task.created_at, created_at);
        assert_eq!(task.title, "Final");
        assert_eq!(task.priority, Priority::High);
        assert_eq!(task.assignee, None);
    }
}
