//! Board domain model.

use crate::model::id::EntityId;
use crate::model::task::{status_slug, Task};

/// Named container of tasks (one kanban column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub tasks: Vec<Task>,
}

impl Board {
    /// Creates an unsaved board with a temporary id and no tasks.
    pub fn new_local(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: EntityId::temporary(),
            title: title.into(),
            description: description.into(),
            tasks: Vec::new(),
        }
    }

    /// Status slug every contained task must carry.
    pub fn status(&self) -> String {
        status_slug(&self.title)
    }

    pub fn contains_task(&self, task_id: &EntityId) -> bool {
        self.tasks.iter().any(|task| &task.id == task_id)
    }

    /// Re-derives status of every contained task from the current title.
    pub(crate) fn resync_statuses(&mut self) {
        let status = self.status();
        for task in &mut self.tasks {
            task.status.clone_from(&status);
        }
    }
}
