//! Document shapes exchanged with the planning store.
//!
//! `BoardPayload`/`TaskPayload` travel to the store on bulk save;
//! `BoardDocument`/`TaskDocument` come back from board queries. Document ids
//! may arrive as strings or numbers and are normalized to strings.

use crate::model::board::Board;
use crate::model::id::EntityId;
use crate::model::task::{Priority, Task};
use serde::{Deserialize, Serialize};
use serde_json::Number;

/// One task inside a bulk-save request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskPayload {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub status: String,
    pub due_date: Option<i64>,
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

impl From<&Task> for TaskPayload {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            title: task.title.clone(),
            description: task.description.clone(),
            priority: task.priority,
            status: task.status.clone(),
            due_date: task.due_date,
            assignee: task.assignee.clone(),
            created_at: Some(task.created_at),
        }
    }
}

/// One board (with nested tasks) inside a bulk-save request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardPayload {
    pub id: EntityId,
    pub title: String,
    pub description: String,
    pub tasks: Vec<TaskPayload>,
}

impl From<&Board> for BoardPayload {
    fn from(board: &Board) -> Self {
        Self {
            id: board.id.clone(),
            title: board.title.clone(),
            description: board.description.clone(),
            tasks: board.tasks.iter().map(TaskPayload::from).collect(),
        }
    }
}

/// Store document id; some backends hand out numeric ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentId {
    Text(String),
    Number(Number),
}

impl DocumentId {
    pub fn into_string(self) -> String {
        match self {
            Self::Text(value) => value,
            Self::Number(value) => value.to_string(),
        }
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Task as returned by the board query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDocument {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub due_date: Option<i64>,
    #[serde(default)]
    pub assignee: Option<String>,
    pub created_at: i64,
}

/// Board as returned by the board query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardDocument {
    #[serde(rename = "_id")]
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<TaskDocument>,
}

#[cfg(test)]
mod tests {
    use super::{BoardDocument, BoardPayload, DocumentId};
    use crate::model::board::Board;
    use crate::model::task::{Task, TaskFields};
    use serde_json::json;

    #[test]
    fn payload_uses_camel_case_wire_names() {
        let mut board = Board::new_local("To Do", "");
        let mut fields = TaskFields::titled("Write spec");
        fields.due_date = Some(1_700_000_000_000);
        board.tasks.push(Task::new_local(fields, board.status()));

        let value = serde_json::to_value(BoardPayload::from(&board)).unwrap();
        let task = &value["tasks"][0];
        assert_eq!(task["dueDate"], json!(1_700_000_000_000_i64));
        assert_eq!(task["status"], json!("to-do"));
        assert_eq!(task["priority"], json!("medium"));
        assert!(task["id"].as_str().unwrap().starts_with("temp-"));
    }

    #[test]
    fn document_ids_accept_numbers() {
        let document: BoardDocument = serde_json::from_value(json!({
            "_id": 7,
            "title": "Done",
            "tasks": [{
                "_id": "t1",
                "title": "Ship",
                "priority": "high",
                "createdAt": 1
            }]
        }))
        .unwrap();
        assert_eq!(document.id.clone().into_string(), "7");
        assert_eq!(document.tasks[0].id, DocumentId::from("t1"));
        assert_eq!(document.description, "");
    }
}
