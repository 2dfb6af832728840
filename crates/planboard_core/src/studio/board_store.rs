//! Session-local board/task collection.
//!
//! # Responsibility
//! - Hold the in-memory boards and nested tasks edited by the studio.
//! - Apply structural edits without persisting them.
//! - Replace local state from store snapshots (reconciliation, not merge).
//!
//! # Invariants
//! - Every task id appears in exactly one board's task list.
//! - Each task's `status` equals its board's status slug.
//! - `revision` increases on every applied change and never otherwise.

use crate::model::board::Board;
use crate::model::id::EntityId;
use crate::model::task::{status_slug, Priority, Task, TaskFields};
use crate::repo::documents::{BoardDocument, BoardPayload};
use crate::sync::subscription::Snapshot;
use log::debug;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Result of a `move_task` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved { from: EntityId, to: EntityId },
    /// Task already lives on the target board; nothing changed.
    SameBoard,
    TaskNotFound,
    BoardNotFound,
}

/// Result of applying a store snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Applied { boards: usize, tasks: usize },
    /// Snapshot is structurally equal to local state; nothing touched.
    Unchanged,
}

/// Snapshot could not be turned into boards; local state is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    Malformed(String),
}

impl Display for ReconcileError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed(message) => write!(f, "malformed board snapshot: {message}"),
        }
    }
}

impl Error for ReconcileError {}

/// Authoritative-for-the-session board collection.
#[derive(Debug, Clone, Default)]
pub struct BoardSet {
    boards: Vec<Board>,
    dirty: bool,
    revision: u64,
}

impl BoardSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boards(&self) -> &[Board] {
        &self.boards
    }

    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Whether local edits exist that the store has not confirmed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Change counter; bumps once per applied edit or snapshot.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn board(&self, board_id: &EntityId) -> Option<&Board> {
        self.boards.iter().find(|board| &board.id == board_id)
    }

    /// Finds a task and its containing board.
    pub fn find_task(&self, task_id: &EntityId) -> Option<(&Board, &Task)> {
        self.boards.iter().find_map(|board| {
            board
                .tasks
                .iter()
                .find(|task| &task.id == task_id)
                .map(|task| (board, task))
        })
    }

    /// Id of the board currently holding `task_id`.
    pub fn board_of(&self, task_id: &EntityId) -> Option<&EntityId> {
        self.find_task(task_id).map(|(board, _)| &board.id)
    }

    pub fn task_count(&self) -> usize {
        self.boards.iter().map(|board| board.tasks.len()).sum()
    }

    /// Serializes the collection into the bulk-save request shape.
    pub fn to_payload(&self) -> Vec<BoardPayload> {
        self.boards.iter().map(BoardPayload::from).collect()
    }

    /// Appends an unsaved board and returns its temporary id.
    pub fn add_board(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> EntityId {
        let board = Board::new_local(title, description);
        let id = board.id.clone();
        self.boards.push(board);
        self.touch();
        debug!("event=board_add module=studio status=ok board_id={id}");
        id
    }

    /// Renames/re-describes a board; contained task statuses follow the title.
    pub fn edit_board(
        &mut self,
        board_id: &EntityId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> bool {
        let Some(board) = self.board_mut(board_id) else {
            return false;
        };
        board.title = title.into();
        board.description = description.into();
        board.resync_statuses();
        self.touch();
        true
    }

    /// Removes a board together with all of its tasks.
    pub fn delete_board(&mut self, board_id: &EntityId) -> bool {
        let before = self.boards.len();
        self.boards.retain(|board| &board.id != board_id);
        if self.boards.len() == before {
            return false;
        }
        self.touch();
        debug!("event=board_delete module=studio status=ok board_id={board_id}");
        true
    }

    /// Appends a new task to a board; `None` when the board is unknown.
    pub fn add_task(&mut self, board_id: &EntityId, fields: TaskFields) -> Option<EntityId> {
        let board = self.board_mut(board_id)?;
        let task = Task::new_local(fields, board.status());
        let task_id = task.id.clone();
        board.tasks.push(task);
        self.touch();
        debug!("event=task_add module=studio status=ok task_id={task_id} board_id={board_id}");
        Some(task_id)
    }

    /// Replaces a task's editable fields in place.
    pub fn edit_task(&mut self, task_id: &EntityId, fields: TaskFields) -> bool {
        let Some(task) = self
            .boards
            .iter_mut()
            .flat_map(|board| board.tasks.iter_mut())
            .find(|task| &task.id == task_id)
        else {
            return false;
        };
        task.apply_fields(fields);
        self.touch();
        true
    }

    /// Removes a task from whichever board holds it.
    pub fn delete_task(&mut self, task_id: &EntityId) -> bool {
        for board in &mut self.boards {
            if let Some(position) = board.tasks.iter().position(|task| &task.id == task_id) {
                board.tasks.remove(position);
                self.touch();
                debug!("event=task_delete module=studio status=ok task_id={task_id}");
                return true;
            }
        }
        false
    }

    /// Moves a task to the end of `target_board_id`, keeping its id.
    pub fn move_task(&mut self, task_id: &EntityId, target_board_id: &EntityId) -> MoveOutcome {
        let Some(target_index) = self
            .boards
            .iter()
            .position(|board| &board.id == target_board_id)
        else {
            return MoveOutcome::BoardNotFound;
        };
        let Some(source_index) = self
            .boards
            .iter()
            .position(|board| board.contains_task(task_id))
        else {
            return MoveOutcome::TaskNotFound;
        };
        if source_index == target_index {
            return MoveOutcome::SameBoard;
        }

        let source = &mut self.boards[source_index];
        let Some(task_index) = source.tasks.iter().position(|task| &task.id == task_id) else {
            return MoveOutcome::TaskNotFound;
        };
        let mut task = source.tasks.remove(task_index);
        let target = &mut self.boards[target_index];
        task.status = target.status();
        target.tasks.push(task);

        let from = self.boards[source_index].id.clone();
        let to = target_board_id.clone();
        self.touch();
        debug!("event=task_move module=studio status=ok task_id={task_id} from={from} to={to}");
        MoveOutcome::Moved { from, to }
    }

    /// Replaces the whole collection with a store snapshot.
    ///
    /// Structurally equal snapshots are skipped without touching `revision`.
    /// Malformed snapshots leave local state intact.
    pub fn reconcile(&mut self, snapshot: &Snapshot) -> Result<ReconcileOutcome, ReconcileError> {
        let boards = parse_snapshot(snapshot)?;
        if boards == self.boards {
            return Ok(ReconcileOutcome::Unchanged);
        }

        self.boards = boards;
        self.dirty = false;
        self.revision += 1;
        Ok(ReconcileOutcome::Applied {
            boards: self.boards.len(),
            tasks: self.task_count(),
        })
    }

    /// Swaps temporary ids for the durable ids a save assigned, keeping
    /// every local edit. Returns how many ids changed; dirty is untouched.
    pub fn adopt_durable_ids(&mut self, assigned: &BTreeMap<String, String>) -> usize {
        let mut adopted = 0;
        for board in &mut self.boards {
            adopted += usize::from(board.id.resolve_from(assigned));
            for task in &mut board.tasks {
                adopted += usize::from(task.id.resolve_from(assigned));
            }
        }
        if adopted > 0 {
            self.revision += 1;
            debug!("event=ids_adopt module=studio status=ok adopted={adopted}");
        }
        adopted
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    fn board_mut(&mut self, board_id: &EntityId) -> Option<&mut Board> {
        self.boards.iter_mut().find(|board| &board.id == board_id)
    }

    fn touch(&mut self) {
        self.dirty = true;
        self.revision += 1;
    }
}

fn parse_snapshot(snapshot: &Snapshot) -> Result<Vec<Board>, ReconcileError> {
    let documents = Vec::<BoardDocument>::deserialize(snapshot)
        .map_err(|err| ReconcileError::Malformed(err.to_string()))?;

    let mut seen = HashSet::new();
    let mut boards = Vec::with_capacity(documents.len());
    for document in documents {
        let board_id = parse_document_id(document.id.into_string(), &mut seen)?;
        let status = status_slug(&document.title);
        let mut tasks = Vec::with_capacity(document.tasks.len());
        for task in document.tasks {
            let task_id = parse_document_id(task.id.into_string(), &mut seen)?;
            let priority = Priority::parse(&task.priority).ok_or_else(|| {
                ReconcileError::Malformed(format!(
                    "task {task_id} has unknown priority `{}`",
                    task.priority
                ))
            })?;
            tasks.push(Task {
                id: task_id,
                title: task.title,
                description: task.description,
                priority,
                status: status.clone(),
                due_date: task.due_date,
                assignee: task.assignee,
                created_at: task.created_at,
            });
        }
        boards.push(Board {
            id: board_id,
            title: document.title,
            description: document.description,
            tasks,
        });
    }
    Ok(boards)
}

fn parse_document_id(
    raw: String,
    seen: &mut HashSet<String>,
) -> Result<EntityId, ReconcileError> {
    let id = EntityId::parse(&raw)
        .map_err(|err| ReconcileError::Malformed(format!("bad id `{raw}`: {err}")))?;
    if !seen.insert(id.as_str().to_string()) {
        return Err(ReconcileError::Malformed(format!("duplicate id `{id}`")));
    }
    Ok(id)
}
