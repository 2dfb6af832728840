//! SQLite-backed planning store.
//!
//! # Responsibility
//! - Persist owner-scoped boards and tasks in `plan_boards`/`plan_tasks`.
//! - Serve document-shaped board snapshots and push them to subscribers.
//!
//! # Invariants
//! - Listing is deterministic: `sort_order ASC, id ASC` for boards and tasks.
//! - Stored task status always equals the slug of its board title.
//! - Entities owned by another user are never read or overwritten.

use crate::db::migrations::latest_version;
use crate::model::id::EntityId;
use crate::model::task::{status_slug, Priority, TaskFields};
use crate::repo::documents::{BoardDocument, BoardPayload, DocumentId, TaskDocument};
use crate::repo::plan_repo::{require_durable, PlanningStore, SaveReceipt, StoreError, StoreResult};
use crate::sync::subscription::{Snapshot, SnapshotHub, SnapshotListener, Subscription};
use log::{error, info, warn};
use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;
use uuid::Uuid;

const BOARD_SELECT_SQL: &str = "SELECT board_id, title, description
FROM plan_boards
WHERE owner_id = ?1
ORDER BY sort_order ASC, board_id ASC;";

const TASK_SELECT_SQL: &str = "SELECT
    t.task_id AS task_id,
    t.board_id AS board_id,
    t.title AS title,
    t.description AS description,
    t.priority AS priority,
    t.status AS status,
    t.due_date AS due_date,
    t.assignee AS assignee,
    t.created_at AS created_at
FROM plan_tasks t
JOIN plan_boards b ON b.board_id = t.board_id
WHERE b.owner_id = ?1
ORDER BY t.sort_order ASC, t.task_id ASC;";

const OWNED_TASK_FILTER: &str =
    "board_id IN (SELECT board_id FROM plan_boards WHERE owner_id = ?)";

/// Planning store over a migrated SQLite connection.
pub struct SqlitePlanningStore<'conn> {
    conn: &'conn Connection,
    hub: SnapshotHub,
}

impl<'conn> SqlitePlanningStore<'conn> {
    /// Creates a store from a connection opened through `db::open_db*`.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_store_connection_ready(conn)?;
        Ok(Self {
            conn,
            hub: SnapshotHub::new(),
        })
    }

    fn load_documents(&self, owner_id: &str) -> StoreResult<Vec<BoardDocument>> {
        let mut boards = Vec::new();
        let mut positions = HashMap::new();

        let mut stmt = self.conn.prepare(BOARD_SELECT_SQL)?;
        let mut rows = stmt.query([owner_id])?;
        while let Some(row) = rows.next()? {
            let board_id: String = row.get("board_id")?;
            positions.insert(board_id.clone(), boards.len());
            boards.push(BoardDocument {
                id: DocumentId::Text(board_id),
                title: row.get("title")?,
                description: row.get("description")?,
                tasks: Vec::new(),
            });
        }

        let mut stmt = self.conn.prepare(TASK_SELECT_SQL)?;
        let mut rows = stmt.query([owner_id])?;
        while let Some(row) = rows.next()? {
            let task_id: String = row.get("task_id")?;
            let board_id: String = row.get("board_id")?;
            let priority: String = row.get("priority")?;
            if Priority::parse(&priority).is_none() {
                return Err(StoreError::InvalidData(format!(
                    "invalid priority `{priority}` in plan_tasks.priority"
                )));
            }
            let position = positions.get(&board_id).copied().ok_or_else(|| {
                StoreError::InvalidData(format!("task {task_id} references unknown board"))
            })?;
            boards[position].tasks.push(TaskDocument {
                id: DocumentId::Text(task_id),
                title: row.get("title")?,
                description: row.get("description")?,
                priority,
                status: row.get("status")?,
                due_date: row.get("due_date")?,
                assignee: row.get("assignee")?,
                created_at: row.get("created_at")?,
            });
        }

        Ok(boards)
    }

    fn publish_snapshot(&self, owner_id: &str) {
        if !self.hub.has_listeners(owner_id) {
            return;
        }
        match self.fetch_boards(owner_id) {
            Ok(snapshot) => {
                self.hub.publish(owner_id, &snapshot);
            }
            Err(err) => {
                warn!("event=plan_snapshot module=repo status=error error={err}");
            }
        }
    }

    fn owned_board_title(&self, owner_id: &str, board_id: &str) -> StoreResult<Option<String>> {
        let title = self
            .conn
            .query_row(
                "SELECT title FROM plan_boards WHERE board_id = ?1 AND owner_id = ?2;",
                params![board_id, owner_id],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(title)
    }
}

impl PlanningStore for SqlitePlanningStore<'_> {
    fn fetch_boards(&self, owner_id: &str) -> StoreResult<Snapshot> {
        let documents = self.load_documents(owner_id)?;
        serde_json::to_value(&documents).map_err(|err| StoreError::InvalidData(err.to_string()))
    }

    fn subscribe(&self, owner_id: &str, listener: SnapshotListener) -> Subscription {
        self.hub.subscribe(owner_id, listener)
    }

    fn save_boards(&self, owner_id: &str, boards: &[BoardPayload]) -> StoreResult<SaveReceipt> {
        let started_at = Instant::now();
        let result = validate_board_set(boards).and_then(|()| {
            let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
            let receipt = write_board_set(&tx, owner_id, boards)?;
            tx.commit()?;
            Ok(receipt)
        });

        match &result {
            Ok(receipt) => info!(
                "event=plan_save module=repo status=ok boards={} tasks={} assigned={} duration_ms={}",
                receipt.board_ids.len(),
                receipt.task_ids.len(),
                receipt.assigned.len(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=plan_save module=repo status=error boards={} duration_ms={} error={err}",
                boards.len(),
                started_at.elapsed().as_millis()
            ),
        }

        if result.is_ok() {
            self.publish_snapshot(owner_id);
        }
        result
    }

    fn create_board(
        &self,
        owner_id: &str,
        title: &str,
        description: &str,
    ) -> StoreResult<EntityId> {
        let title = require_title(title, "board")?;
        let board_id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO plan_boards (board_id, owner_id, title, description, sort_order)
             VALUES (
                ?1, ?2, ?3, ?4,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM plan_boards WHERE owner_id = ?2)
             );",
            params![board_id, owner_id, title, description],
        )?;
        info!("event=plan_board_create module=repo status=ok board_id={board_id}");
        self.publish_snapshot(owner_id);
        Ok(EntityId::durable(board_id))
    }

    fn update_board(
        &self,
        owner_id: &str,
        board_id: &EntityId,
        title: &str,
        description: &str,
    ) -> StoreResult<()> {
        let id = require_durable(board_id)?;
        let title = require_title(title, "board")?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE plan_boards
             SET
                title = ?1,
                description = ?2,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE board_id = ?3 AND owner_id = ?4;",
            params![title, description, id, owner_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(board_id.clone()));
        }
        tx.execute(
            "UPDATE plan_tasks SET status = ?1 WHERE board_id = ?2;",
            params![status_slug(title), id],
        )?;
        tx.commit()?;

        self.publish_snapshot(owner_id);
        Ok(())
    }

    fn delete_board(&self, owner_id: &str, board_id: &EntityId) -> StoreResult<()> {
        let id = require_durable(board_id)?;
        let changed = self.conn.execute(
            "DELETE FROM plan_boards WHERE board_id = ?1 AND owner_id = ?2;",
            params![id, owner_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(board_id.clone()));
        }
        info!("event=plan_board_delete module=repo status=ok board_id={id}");
        self.publish_snapshot(owner_id);
        Ok(())
    }

    fn create_task(
        &self,
        owner_id: &str,
        board_id: &EntityId,
        fields: &TaskFields,
    ) -> StoreResult<EntityId> {
        let board = require_durable(board_id)?;
        let title = require_title(&fields.title, "task")?;
        let board_title = self
            .owned_board_title(owner_id, board)?
            .ok_or_else(|| StoreError::NotFound(board_id.clone()))?;

        let task_id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO plan_tasks (
                task_id, board_id, title, description, priority, status,
                due_date, assignee, sort_order
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                (SELECT COALESCE(MAX(sort_order) + 1, 0) FROM plan_tasks WHERE board_id = ?2)
            );",
            params![
                task_id,
                board,
                title,
                fields.description.as_str(),
                fields.priority.as_str(),
                status_slug(&board_title),
                fields.due_date,
                fields.assignee.as_deref(),
            ],
        )?;
        info!("event=plan_task_create module=repo status=ok task_id={task_id} board_id={board}");
        self.publish_snapshot(owner_id);
        Ok(EntityId::durable(task_id))
    }

    fn update_task(
        &self,
        owner_id: &str,
        task_id: &EntityId,
        fields: &TaskFields,
    ) -> StoreResult<()> {
        let id = require_durable(task_id)?;
        let title = require_title(&fields.title, "task")?;
        let changed = self.conn.execute(
            &format!(
                "UPDATE plan_tasks
                 SET
                    title = ?,
                    description = ?,
                    priority = ?,
                    due_date = ?,
                    assignee = ?,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE task_id = ? AND {OWNED_TASK_FILTER};"
            ),
            params![
                title,
                fields.description.as_str(),
                fields.priority.as_str(),
                fields.due_date,
                fields.assignee.as_deref(),
                id,
                owner_id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(task_id.clone()));
        }
        self.publish_snapshot(owner_id);
        Ok(())
    }

    fn delete_task(&self, owner_id: &str, task_id: &EntityId) -> StoreResult<()> {
        let id = require_durable(task_id)?;
        let changed = self.conn.execute(
            &format!("DELETE FROM plan_tasks WHERE task_id = ? AND {OWNED_TASK_FILTER};"),
            params![id, owner_id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(task_id.clone()));
        }
        info!("event=plan_task_delete module=repo status=ok task_id={id}");
        self.publish_snapshot(owner_id);
        Ok(())
    }
}

fn validate_board_set(boards: &[BoardPayload]) -> StoreResult<()> {
    let mut seen = HashSet::new();
    for board in boards {
        require_title(&board.title, "board")?;
        if !seen.insert(board.id.as_str()) {
            return Err(StoreError::Rejected(format!(
                "duplicate id in save request: {}",
                board.id
            )));
        }
        for task in &board.tasks {
            require_title(&task.title, "task")?;
            if !seen.insert(task.id.as_str()) {
                return Err(StoreError::Rejected(format!(
                    "duplicate id in save request: {}",
                    task.id
                )));
            }
        }
    }
    Ok(())
}

fn write_board_set(
    tx: &Transaction<'_>,
    owner_id: &str,
    boards: &[BoardPayload],
) -> StoreResult<SaveReceipt> {
    let mut receipt = SaveReceipt::default();

    for board in boards {
        let board_id = resolve_id(&board.id, &mut receipt.assigned);
        if !board.id.is_temporary() {
            ensure_board_not_foreign(tx, owner_id, &board_id)?;
        }
        receipt.board_ids.push(board_id);
        for task in &board.tasks {
            let task_id = resolve_id(&task.id, &mut receipt.assigned);
            if !task.id.is_temporary() {
                ensure_task_not_foreign(tx, owner_id, &task_id)?;
            }
            receipt.task_ids.push(task_id);
        }
    }

    let kept_boards: HashSet<&str> = receipt.board_ids.iter().map(String::as_str).collect();
    for stale in owned_ids(tx, "SELECT board_id FROM plan_boards WHERE owner_id = ?1;", owner_id)? {
        if !kept_boards.contains(stale.as_str()) {
            tx.execute("DELETE FROM plan_boards WHERE board_id = ?1;", [&stale])?;
        }
    }

    let kept_tasks: HashSet<&str> = receipt.task_ids.iter().map(String::as_str).collect();
    for stale in owned_ids(
        tx,
        "SELECT t.task_id FROM plan_tasks t
         JOIN plan_boards b ON b.board_id = t.board_id
         WHERE b.owner_id = ?1;",
        owner_id,
    )? {
        if !kept_tasks.contains(stale.as_str()) {
            tx.execute("DELETE FROM plan_tasks WHERE task_id = ?1;", [&stale])?;
        }
    }

    let mut task_ids = receipt.task_ids.iter();
    for (board_order, (board, board_id)) in boards.iter().zip(&receipt.board_ids).enumerate() {
        tx.execute(
            "INSERT INTO plan_boards (board_id, owner_id, title, description, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(board_id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                sort_order = excluded.sort_order,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                board_id,
                owner_id,
                board.title.trim(),
                board.description.as_str(),
                board_order as i64,
            ],
        )?;

        let status = status_slug(&board.title);
        for (task_order, task) in board.tasks.iter().enumerate() {
            let task_id = task_ids.next().ok_or_else(|| {
                StoreError::InvalidData("task id resolution out of step".to_string())
            })?;
            tx.execute(
                "INSERT INTO plan_tasks (
                    task_id, board_id, title, description, priority, status,
                    due_date, assignee, sort_order, created_at
                ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                    COALESCE(?10, strftime('%s', 'now') * 1000)
                )
                ON CONFLICT(task_id) DO UPDATE SET
                    board_id = excluded.board_id,
                    title = excluded.title,
                    description = excluded.description,
                    priority = excluded.priority,
                    status = excluded.status,
                    due_date = excluded.due_date,
                    assignee = excluded.assignee,
                    sort_order = excluded.sort_order,
                    updated_at = (strftime('%s', 'now') * 1000);",
                params![
                    task_id,
                    board_id,
                    task.title.trim(),
                    task.description.as_str(),
                    task.priority.as_str(),
                    status.as_str(),
                    task.due_date,
                    task.assignee.as_deref(),
                    task_order as i64,
                    task.created_at,
                ],
            )?;
        }
    }

    Ok(receipt)
}

fn resolve_id(id: &EntityId, assigned: &mut BTreeMap<String, String>) -> String {
    match id {
        EntityId::Durable(value) => value.clone(),
        EntityId::Temporary(value) => {
            let durable = Uuid::new_v4().to_string();
            assigned.insert(value.clone(), durable.clone());
            durable
        }
    }
}

fn ensure_board_not_foreign(tx: &Transaction<'_>, owner_id: &str, board_id: &str) -> StoreResult<()> {
    let existing_owner = tx
        .query_row(
            "SELECT owner_id FROM plan_boards WHERE board_id = ?1;",
            [board_id],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    match existing_owner {
        Some(existing) if existing != owner_id => Err(StoreError::Rejected(format!(
            "board {board_id} belongs to another owner"
        ))),
        _ => Ok(()),
    }
}

fn ensure_task_not_foreign(tx: &Transaction<'_>, owner_id: &str, task_id: &str) -> StoreResult<()> {
    let existing_owner = tx
        .query_row(
            "SELECT b.owner_id FROM plan_tasks t
             JOIN plan_boards b ON b.board_id = t.board_id
             WHERE t.task_id = ?1;",
            [task_id],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    match existing_owner {
        Some(existing) if existing != owner_id => Err(StoreError::Rejected(format!(
            "task {task_id} belongs to another owner"
        ))),
        _ => Ok(()),
    }
}

fn owned_ids(tx: &Transaction<'_>, sql: &str, owner_id: &str) -> StoreResult<Vec<String>> {
    let mut stmt = tx.prepare(sql)?;
    let mut rows = stmt.query([owner_id])?;
    let mut ids = Vec::new();
    while let Some(row) = rows.next()? {
        ids.push(row.get(0)?);
    }
    Ok(ids)
}

fn require_title<'a>(title: &'a str, entity: &str) -> StoreResult<&'a str> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(StoreError::Rejected(format!("{entity} title must not be blank")));
    }
    Ok(trimmed)
}

fn ensure_store_connection_ready(conn: &Connection) -> StoreResult<()> {
    let actual_version = conn.query_row("PRAGMA user_version;", [], |row| row.get::<_, u32>(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
