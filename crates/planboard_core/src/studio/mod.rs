//! Planning studio: kanban boards with local edits and bulk save.
//!
//! # Responsibility
//! - Bind an injected store handle and session to the local board set.
//! - Route drag gestures into task moves.
//! - Flush the whole board set through one bulk save and reconcile with
//!   the store's pushed snapshots.
//!
//! # Invariants
//! - Failures are handled here: they become notices and log lines, never
//!   panics or partially applied state.
//! - Snapshots are applied only from `pump_snapshots`/`load`, never from
//!   inside a store callback.

pub mod board_store;
pub mod drag;
pub mod notice;
pub mod save;

use crate::config::StudioConfig;
use crate::model::board::Board;
use crate::model::id::EntityId;
use crate::model::session::Session;
use crate::model::task::{Task, TaskFields};
use crate::repo::plan_repo::{PlanningStore, SaveReceipt, StoreResult};
use crate::sync::subscription::{Snapshot, SnapshotInbox, Subscription};
use board_store::{BoardSet, MoveOutcome, ReconcileOutcome};
use drag::{DragController, DragPhase, DragPreview, DragRelease, PointerKind, PointerSample};
use log::{debug, error, info, warn};
use notice::{Notice, NoticeQueue};
use save::{SaveBlocked, SaveOutcome, SaveState, SaveTicket};

const NOTICE_NEED_BOARD: &str = "Please add at least one board before saving";
const NOTICE_SAVED: &str = "Planning board saved successfully";
const NOTICE_SAVE_FAILED: &str = "Failed to save planning board";
const NOTICE_LOAD_FAILED: &str = "Failed to load planning boards";
const NOTICE_SNAPSHOT_INVALID: &str = "Received unexpected board data; keeping local changes";
const NOTICE_UNSAVED_AFTER_SAVE: &str = "Changes made while saving are not saved yet";

/// Result of releasing a drag gesture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropResult {
    pub release: DragRelease,
    /// Present when the gesture ended over a board.
    pub movement: Option<MoveOutcome>,
}

/// Planning studio session over one store and one signed-in user.
pub struct PlanningStudio<S: PlanningStore> {
    store: S,
    session: Session,
    boards: BoardSet,
    drag: DragController,
    save: SaveState,
    notices: NoticeQueue,
    inbox: SnapshotInbox,
    _subscription: Subscription,
}

impl<S: PlanningStore> PlanningStudio<S> {
    /// Subscribes to the session owner's boards and performs the first load.
    pub fn open(store: S, session: Session, config: StudioConfig) -> Self {
        let inbox = SnapshotInbox::new();
        let subscription = store.subscribe(session.user_id(), inbox.listener());
        let mut studio = Self {
            store,
            session,
            boards: BoardSet::new(),
            drag: DragController::new(config),
            save: SaveState::default(),
            notices: NoticeQueue::default(),
            inbox,
            _subscription: subscription,
        };
        studio.load();
        studio
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn boards(&self) -> &[Board] {
        self.boards.boards()
    }

    pub fn board_set(&self) -> &BoardSet {
        &self.boards
    }

    pub fn is_dirty(&self) -> bool {
        self.boards.is_dirty()
    }

    pub fn is_saving(&self) -> bool {
        self.save.is_in_flight()
    }

    pub fn revision(&self) -> u64 {
        self.boards.revision()
    }

    pub fn drain_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }

    /// Fetches the owner's boards and replaces local state.
    ///
    /// Returns `None` when the fetch or the snapshot shape failed; local
    /// state is then left as it was.
    pub fn load(&mut self) -> Option<ReconcileOutcome> {
        match self.store.fetch_boards(self.session.user_id()) {
            Ok(snapshot) => self.apply_snapshot(&snapshot),
            Err(err) => {
                error!("event=studio_load module=studio status=error error={err}");
                self.notices.error(NOTICE_LOAD_FAILED);
                None
            }
        }
    }

    /// Applies every snapshot the store pushed since the last pump.
    ///
    /// Returns how many snapshots changed local state.
    pub fn pump_snapshots(&mut self) -> usize {
        let mut applied = 0;
        while let Some(snapshot) = self.inbox.pop() {
            if let Some(ReconcileOutcome::Applied { .. }) = self.apply_snapshot(&snapshot) {
                applied += 1;
            }
        }
        applied
    }

    pub fn add_board(
        &mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> EntityId {
        self.boards.add_board(title, description)
    }

    pub fn edit_board(
        &mut self,
        board_id: &EntityId,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> bool {
        self.boards.edit_board(board_id, title, description)
    }

    pub fn delete_board(&mut self, board_id: &EntityId) -> bool {
        self.boards.delete_board(board_id)
    }

    pub fn add_task(&mut self, board_id: &EntityId, fields: TaskFields) -> Option<EntityId> {
        self.boards.add_task(board_id, fields)
    }

    pub fn edit_task(&mut self, task_id: &EntityId, fields: TaskFields) -> bool {
        self.boards.edit_task(task_id, fields)
    }

    pub fn delete_task(&mut self, task_id: &EntityId) -> bool {
        self.boards.delete_task(task_id)
    }

    pub fn move_task(&mut self, task_id: &EntityId, target_board_id: &EntityId) -> MoveOutcome {
        self.boards.move_task(task_id, target_board_id)
    }

    pub fn find_task(&self, task_id: &EntityId) -> Option<(&Board, &Task)> {
        self.boards.find_task(task_id)
    }

    pub fn drag_phase(&self) -> DragPhase {
        self.drag.phase()
    }

    pub fn drag_preview(&self) -> Option<&DragPreview> {
        self.drag.preview()
    }

    /// Starts a press on a task; `false` when the task is unknown.
    pub fn press_task(&mut self, kind: PointerKind, task_id: &EntityId, at: PointerSample) -> bool {
        let Some((board, task)) = self.boards.find_task(task_id) else {
            return false;
        };
        let (snapshot, source) = (task.clone(), board.id.clone());
        self.drag.press(kind, snapshot, source, at);
        true
    }

    pub fn pointer_move(&mut self, at: PointerSample) -> bool {
        self.drag.pointer_move(at)
    }

    pub fn tick(&mut self, now_ms: u64) -> bool {
        self.drag.tick(now_ms)
    }

    /// Ends the gesture over `target` (the board under the pointer, if any).
    ///
    /// Only a drop over an existing board other than the task's current
    /// one changes state.
    pub fn release_drag(&mut self, target: Option<&EntityId>) -> DropResult {
        let release = self.drag.release(target.cloned());
        let movement = match &release {
            DragRelease::Dropped {
                task_id,
                target_board,
                ..
            } => Some(self.boards.move_task(task_id, target_board)),
            _ => None,
        };
        DropResult { release, movement }
    }

    pub fn cancel_drag(&mut self) {
        self.drag.cancel();
    }

    /// Captures the board set for an externally awaited save.
    ///
    /// Blocked requests never reach the store; the no-board case also
    /// queues a validation notice.
    pub fn begin_save(&mut self) -> Result<SaveTicket, SaveBlocked> {
        match self.save.begin(&self.boards) {
            Ok(ticket) => {
                info!(
                    "event=studio_save module=studio status=start boards={} revision={}",
                    ticket.payload().len(),
                    ticket.revision()
                );
                Ok(ticket)
            }
            Err(SaveBlocked::NoBoards) => {
                warn!("event=studio_save module=studio status=blocked reason=no_boards");
                self.notices.error(NOTICE_NEED_BOARD);
                Err(SaveBlocked::NoBoards)
            }
            Err(SaveBlocked::InFlight) => {
                debug!("event=studio_save module=studio status=ignored reason=in_flight");
                Err(SaveBlocked::InFlight)
            }
        }
    }

    /// Applies the store's answer to a ticket from [`Self::begin_save`].
    ///
    /// On success, dirty clears only when no local edit happened since the
    /// ticket was taken; in that case pushed snapshots are applied at once.
    /// Otherwise the queued snapshots are discarded, local temporary ids
    /// take the assigned durable ids, and the set stays dirty for the next
    /// save.
    pub fn complete_save(
        &mut self,
        ticket: SaveTicket,
        result: StoreResult<SaveReceipt>,
    ) -> SaveOutcome {
        if !self.save.finish(&ticket) {
            warn!("event=studio_save module=studio status=stale");
            return SaveOutcome::Stale;
        }

        match result {
            Ok(receipt) => {
                info!(
                    "event=studio_save module=studio status=ok boards={} tasks={} assigned={}",
                    receipt.board_ids.len(),
                    receipt.task_ids.len(),
                    receipt.assigned.len()
                );
                self.notices.success(NOTICE_SAVED);
                if self.boards.revision() == ticket.revision() {
                    self.boards.mark_clean();
                    self.pump_snapshots();
                } else {
                    // Queued snapshots predate the late edits; applying them
                    // would drop those edits.
                    let discarded = self.inbox.clear();
                    let adopted = self.boards.adopt_durable_ids(&receipt.assigned);
                    self.drag.adopt_durable_ids(&receipt.assigned);
                    info!(
                        "event=studio_save module=studio status=partial adopted={adopted} discarded_snapshots={discarded}"
                    );
                    self.notices.info(NOTICE_UNSAVED_AFTER_SAVE);
                }
                SaveOutcome::Saved(receipt)
            }
            Err(err) => {
                error!("event=studio_save module=studio status=error error={err}");
                self.notices.error(format!("{NOTICE_SAVE_FAILED}: {err}"));
                SaveOutcome::Failed(err)
            }
        }
    }

    /// Submits the complete board set in one bulk mutation.
    pub fn save(&mut self) -> SaveOutcome {
        let ticket = match self.begin_save() {
            Ok(ticket) => ticket,
            Err(blocked) => return SaveOutcome::Blocked(blocked),
        };
        let result = self
            .store
            .save_boards(self.session.user_id(), ticket.payload());
        self.complete_save(ticket, result)
    }

    fn apply_snapshot(&mut self, snapshot: &Snapshot) -> Option<ReconcileOutcome> {
        match self.boards.reconcile(snapshot) {
            Ok(outcome) => {
                if let ReconcileOutcome::Applied { boards, tasks } = outcome {
                    debug!(
                        "event=studio_reconcile module=studio status=ok boards={boards} tasks={tasks} revision={}",
                        self.boards.revision()
                    );
                }
                Some(outcome)
            }
            Err(err) => {
                warn!("event=studio_reconcile module=studio status=error error={err}");
                self.notices.error(NOTICE_SNAPSHOT_INVALID);
                None
            }
        }
    }
}
