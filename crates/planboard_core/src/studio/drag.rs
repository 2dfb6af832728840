//! Drag-and-drop move protocol.
//!
//! # Responsibility
//! - Tell drags apart from clicks using activation constraints.
//! - Hold the dragged task snapshot for the floating preview.
//! - Report where a drag ended; the caller applies the move.
//!
//! # Invariants
//! - Phase is `Dragging` only between activation and release/cancel.
//! - `Dropped` is transient: release returns to `Idle` before returning.

use crate::config::StudioConfig;
use crate::model::id::EntityId;
use crate::model::task::Task;
use log::debug;
use std::collections::BTreeMap;

/// Input device that started the press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

/// Pointer position at a moment in time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerSample {
    pub x: f64,
    pub y: f64,
    /// Monotonic milliseconds.
    pub at_ms: u64,
}

impl PointerSample {
    pub fn new(x: f64, y: f64, at_ms: u64) -> Self {
        Self { x, y, at_ms }
    }

    fn distance_to(&self, other: &Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Observable drag phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    Dragging,
    /// Transient: `release` passes through it and returns to `Idle` before
    /// returning, so `phase()` never reports it.
    Dropped,
}

/// Snapshot of the task being dragged, used for the floating preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragPreview {
    pub task: Task,
    pub source_board: EntityId,
}

/// How a pointer release resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragRelease {
    /// Press never activated a drag; treat as a click on the task.
    Click { task_id: EntityId },
    /// Drag ended over a board.
    Dropped {
        task_id: EntityId,
        source_board: EntityId,
        target_board: EntityId,
    },
    /// Drag ended outside any drop target.
    Cancelled { task_id: EntityId },
    /// Release without a prior press.
    Ignored,
}

#[derive(Debug, Clone)]
struct PendingPress {
    kind: PointerKind,
    origin: PointerSample,
    preview: DragPreview,
}

#[derive(Debug, Clone)]
enum DragState {
    Idle { pending: Option<PendingPress> },
    Dragging { preview: DragPreview },
}

/// Drag state machine for one board view.
#[derive(Debug, Clone)]
pub struct DragController {
    config: StudioConfig,
    state: DragState,
}

impl DragController {
    pub fn new(config: StudioConfig) -> Self {
        Self {
            config,
            state: DragState::Idle { pending: None },
        }
    }

    pub fn phase(&self) -> DragPhase {
        match self.state {
            DragState::Idle { .. } => DragPhase::Idle,
            DragState::Dragging { .. } => DragPhase::Dragging,
        }
    }

    /// Task snapshot to render under the pointer while dragging.
    pub fn preview(&self) -> Option<&DragPreview> {
        match &self.state {
            DragState::Dragging { preview } => Some(preview),
            DragState::Idle { .. } => None,
        }
    }

    /// Records a press on a task. A press while dragging is ignored.
    pub fn press(
        &mut self,
        kind: PointerKind,
        task: Task,
        source_board: EntityId,
        at: PointerSample,
    ) {
        if let DragState::Idle { pending } = &mut self.state {
            *pending = Some(PendingPress {
                kind,
                origin: at,
                preview: DragPreview { task, source_board },
            });
        }
    }

    /// Feeds pointer movement; returns `true` when this sample started a drag.
    pub fn pointer_move(&mut self, at: PointerSample) -> bool {
        let DragState::Idle { pending } = &mut self.state else {
            return false;
        };
        let Some(press) = pending.as_ref() else {
            return false;
        };
        let kind = press.kind;
        let travel = press.origin.distance_to(&at);
        let held_ms = at.at_ms.saturating_sub(press.origin.at_ms);

        match kind {
            PointerKind::Mouse => {
                if travel >= self.config.mouse_activation.distance_px {
                    return self.activate();
                }
            }
            PointerKind::Touch => {
                let touch = self.config.touch_activation;
                if held_ms >= touch.delay_ms {
                    return self.activate();
                }
                if travel > touch.tolerance_px {
                    // Moved before the hold delay: a scroll, not a drag.
                    *pending = None;
                }
            }
        }
        false
    }

    /// Advances time without movement (touch press-and-hold).
    pub fn tick(&mut self, now_ms: u64) -> bool {
        let DragState::Idle { pending: Some(press) } = &self.state else {
            return false;
        };
        let held_ms = now_ms.saturating_sub(press.origin.at_ms);
        if press.kind == PointerKind::Touch && held_ms >= self.config.touch_activation.delay_ms {
            return self.activate();
        }
        false
    }

    /// Ends the gesture. `target` is the board under the pointer, if any.
    pub fn release(&mut self, target: Option<EntityId>) -> DragRelease {
        let previous = std::mem::replace(&mut self.state, DragState::Idle { pending: None });
        match previous {
            DragState::Idle { pending: None } => DragRelease::Ignored,
            DragState::Idle {
                pending: Some(press),
            } => DragRelease::Click {
                task_id: press.preview.task.id,
            },
            DragState::Dragging { preview } => {
                let task_id = preview.task.id;
                let release = match target {
                    Some(target_board) => DragRelease::Dropped {
                        task_id,
                        source_board: preview.source_board,
                        target_board,
                    },
                    None => DragRelease::Cancelled { task_id },
                };
                debug!(
                    "event=drag_transition module=studio status=ok from={:?} to={:?}",
                    DragPhase::Dragging,
                    DragPhase::Dropped
                );
                release
            }
        }
    }

    /// Abandons any press or drag without a drop.
    pub fn cancel(&mut self) {
        self.state = DragState::Idle { pending: None };
    }

    /// Follows a save's id assignment so a gesture that spans the save
    /// still drops the right task.
    pub(crate) fn adopt_durable_ids(&mut self, assigned: &BTreeMap<String, String>) {
        let preview = match &mut self.state {
            DragState::Idle {
                pending: Some(press),
            } => &mut press.preview,
            DragState::Dragging { preview } => preview,
            DragState::Idle { pending: None } => return,
        };
        preview.task.id.resolve_from(assigned);
        preview.source_board.resolve_from(assigned);
    }

    fn activate(&mut self) -> bool {
        let previous = std::mem::replace(&mut self.state, DragState::Idle { pending: None });
        match previous {
            DragState::Idle {
                pending: Some(press),
            } => {
                debug!(
                    "event=drag_transition module=studio status=ok from={:?} to={:?} task_id={}",
                    DragPhase::Idle,
                    DragPhase::Dragging,
                    press.preview.task.id
                );
                self.state = DragState::Dragging {
                    preview: press.preview,
                };
                true
            }
            other => {
                self.state = other;
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DragController, DragPhase, DragRelease, PointerKind, PointerSample};
    use crate::config::StudioConfig;
    use crate::model::id::EntityId;
    use crate::model::task::{Task, TaskFields};
    use std::collections::BTreeMap;

    fn task() -> Task {
        Task::new_local(TaskFields::titled("drag me"), "to-do".to_string())
    }

    fn pressed(kind: PointerKind) -> (DragController, Task, EntityId) {
        let mut drag = DragController::new(StudioConfig::default());
        let task = task();
        let board = EntityId::durable("todo");
        drag.press(kind, task.clone(), board.clone(), PointerSample::new(0.0, 0.0, 0));
        (drag, task, board)
    }

    #[test]
    fn mouse_activates_after_distance_threshold() {
        let (mut drag, task, _) = pressed(PointerKind::Mouse);
        assert!(!drag.pointer_move(PointerSample::new(3.0, 4.0, 10)));
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert!(drag.pointer_move(PointerSample::new(6.0, 8.0, 20)));
        assert_eq!(drag.phase(), DragPhase::Dragging);
        assert_eq!(drag.preview().unwrap().task.id, task.id);
    }

    #[test]
    fn short_press_release_is_a_click() {
        let (mut drag, task, _) = pressed(PointerKind::Mouse);
        assert_eq!(drag.release(None), DragRelease::Click { task_id: task.id });
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert_eq!(drag.release(None), DragRelease::Ignored);
    }

    #[test]
    fn touch_activates_after_hold_delay() {
        let (mut drag, _, _) = pressed(PointerKind::Touch);
        assert!(!drag.tick(100));
        assert!(!drag.pointer_move(PointerSample::new(2.0, 2.0, 200)));
        assert!(drag.tick(250));
        assert_eq!(drag.phase(), DragPhase::Dragging);
    }

    #[test]
    fn touch_moving_early_aborts_press() {
        let (mut drag, _, _) = pressed(PointerKind::Touch);
        assert!(!drag.pointer_move(PointerSample::new(30.0, 0.0, 50)));
        assert!(!drag.tick(500));
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert_eq!(drag.release(None), DragRelease::Ignored);
    }

    #[test]
    fn touch_move_after_hold_delay_activates_without_tick() {
        let (mut drag, task, _) = pressed(PointerKind::Touch);
        assert!(drag.pointer_move(PointerSample::new(30.0, 0.0, 300)));
        assert_eq!(drag.phase(), DragPhase::Dragging);
        assert_eq!(drag.preview().unwrap().task.id, task.id);
        assert!(matches!(
            drag.release(Some(EntityId::durable("done"))),
            DragRelease::Dropped { .. }
        ));
    }

    #[test]
    fn release_over_board_reports_drop_and_clears_preview() {
        let (mut drag, task, source) = pressed(PointerKind::Mouse);
        drag.pointer_move(PointerSample::new(20.0, 0.0, 5));
        let target = EntityId::durable("done");

        let release = drag.release(Some(target.clone()));
        assert_eq!(
            release,
            DragRelease::Dropped {
                task_id: task.id,
                source_board: source,
                target_board: target
            }
        );
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert!(drag.preview().is_none());
    }

    #[test]
    fn release_outside_targets_cancels() {
        let (mut drag, task, _) = pressed(PointerKind::Mouse);
        drag.pointer_move(PointerSample::new(20.0, 0.0, 5));
        assert_eq!(drag.release(None), DragRelease::Cancelled { task_id: task.id });
        assert_eq!(drag.phase(), DragPhase::Idle);
    }

    #[test]
    fn drag_follows_ids_assigned_mid_gesture() {
        let (mut drag, task, source) = pressed(PointerKind::Mouse);
        drag.pointer_move(PointerSample::new(20.0, 0.0, 5));
        let assigned = BTreeMap::from([(task.id.to_string(), "task-1".to_string())]);
        drag.adopt_durable_ids(&assigned);

        let release = drag.release(Some(EntityId::durable("done")));
        assert_eq!(
            release,
            DragRelease::Dropped {
                task_id: EntityId::durable("task-1"),
                source_board: source,
                target_board: EntityId::durable("done")
            }
        );
    }

    #[test]
    fn cancel_returns_to_idle() {
        let (mut drag, _, _) = pressed(PointerKind::Mouse);
        drag.pointer_move(PointerSample::new(20.0, 0.0, 5));
        drag.cancel();
        assert_eq!(drag.phase(), DragPhase::Idle);
        assert!(drag.preview().is_none());
    }
}
