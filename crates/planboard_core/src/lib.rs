//! Core planning-studio logic for Planboard.
//! This crate is the single source of truth for board/task invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod studio;
pub mod sync;

pub use config::{ConfigError, MouseActivation, StudioConfig, TouchActivation};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::Board;
pub use model::id::{EntityId, EntityIdError, TEMP_ID_PREFIX};
pub use model::session::{Session, SessionError};
pub use model::task::{status_slug, Priority, Task, TaskFields};
pub use repo::documents::{BoardDocument, BoardPayload, DocumentId, TaskDocument, TaskPayload};
pub use repo::plan_repo::{require_durable, PlanningStore, SaveReceipt, StoreError, StoreResult};
pub use repo::sqlite_plan_repo::SqlitePlanningStore;
pub use studio::board_store::{BoardSet, MoveOutcome, ReconcileError, ReconcileOutcome};
pub use studio::drag::{
    DragController, DragPhase, DragPreview, DragRelease, PointerKind, PointerSample,
};
pub use studio::notice::{Notice, NoticeLevel, NoticeQueue};
pub use studio::save::{SaveBlocked, SaveOutcome, SaveState, SaveTicket};
pub use studio::{DropResult, PlanningStudio};
pub use sync::subscription::{
    Snapshot, SnapshotHub, SnapshotInbox, SnapshotListener, Subscription,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
