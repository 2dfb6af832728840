//! Planning store contract.
//!
//! # Responsibility
//! - Describe the reactive board query, bulk save and single-entity
//!   mutations the planning studio consumes.
//! - Define the store error taxonomy.
//!
//! # Invariants
//! - Implementations reject `EntityId::Temporary` targets for update/delete
//!   with `StoreError::TemporaryId`.
//! - `save_boards` replaces the owner's whole board set or changes nothing.

use crate::db::DbError;
use crate::model::id::EntityId;
use crate::model::task::TaskFields;
use crate::repo::documents::BoardPayload;
use crate::sync::subscription::{Snapshot, SnapshotListener, Subscription};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Error taxonomy for store calls.
#[derive(Debug)]
pub enum StoreError {
    /// Transport/persistence failure.
    Db(DbError),
    /// A placeholder id was passed where a store id is required.
    TemporaryId(EntityId),
    /// Target entity does not exist for this owner.
    NotFound(EntityId),
    /// Persisted data cannot be converted into the document shape.
    InvalidData(String),
    /// The store refused the request as a whole.
    Rejected(String),
    /// Connection schema is not at the migrated version this store expects.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::TemporaryId(id) => write!(f, "temporary id cannot target the store: {id}"),
            Self::NotFound(id) => write!(f, "planning entity not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid planning data: {message}"),
            Self::Rejected(message) => write!(f, "store rejected request: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "planning store requires schema version {expected_version}, got {actual_version}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Result of a successful bulk save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReceipt {
    /// Durable board ids in submitted order.
    pub board_ids: Vec<String>,
    /// Durable task ids in submitted order (board by board).
    pub task_ids: Vec<String>,
    /// Temporary id -> durable id for every newly persisted entity.
    pub assigned: BTreeMap<String, String>,
}

/// Store-client handle consumed by the planning studio.
pub trait PlanningStore {
    /// Loads every board (with nested tasks) owned by `owner_id`.
    fn fetch_boards(&self, owner_id: &str) -> StoreResult<Snapshot>;
    /// Registers a listener receiving a fresh snapshot after each mutation.
    fn subscribe(&self, owner_id: &str, listener: SnapshotListener) -> Subscription;
    /// Upserts the owner's complete board set in one mutation.
    fn save_boards(&self, owner_id: &str, boards: &[BoardPayload]) -> StoreResult<SaveReceipt>;
    fn create_board(&self, owner_id: &str, title: &str, description: &str)
        -> StoreResult<EntityId>;
    fn update_board(
        &self,
        owner_id: &str,
        board_id: &EntityId,
        title: &str,
        description: &str,
    ) -> StoreResult<()>;
    fn delete_board(&self, owner_id: &str, board_id: &EntityId) -> StoreResult<()>;
    fn create_task(
        &self,
        owner_id: &str,
        board_id: &EntityId,
        fields: &TaskFields,
    ) -> StoreResult<EntityId>;
    fn update_task(&self, owner_id: &str, task_id: &EntityId, fields: &TaskFields)
        -> StoreResult<()>;
    fn delete_task(&self, owner_id: &str, task_id: &EntityId) -> StoreResult<()>;
}

impl<T: PlanningStore + ?Sized> PlanningStore for &T {
    fn fetch_boards(&self, owner_id: &str) -> StoreResult<Snapshot> {
        (**self).fetch_boards(owner_id)
    }

    fn subscribe(&self, owner_id: &str, listener: SnapshotListener) -> Subscription {
        (**self).subscribe(owner_id, listener)
    }

    fn save_boards(&self, owner_id: &str, boards: &[BoardPayload]) -> StoreResult<SaveReceipt> {
        (**self).save_boards(owner_id, boards)
    }

    fn create_board(
        &self,
        owner_id: &str,
        title: &str,
        description: &str,
    ) -> StoreResult<EntityId> {
        (**self).create_board(owner_id, title, description)
    }

    fn update_board(
        &self,
        owner_id: &str,
        board_id: &EntityId,
        title: &str,
        description: &str,
    ) -> StoreResult<()> {
        (**self).update_board(owner_id, board_id, title, description)
    }

    fn delete_board(&self, owner_id: &str, board_id: &EntityId) -> StoreResult<()> {
        (**self).delete_board(owner_id, board_id)
    }

    fn create_task(
        &self,
        owner_id: &str,
        board_id: &EntityId,
        fields: &TaskFields,
    ) -> StoreResult<EntityId> {
        (**self).create_task(owner_id, board_id, fields)
    }

    fn update_task(
        &self,
        owner_id: &str,
        task_id: &EntityId,
        fields: &TaskFields,
    ) -> StoreResult<()> {
        (**self).update_task(owner_id, task_id, fields)
    }

    fn delete_task(&self, owner_id: &str, task_id: &EntityId) -> StoreResult<()> {
        (**self).delete_task(owner_id, task_id)
    }
}

/// Returns the store id of `id`, refusing placeholder ids.
pub fn require_durable(id: &EntityId) -> StoreResult<&str> {
    id.as_durable()
        .ok_or_else(|| StoreError::TemporaryId(id.clone()))
}

#[cfg(test)]
mod tests {
    use super::{require_durable, StoreError};
    use crate::model::id::EntityId;

    #[test]
    fn require_durable_rejects_temporary_ids() {
        let temp = EntityId::temporary();
        assert!(matches!(
            require_durable(&temp),
            Err(StoreError::TemporaryId(id)) if id == temp
        ));
        assert_eq!(require_durable(&EntityId::durable("b1")).unwrap(), "b1");
    }
}
