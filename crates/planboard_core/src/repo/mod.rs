//! Planning store contract and persistence implementation.
//!
//! # Responsibility
//! - Define the store-client handle injected into the planning studio.
//! - Keep SQLite details behind `SqlitePlanningStore`.
//!
//! # Invariants
//! - Single-entity mutations reject temporary ids before touching storage.
//! - Bulk save applies all-or-nothing inside one transaction.
//! - Every successful mutation publishes a fresh owner snapshot.

pub mod documents;
pub mod plan_repo;
pub mod sqlite_plan_repo;
