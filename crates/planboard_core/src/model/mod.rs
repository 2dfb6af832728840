//! Planning studio domain model.
//!
//! # Responsibility
//! - Define canonical board/task structures shared by the local store,
//!   the drag protocol and the persistence boundary.
//! - Keep identifier semantics (temporary vs durable) explicit in types.
//!
//! # Invariants
//! - A task belongs to exactly one board at a time.
//! - A task's `status` is derived from its containing board's title.
//! - Temporary ids never reach single-entity store mutations.

pub mod board;
pub mod id;
pub mod session;
pub mod task;
