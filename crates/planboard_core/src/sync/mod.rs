//! Reactive snapshot delivery.
//!
//! # Responsibility
//! - Fan out fresh board snapshots to subscribed consumers after store
//!   mutations.
//! - Let consumers detach explicitly or by dropping their handle.
//!
//! # Invariants
//! - Delivery is single-threaded and synchronous with the publishing call.
//! - A dropped `Subscription` never receives another snapshot.

pub mod subscription;
