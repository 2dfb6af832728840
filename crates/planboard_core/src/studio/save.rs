//! Save/flush bookkeeping.
//!
//! # Invariants
//! - At most one save is in flight.
//! - A ticket carries the full payload captured at `begin`; retries build a
//!   new ticket from the (unchanged) local state.

use crate::repo::documents::BoardPayload;
use crate::repo::plan_repo::{SaveReceipt, StoreError};
use crate::studio::board_store::BoardSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why a save request never reached the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveBlocked {
    /// Validation: nothing to save without at least one board.
    NoBoards,
    /// Another save is still pending.
    InFlight,
}

impl Display for SaveBlocked {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoBoards => write!(f, "at least one board is required to save"),
            Self::InFlight => write!(f, "a save is already in progress"),
        }
    }
}

impl Error for SaveBlocked {}

/// Outcome of one save attempt.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved(SaveReceipt),
    Blocked(SaveBlocked),
    /// Store rejected the request; local state is untouched and retryable.
    Failed(StoreError),
    /// Completion arrived for a ticket that is no longer in flight.
    Stale,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }
}

/// Payload captured for one in-flight save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTicket {
    sequence: u64,
    revision: u64,
    payload: Vec<BoardPayload>,
}

impl SaveTicket {
    pub fn payload(&self) -> &[BoardPayload] {
        &self.payload
    }

    /// Local revision the payload was captured from.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

/// In-flight guard for bulk saves.
#[derive(Debug, Clone, Default)]
pub struct SaveState {
    next_sequence: u64,
    in_flight: Option<u64>,
}

impl SaveState {
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Captures the current collection for submission.
    pub fn begin(&mut self, boards: &BoardSet) -> Result<SaveTicket, SaveBlocked> {
        if self.in_flight.is_some() {
            return Err(SaveBlocked::InFlight);
        }
        if boards.is_empty() {
            return Err(SaveBlocked::NoBoards);
        }
        self.next_sequence += 1;
        self.in_flight = Some(self.next_sequence);
        Ok(SaveTicket {
            sequence: self.next_sequence,
            revision: boards.revision(),
            payload: boards.to_payload(),
        })
    }

    /// Releases the in-flight slot; `false` when `ticket` is not the one
    /// currently in flight.
    pub fn finish(&mut self, ticket: &SaveTicket) -> bool {
        if self.in_flight != Some(ticket.sequence) {
            return false;
        }
        self.in_flight = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{SaveBlocked, SaveState};
    use crate::studio::board_store::BoardSet;

    #[test]
    fn begin_requires_a_board() {
        let mut state = SaveState::default();
        assert_eq!(state.begin(&BoardSet::new()), Err(SaveBlocked::NoBoards));
        assert!(!state.is_in_flight());
    }

    #[test]
    fn only_one_save_in_flight() {
        let mut boards = BoardSet::new();
        boards.add_board("To Do", "");
        let mut state = SaveState::default();

        let ticket = state.begin(&boards).unwrap();
        assert_eq!(ticket.payload().len(), 1);
        assert_eq!(ticket.revision(), boards.revision());
        assert_eq!(state.begin(&boards), Err(SaveBlocked::InFlight));

        assert!(state.finish(&ticket));
        assert!(!state.finish(&ticket));
        assert!(state.begin(&boards).is_ok());
    }
}
